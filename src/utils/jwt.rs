use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    error::{AppError, Result},
    models::UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub exp: usize,
}

impl Claims {
    /// Identity used for every request while demo mode is on.
    pub fn demo_admin() -> Self {
        Self {
            sub: "0".to_string(),
            email: "demo@pos.local".to_string(),
            role: UserRole::Admin,
            exp: usize::MAX,
        }
    }
}

pub fn generate_token(user_id: i32, email: &str, role: UserRole, auth: &AuthConfig) -> Result<String> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(auth.token_ttl_hours))
        .ok_or_else(|| AppError::InternalError("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(format!("Token generation failed: {}", e)))
}

pub fn verify_token(token: &str, auth: &AuthConfig) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Token inválido: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            token_ttl_hours: 1,
        }
    }

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let token = generate_token(7, "caja@pos.local", UserRole::Cashier, &auth("s3cret")).unwrap();

        let claims = verify_token(&token, &auth("s3cret")).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, UserRole::Cashier);
    }

    #[test]
    fn token_with_other_secret_is_rejected() {
        let token = generate_token(7, "caja@pos.local", UserRole::Cashier, &auth("s3cret")).unwrap();

        assert!(matches!(
            verify_token(&token, &auth("other")),
            Err(AppError::Unauthorized(_))
        ));
    }
}
