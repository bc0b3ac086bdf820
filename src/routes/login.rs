use axum::{Json, extract::State};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{AuditEntry, AuthResponse, LoginRequest},
    queries::{audit_queries, user_queries},
    utils::jwt,
};

pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let db = state.db()?;

    let user = user_queries::find_by_email(db, payload.email.trim())
        .await?
        .filter(|user| user.active)
        .ok_or_else(|| AppError::Unauthorized("Email o contraseña incorrectos".to_string()))?;

    let is_valid = bcrypt::verify(&payload.password, &user.password)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {}", e)))?;

    if !is_valid {
        tracing::info!("Rejected login for {}", user.email);
        return Err(AppError::Unauthorized(
            "Email o contraseña incorrectos".to_string(),
        ));
    }

    let token = jwt::generate_token(user.id, &user.email, user.role, &state.config.auth)?;

    audit_queries::log_action(db, AuditEntry::new("LOGIN", "users", user.id).by(Some(user.id)))
        .await;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}
