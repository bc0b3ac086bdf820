use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{AuditEntry, CreateUserRequest, UpdateUserRequest, UserResponse, UserRole},
    queries::{
        audit_queries,
        user_queries::{self, UserChanges},
    },
    utils::{extractors::extract_user_id, jwt::Claims},
};

const MIN_PASSWORD_LEN: usize = 8;

fn hash_password(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "La contraseña debe tener al menos {} caracteres",
            MIN_PASSWORD_LEN
        )));
    }

    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
}

fn check_email(email: &str) -> Result<()> {
    if !email.contains('@') || email.len() < 3 {
        return Err(AppError::BadRequest("Email inválido".to_string()));
    }
    Ok(())
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>> {
    let users = user_queries::list_users(state.db()?).await?;

    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let db = state.db()?;
    let email = payload.email.trim();
    let name = payload.name.trim();

    check_email(email)?;
    if name.is_empty() {
        return Err(AppError::BadRequest("El nombre es obligatorio".to_string()));
    }

    if user_queries::find_by_email(db, email).await?.is_some() {
        return Err(AppError::Conflict(format!("El email {} ya está registrado", email)));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = user_queries::create_user(
        db,
        email,
        name,
        &password_hash,
        payload.role.unwrap_or(UserRole::Cashier),
    )
    .await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("INSERT", "users", user.id)
            .by(extract_user_id(&claims).ok())
            .after(&user),
    )
    .await;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    let db = state.db()?;

    if let Some(email) = payload.email.as_deref() {
        check_email(email.trim())?;
    }

    let password_hash = payload.password.as_deref().map(hash_password).transpose()?;

    let user = user_queries::update_user(
        db,
        id,
        UserChanges {
            email: payload.email.as_deref().map(str::trim),
            name: payload.name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
            password_hash,
            role: payload.role,
            active: payload.active,
        },
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Usuario {} no encontrado", id)))?;

    audit_queries::log_action(
        db,
        AuditEntry::new("UPDATE", "users", id)
            .by(extract_user_id(&claims).ok())
            .after(&user),
    )
    .await;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let db = state.db()?;
    let current_user = extract_user_id(&claims)?;

    if current_user == id {
        return Err(AppError::BadRequest(
            "No puede desactivar su propio usuario".to_string(),
        ));
    }

    if user_queries::deactivate_user(db, id).await? == 0 {
        return Err(AppError::NotFound(format!("Usuario {} no encontrado", id)));
    }

    audit_queries::log_action(db, AuditEntry::new("DELETE", "users", id).by(Some(current_user)))
        .await;

    Ok(StatusCode::NO_CONTENT)
}
