use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AuditEntry, CashMovement, CashRegister, CashRegisterStatus, CashRegisterSummary,
        CloseRegisterRequest, MovementRequest, MovementType, OpenRegisterRequest, UserRole,
    },
    queries::{audit_queries, cash_register_queries},
    services::{
        sales::expected_cash,
        validation::{MAX_AMOUNT, amount_fits},
    },
    utils::{extractors::extract_user_id, jwt::Claims},
};

fn check_amount(amount: Decimal) -> Result<()> {
    if !amount_fits(amount) {
        return Err(AppError::BadRequest(format!(
            "El importe debe tener como máximo 2 decimales y no superar {}",
            MAX_AMOUNT
        )));
    }
    Ok(())
}

async fn summary(pool: &PgPool, register: CashRegister) -> Result<CashRegisterSummary> {
    let movements = cash_register_queries::movements_for_register(pool, register.id).await?;
    let expected_amount = register
        .expected_amount
        .unwrap_or_else(|| expected_cash(register.opening_amount, &movements));

    Ok(CashRegisterSummary {
        register,
        movements,
        expected_amount,
    })
}

/// Cashiers may only operate their own register; admins any.
async fn owned_register(pool: &PgPool, id: i32, claims: &Claims) -> Result<CashRegister> {
    let register = cash_register_queries::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Caja {} no encontrada", id)))?;

    if claims.role != UserRole::Admin && register.user_id != extract_user_id(claims)? {
        return Err(AppError::Forbidden(
            "La caja pertenece a otro usuario".to_string(),
        ));
    }

    Ok(register)
}

pub async fn get_current_register(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Option<CashRegisterSummary>>> {
    let db = state.db()?;
    let user_id = extract_user_id(&claims)?;

    let current = match cash_register_queries::find_open_for_user(db, user_id).await? {
        Some(register) => Some(summary(db, register).await?),
        None => None,
    };

    Ok(Json(current))
}

pub async fn open_register(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<OpenRegisterRequest>,
) -> Result<(StatusCode, Json<CashRegister>)> {
    let db = state.db()?;
    let user_id = extract_user_id(&claims)?;

    if payload.opening_amount < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "El monto inicial no puede ser negativo".to_string(),
        ));
    }
    check_amount(payload.opening_amount)?;

    if cash_register_queries::find_open_for_user(db, user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Ya tiene una caja abierta".to_string()));
    }

    let register = cash_register_queries::open_register(db, user_id, payload.opening_amount).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("OPEN", "cash_registers", register.id)
            .by(Some(user_id))
            .after(&register),
    )
    .await;

    Ok((StatusCode::CREATED, Json(register)))
}

pub async fn add_movement(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<MovementRequest>,
) -> Result<(StatusCode, Json<CashMovement>)> {
    let db = state.db()?;

    if payload.movement_type == MovementType::Sale {
        return Err(AppError::BadRequest(
            "Los movimientos de venta se registran con cada venta".to_string(),
        ));
    }

    if payload.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest("El monto debe ser mayor a cero".to_string()));
    }
    check_amount(payload.amount)?;

    let register = owned_register(db, id, &claims).await?;
    if register.status == CashRegisterStatus::Closed {
        return Err(AppError::Conflict("La caja no está abierta".to_string()));
    }

    let movement = cash_register_queries::add_movement(db, id, &payload).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("INSERT", "cash_movements", movement.id)
            .by(extract_user_id(&claims).ok())
            .after(&movement),
    )
    .await;

    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn close_register(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<CloseRegisterRequest>,
) -> Result<Json<CashRegisterSummary>> {
    let db = state.db()?;

    if payload.counted_amount < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "El monto contado no puede ser negativo".to_string(),
        ));
    }
    check_amount(payload.counted_amount)?;

    owned_register(db, id, &claims).await?;

    let closed = cash_register_queries::close_register(db, id, payload.counted_amount).await?;

    tracing::info!(
        "Cash register {} closed with difference {}",
        closed.id,
        closed.difference.unwrap_or_default()
    );

    audit_queries::log_action(
        db,
        AuditEntry::new("CLOSE", "cash_registers", closed.id)
            .by(extract_user_id(&claims).ok())
            .after(&closed),
    )
    .await;

    Ok(Json(summary(db, closed).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn register_amounts_must_fit_money_columns() {
        assert!(check_amount(dec!(150.50)).is_ok());
        assert!(check_amount(MAX_AMOUNT).is_ok());
        assert!(matches!(
            check_amount(Decimal::MAX),
            Err(AppError::BadRequest(_))
        ));
        assert!(check_amount(dec!(0.001)).is_err());
    }
}
