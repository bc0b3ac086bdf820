use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    error::{AppError, Result},
    models::{CashMovement, CashRegister, CashRegisterStatus, MovementRequest},
    services::sales::expected_cash,
};

pub async fn find_open_for_user(pool: &PgPool, user_id: i32) -> Result<Option<CashRegister>> {
    let register = sqlx::query_as::<_, CashRegister>(
        "SELECT * FROM cash_registers WHERE user_id = $1 AND status = 'open'",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(register)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<CashRegister>> {
    let register = sqlx::query_as::<_, CashRegister>("SELECT * FROM cash_registers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(register)
}

/// The partial unique index on open registers turns a concurrent second open
/// into a unique violation, reported as a conflict.
pub async fn open_register(pool: &PgPool, user_id: i32, opening_amount: Decimal) -> Result<CashRegister> {
    let register = sqlx::query_as::<_, CashRegister>(
        "INSERT INTO cash_registers (user_id, opening_amount) VALUES ($1, $2) RETURNING *",
    )
    .bind(user_id)
    .bind(opening_amount)
    .fetch_one(pool)
    .await?;

    Ok(register)
}

pub async fn movements_for_register(pool: &PgPool, register_id: i32) -> Result<Vec<CashMovement>> {
    let movements = sqlx::query_as::<_, CashMovement>(
        "SELECT * FROM cash_movements WHERE cash_register_id = $1 ORDER BY created_at ASC",
    )
    .bind(register_id)
    .fetch_all(pool)
    .await?;

    Ok(movements)
}

pub async fn add_movement(
    pool: &PgPool,
    register_id: i32,
    req: &MovementRequest,
) -> Result<CashMovement> {
    let movement = sqlx::query_as::<_, CashMovement>(
        "INSERT INTO cash_movements (cash_register_id, movement_type, amount, description)
         SELECT id, $2, $3, $4 FROM cash_registers WHERE id = $1 AND status = 'open'
         RETURNING *",
    )
    .bind(register_id)
    .bind(req.movement_type)
    .bind(req.amount)
    .bind(&req.description)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Conflict("La caja no está abierta".to_string()))?;

    Ok(movement)
}

/// Closes an open register, storing the expected amount and the difference
/// against the counted cash.
pub async fn close_register(
    pool: &PgPool,
    register_id: i32,
    counted_amount: Decimal,
) -> Result<CashRegister> {
    let mut tx = pool.begin().await?;

    let register = sqlx::query_as::<_, CashRegister>(
        "SELECT * FROM cash_registers WHERE id = $1 FOR UPDATE",
    )
    .bind(register_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Caja {} no encontrada", register_id)))?;

    if register.status == CashRegisterStatus::Closed {
        tx.rollback().await?;
        return Err(AppError::Conflict("La caja ya está cerrada".to_string()));
    }

    let movements = sqlx::query_as::<_, CashMovement>(
        "SELECT * FROM cash_movements WHERE cash_register_id = $1",
    )
    .bind(register_id)
    .fetch_all(&mut *tx)
    .await?;

    let expected = expected_cash(register.opening_amount, &movements);

    let closed = sqlx::query_as::<_, CashRegister>(
        r#"
        UPDATE cash_registers
        SET
            status = 'closed',
            closing_amount = $1,
            expected_amount = $2,
            difference = $3,
            closed_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(counted_amount)
    .bind(expected)
    .bind(counted_amount.saturating_sub(expected))
    .bind(register_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(closed)
}
