use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cash_register_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CashRegisterStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cash_movement_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Income,
    Expense,
    Sale,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CashRegister {
    pub id: i32,
    pub user_id: i32,
    pub opening_amount: Decimal,
    pub closing_amount: Option<Decimal>,
    pub expected_amount: Option<Decimal>,
    pub difference: Option<Decimal>,
    pub status: CashRegisterStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CashMovement {
    pub id: i32,
    pub cash_register_id: i32,
    pub movement_type: MovementType,
    pub amount: Decimal,
    pub description: Option<String>,
    pub sale_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct OpenRegisterRequest {
    pub opening_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub movement_type: MovementType,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CloseRegisterRequest {
    pub counted_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CashRegisterSummary {
    #[serde(flatten)]
    pub register: CashRegister,
    pub movements: Vec<CashMovement>,
    pub expected_amount: Decimal,
}
