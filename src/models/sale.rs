use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sale {
    pub id: i32,
    pub customer_id: Option<i32>,
    pub user_id: i32,
    pub cash_register_id: Option<i32>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SaleItem {
    pub id: i32,
    pub sale_id: i32,
    pub product_id: i32,
    pub imei_serial_id: Option<i32>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SaleItemRequest {
    pub product_id: i32,
    pub quantity: i32,
    /// Overrides the catalog price when present.
    pub unit_price: Option<Decimal>,
    pub imei_serial_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub customer_id: Option<i32>,
    pub items: Vec<SaleItemRequest>,
    pub discount: Option<Decimal>,
    pub payment_method: PaymentMethod,
}

/// A sale line after prices have been resolved against the catalog.
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub product_id: i32,
    pub imei_serial_id: Option<i32>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaleQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub customer_id: Option<i32>,
    pub user_id: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
