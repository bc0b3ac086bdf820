use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::{StockStatus, ValidationIssue},
    services::analytics::calculate_profit_margin,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "imei_serial_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImeiSerialType {
    Imei,
    Serial,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub has_imei_serial: bool,
    pub imei_serial_type: Option<ImeiSerialType>,
    pub import_batch_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. Every field is optional so the same shape serves
/// partial updates; creation requires `name` and `sale_price`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub purchase_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub stock: Option<i32>,
    pub min_stock: Option<i32>,
    pub has_imei_serial: Option<bool>,
    pub imei_serial_type: Option<ImeiSerialType>,
}

/// A fully resolved product candidate, the input of validation and inserts.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub purchase_price: Decimal,
    pub sale_price: Decimal,
    pub stock: i32,
    pub min_stock: i32,
    pub has_imei_serial: bool,
    pub imei_serial_type: Option<ImeiSerialType>,
    pub import_batch_id: Option<Uuid>,
}

impl ProductDraft {
    pub fn from_request(req: &ProductRequest) -> Self {
        Self {
            name: req.name.clone().unwrap_or_default().trim().to_string(),
            description: normalize(req.description.clone()),
            barcode: normalize(req.barcode.clone()),
            category_id: req.category_id,
            supplier_id: req.supplier_id,
            purchase_price: req.purchase_price.unwrap_or(Decimal::ZERO),
            sale_price: req.sale_price.unwrap_or(Decimal::ZERO),
            stock: req.stock.unwrap_or(0),
            min_stock: req.min_stock.unwrap_or(0),
            has_imei_serial: req.has_imei_serial.unwrap_or(false),
            imei_serial_type: req.imei_serial_type,
            import_batch_id: None,
        }
    }

    /// Applies the provided fields of `req` over an existing product.
    pub fn merged(existing: &Product, req: &ProductRequest) -> Self {
        Self {
            name: req
                .name
                .as_deref()
                .map(str::trim)
                .unwrap_or(&existing.name)
                .to_string(),
            description: match &req.description {
                Some(d) => normalize(Some(d.clone())),
                None => existing.description.clone(),
            },
            barcode: match &req.barcode {
                Some(b) => normalize(Some(b.clone())),
                None => existing.barcode.clone(),
            },
            category_id: req.category_id.or(existing.category_id),
            supplier_id: req.supplier_id.or(existing.supplier_id),
            purchase_price: req.purchase_price.unwrap_or(existing.purchase_price),
            sale_price: req.sale_price.unwrap_or(existing.sale_price),
            stock: req.stock.unwrap_or(existing.stock),
            min_stock: req.min_stock.unwrap_or(existing.min_stock),
            has_imei_serial: req.has_imei_serial.unwrap_or(existing.has_imei_serial),
            imei_serial_type: req.imei_serial_type.or(existing.imei_serial_type),
            import_batch_id: existing.import_batch_id,
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub query: Option<String>,
    pub category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub price_from: Option<Decimal>,
    pub price_to: Option<Decimal>,
    pub low_stock: Option<bool>,
    pub sort_by: Option<SortBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    NameAsc,
    PriceAsc,
    PriceDesc,
    StockAsc,
    Newest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub profit_margin: Decimal,
    pub stock_status: &'static str,
    pub stock_status_label: &'static str,
    pub stock_status_color: &'static str,
}

/// A saved product together with the non-blocking validation warnings.
#[derive(Debug, Serialize)]
pub struct ProductMutationResponse {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub warnings: Vec<ValidationIssue>,
}

#[derive(Debug, Serialize)]
pub struct ProductSearchResponse {
    pub products: Vec<ProductResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        let status = StockStatus::of(product.stock, product.min_stock);

        Self {
            profit_margin: calculate_profit_margin(product.purchase_price, product.sale_price),
            stock_status: status.as_str(),
            stock_status_label: status.label(),
            stock_status_color: status.color(),
            product,
        }
    }
}
