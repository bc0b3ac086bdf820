use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Csv,
    Json,
}

impl ImportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportFormat::Csv => "csv",
            ImportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImportBatch {
    pub id: Uuid,
    pub file_name: String,
    pub source_format: String,
    pub total_rows: i32,
    pub processed: i32,
    pub skipped: i32,
    pub errored: i32,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub file_name: String,
    pub format: ImportFormat,
    pub content: String,
}

/// One product as read from an uploaded file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductImportRow {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<i32>,
    #[serde(default)]
    pub purchase_price: Decimal,
    #[serde(default)]
    pub sale_price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub min_stock: i32,
}

/// A row that failed to parse; `row` is 1-based and excludes the header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ParsedImport {
    pub rows: Vec<(usize, ProductImportRow)>,
    pub errors: Vec<ImportRowError>,
    pub skipped_short_rows: usize,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub batch_id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errored: usize,
    pub errors: Vec<ImportRowError>,
    /// Categories that did not exist and were created for accepted rows.
    pub categories_created: Vec<String>,
}
