use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "imei_serial_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImeiSerialStatus {
    Available,
    Sold,
    Reserved,
    Defective,
    Returned,
}

impl ImeiSerialStatus {
    pub fn is_sellable(self) -> bool {
        matches!(self, ImeiSerialStatus::Available | ImeiSerialStatus::Reserved)
    }

    pub fn is_locked(self) -> bool {
        self == ImeiSerialStatus::Sold
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductImeiSerial {
    pub id: i32,
    pub product_id: i32,
    pub imei1: Option<String>,
    pub imei2: Option<String>,
    pub serial_number: Option<String>,
    pub status: ImeiSerialStatus,
    pub sale_id: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImeiSerialRequest {
    pub imei1: Option<String>,
    pub imei2: Option<String>,
    pub serial_number: Option<String>,
    pub status: Option<ImeiSerialStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Imei,
    Serial,
}

#[derive(Debug, Deserialize)]
pub struct BulkAddRequest {
    pub kind: CodeKind,
    /// One code per line.
    pub input: String,
}

/// Bulk input split into buckets, before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkPartition {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
    pub duplicates: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkAddSummary {
    pub total_lines: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub inserted: usize,
    pub invalid_codes: Vec<String>,
    pub duplicate_codes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SerialQuery {
    pub status: Option<ImeiSerialStatus>,
}
