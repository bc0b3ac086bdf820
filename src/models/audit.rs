use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: i64,
    pub user_id: Option<i32>,
    pub action: String,
    pub table_name: String,
    pub record_id: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// An audit row about to be written.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<i32>,
    pub action: &'static str,
    pub table_name: &'static str,
    pub record_id: Option<String>,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(action: &'static str, table_name: &'static str, record_id: impl ToString) -> Self {
        Self {
            user_id: None,
            action,
            table_name,
            record_id: Some(record_id.to_string()),
            old_values: None,
            new_values: None,
        }
    }

    pub fn by(mut self, user_id: Option<i32>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn before<T: Serialize>(mut self, value: &T) -> Self {
        self.old_values = serde_json::to_value(value).ok();
        self
    }

    pub fn after<T: Serialize>(mut self, value: &T) -> Self {
        self.new_values = serde_json::to_value(value).ok();
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub table_name: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfiguration {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    pub user_id: Option<i32>,
    #[serde(default)]
    pub include_details: bool,
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportIssue {
    pub severity: IssueSeverity,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportValidation {
    pub is_valid: bool,
    pub issues: Vec<ReportIssue>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CountEntry {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct AuditReport {
    pub configuration: ReportConfiguration,
    pub generated_at: DateTime<Utc>,
    pub total_entries: i64,
    pub by_action: Vec<CountEntry>,
    pub by_table: Vec<CountEntry>,
    pub by_user: Vec<CountEntry>,
    pub entries: Vec<AuditLog>,
    pub warnings: Vec<ReportIssue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityStatus {
    Ok,
    Warning,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityCheck {
    pub name: &'static str,
    pub description: &'static str,
    pub status: IntegrityStatus,
    pub affected: i64,
}

#[derive(Debug, Serialize)]
pub struct IntegrityReport {
    pub checked_at: DateTime<Utc>,
    pub healthy: bool,
    pub checks: Vec<IntegrityCheck>,
}
