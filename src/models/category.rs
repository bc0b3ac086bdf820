use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub category: Category,
    pub product_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SuggestCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    Keywords,
    SimilarProducts,
    Generic,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySuggestion {
    pub suggested_name: String,
    pub confidence: f64,
    pub reason: String,
    pub source: SuggestionSource,
    pub existing_category_id: Option<i32>,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct InsightsQuery {
    pub price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct MarketInsights {
    pub category_id: i32,
    pub category_name: String,
    pub product_count: usize,
    pub average_price: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub price_std_dev: f64,
    pub average_margin: Decimal,
    pub insights: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassificationAssignment {
    pub product_id: i32,
    pub product_name: String,
    pub category_id: i32,
    pub category_name: String,
    pub confidence: f64,
}

#[derive(Debug, Serialize)]
pub struct AutoClassifyResponse {
    pub examined: usize,
    pub classified: usize,
    pub assignments: Vec<ClassificationAssignment>,
}
