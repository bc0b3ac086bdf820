use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    Low,
    InStock,
}

impl StockStatus {
    pub fn of(stock: i32, min_stock: i32) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= min_stock {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Low => "low",
            StockStatus::InStock => "in_stock",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Sin stock",
            StockStatus::Low => "Stock bajo",
            StockStatus::InStock => "En stock",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "red",
            StockStatus::Low => "yellow",
            StockStatus::InStock => "green",
        }
    }

    pub fn needs_reorder(self) -> bool {
        self != StockStatus::InStock
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockBuckets {
    pub out_of_stock: usize,
    pub low: usize,
    pub in_stock: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarginDistribution {
    pub negative: usize,
    #[serde(rename = "0-10")]
    pub up_to_10: usize,
    #[serde(rename = "10-25")]
    pub up_to_25: usize,
    #[serde(rename = "25-50")]
    pub up_to_50: usize,
    #[serde(rename = "50+")]
    pub above_50: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryValue {
    pub category_id: Option<i32>,
    pub category_name: String,
    pub product_count: usize,
    pub units: i64,
    pub inventory_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventorySummary {
    pub total_products: usize,
    pub total_units: i64,
    pub inventory_value: Decimal,
    pub retail_value: Decimal,
    pub potential_profit: Decimal,
    pub average_margin: Decimal,
    pub stock: StockBuckets,
    pub margins: MarginDistribution,
    pub by_category: Vec<CategoryValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReorderItem {
    pub product_id: i32,
    pub name: String,
    pub stock: i32,
    pub min_stock: i32,
    pub status: StockStatus,
    pub suggested_quantity: i32,
    pub estimated_cost: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ReorderReport {
    pub items: Vec<ReorderItem>,
    pub total_estimated_cost: Decimal,
}
