pub mod analytics;
pub mod audit;
pub mod category_engine;
pub mod demo_data;
pub mod imei;
pub mod import;
pub mod sales;
pub mod validation;
