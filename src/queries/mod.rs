pub mod audit_queries;
pub mod cash_register_queries;
pub mod category_queries;
pub mod customer_queries;
pub mod imei_queries;
pub mod import_queries;
pub mod product_queries;
pub mod sale_queries;
pub mod supplier_queries;
pub mod user_queries;
