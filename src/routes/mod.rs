mod analytics;
mod audit;
mod cash_registers;
mod categories;
mod health;
mod imports;
mod login;
mod partners;
mod products;
mod sales;
mod serials;
mod users;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::{
    AppState,
    middleware::{admin_middleware, auth_middleware},
};

pub fn create_router(state: &AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/api/auth/login", post(login::login_user));

    let admin_routes = Router::new()
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        .route(
            "/api/categories/auto-classify",
            post(categories::auto_classify_products),
        )
        .route("/api/imports/{id}", delete(imports::delete_import))
        .route("/api/audit/logs", get(audit::list_audit_logs))
        .route("/api/audit/validate-config", post(audit::validate_report_config))
        .route("/api/audit/report", post(audit::generate_report))
        .route("/api/audit/integrity", get(audit::check_integrity))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ));

    let protected_routes = Router::new()
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/api/products/export", get(products::export_products))
        .route("/api/products/search", get(products::search_products))
        .route("/api/products/validate", post(products::validate_product_input))
        .route(
            "/api/products/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/api/products/{id}/serials",
            get(serials::list_serials).post(serials::create_serial),
        )
        .route("/api/products/{id}/serials/bulk", post(serials::bulk_add_serials))
        .route("/api/serials/lookup/{code}", get(serials::lookup_serial))
        .route(
            "/api/serials/{id}",
            put(serials::update_serial).delete(serials::delete_serial),
        )
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/api/categories/suggest", post(categories::suggest_category))
        .route(
            "/api/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/api/categories/{id}/insights",
            get(categories::get_market_insights),
        )
        .route(
            "/api/suppliers",
            get(partners::list_suppliers).post(partners::create_supplier),
        )
        .route(
            "/api/suppliers/{id}",
            get(partners::get_supplier)
                .put(partners::update_supplier)
                .delete(partners::delete_supplier),
        )
        .route(
            "/api/customers",
            get(partners::list_customers).post(partners::create_customer),
        )
        .route(
            "/api/customers/{id}",
            get(partners::get_customer)
                .put(partners::update_customer)
                .delete(partners::delete_customer),
        )
        .route("/api/sales", get(sales::list_sales).post(sales::create_sale))
        .route("/api/sales/{id}", get(sales::get_sale))
        .route(
            "/api/cash-registers/current",
            get(cash_registers::get_current_register),
        )
        .route("/api/cash-registers/open", post(cash_registers::open_register))
        .route(
            "/api/cash-registers/{id}/movements",
            post(cash_registers::add_movement),
        )
        .route(
            "/api/cash-registers/{id}/close",
            post(cash_registers::close_register),
        )
        .route(
            "/api/imports",
            get(imports::list_imports).post(imports::import_products),
        )
        .route("/api/analytics/inventory", get(analytics::get_inventory_summary))
        .route("/api/analytics/reorder", get(analytics::get_reorder_list))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .merge(protected_routes)
}
