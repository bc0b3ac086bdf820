use axum::{Json, extract::State};

use crate::{
    AppState,
    error::Result,
    models::{Category, InventorySummary, Product, ReorderReport},
    queries::{category_queries, product_queries},
    services::analytics::{inventory_summary, reorder_list},
};

/// Categories and products, from the demo store or with two concurrent queries.
pub(crate) async fn load_catalog(state: &AppState) -> Result<(Vec<Category>, Vec<Product>)> {
    if let Some(store) = state.demo_store() {
        return Ok((store.categories().await, store.products().await));
    }

    let db = state.db()?;
    let catalog = tokio::try_join!(
        category_queries::list_all(db),
        product_queries::list_all(db)
    )?;

    Ok(catalog)
}

pub async fn get_inventory_summary(State(state): State<AppState>) -> Result<Json<InventorySummary>> {
    let (categories, products) = load_catalog(&state).await?;

    Ok(Json(inventory_summary(&products, &categories)))
}

pub async fn get_reorder_list(State(state): State<AppState>) -> Result<Json<ReorderReport>> {
    let (_, products) = load_catalog(&state).await?;

    Ok(Json(reorder_list(&products)))
}
