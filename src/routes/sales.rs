use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{AuditEntry, CreateSaleRequest, SaleQuery, SaleResponse},
    queries::{audit_queries, sale_queries},
    utils::{extractors::extract_user_id, jwt::Claims},
};

pub async fn list_sales(
    State(state): State<AppState>,
    Query(params): Query<SaleQuery>,
) -> Result<Json<Vec<SaleResponse>>> {
    let sales = sale_queries::search_sales(state.db()?, &params).await?;

    Ok(Json(sales))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SaleResponse>> {
    sale_queries::find_by_id(state.db()?, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Venta {} no encontrada", id)))
}

pub async fn create_sale(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>)> {
    let db = state.db()?;
    let user_id = extract_user_id(&claims)?;

    let sale = sale_queries::create_sale(db, user_id, &payload).await?;

    tracing::info!(
        "Sale {} registered by user {} for {}",
        sale.sale.id,
        user_id,
        sale.sale.total
    );

    audit_queries::log_action(
        db,
        AuditEntry::new("SALE", "sales", sale.sale.id)
            .by(Some(user_id))
            .after(&sale),
    )
    .await;

    Ok((StatusCode::CREATED, Json(sale)))
}
