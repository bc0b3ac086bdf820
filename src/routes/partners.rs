use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{AuditEntry, Customer, PartnerQuery, PartnerRequest, Supplier},
    queries::{audit_queries, customer_queries, supplier_queries},
    utils::{extractors::extract_user_id, jwt::Claims},
};

fn required_name(req: &PartnerRequest) -> Result<&str> {
    req.name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadRequest("El nombre es obligatorio".to_string()))
}

// SUPPLIERS
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(params): Query<PartnerQuery>,
) -> Result<Json<Vec<Supplier>>> {
    if let Some(store) = state.demo_store() {
        let needle = params.query.as_deref().map(str::to_lowercase);
        let suppliers = store
            .suppliers()
            .await
            .into_iter()
            .filter(|s| {
                needle
                    .as_deref()
                    .is_none_or(|q| s.name.to_lowercase().contains(q))
            })
            .collect();

        return Ok(Json(suppliers));
    }

    let suppliers = supplier_queries::search_suppliers(state.db()?, &params).await?;

    Ok(Json(suppliers))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Supplier>> {
    let supplier = match state.demo_store() {
        Some(store) => store.find_supplier(id).await,
        None => supplier_queries::find_by_id(state.db()?, id).await?,
    };

    supplier
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Proveedor {} no encontrado", id)))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PartnerRequest>,
) -> Result<(StatusCode, Json<Supplier>)> {
    let db = state.db()?;
    let name = required_name(&payload)?;

    let supplier = supplier_queries::create_supplier(db, name, &payload).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("INSERT", "suppliers", supplier.id)
            .by(extract_user_id(&claims).ok())
            .after(&supplier),
    )
    .await;

    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<PartnerRequest>,
) -> Result<Json<Supplier>> {
    let db = state.db()?;

    let supplier = supplier_queries::update_supplier(db, id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Proveedor {} no encontrado", id)))?;

    audit_queries::log_action(
        db,
        AuditEntry::new("UPDATE", "suppliers", id)
            .by(extract_user_id(&claims).ok())
            .after(&supplier),
    )
    .await;

    Ok(Json(supplier))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let db = state.db()?;

    if supplier_queries::delete_supplier(db, id).await? == 0 {
        return Err(AppError::NotFound(format!("Proveedor {} no encontrado", id)));
    }

    audit_queries::log_action(
        db,
        AuditEntry::new("DELETE", "suppliers", id).by(extract_user_id(&claims).ok()),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

// CUSTOMERS
pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<PartnerQuery>,
) -> Result<Json<Vec<Customer>>> {
    let customers = customer_queries::search_customers(state.db()?, &params).await?;

    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Customer>> {
    customer_queries::find_by_id(state.db()?, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Cliente {} no encontrado", id)))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PartnerRequest>,
) -> Result<(StatusCode, Json<Customer>)> {
    let db = state.db()?;
    let name = required_name(&payload)?;

    let customer = customer_queries::create_customer(db, name, &payload).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("INSERT", "customers", customer.id)
            .by(extract_user_id(&claims).ok())
            .after(&customer),
    )
    .await;

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<PartnerRequest>,
) -> Result<Json<Customer>> {
    let db = state.db()?;

    let customer = customer_queries::update_customer(db, id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cliente {} no encontrado", id)))?;

    audit_queries::log_action(
        db,
        AuditEntry::new("UPDATE", "customers", id)
            .by(extract_user_id(&claims).ok())
            .after(&customer),
    )
    .await;

    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let db = state.db()?;

    if customer_queries::delete_customer(db, id).await? == 0 {
        return Err(AppError::NotFound(format!("Cliente {} no encontrado", id)));
    }

    audit_queries::log_action(
        db,
        AuditEntry::new("DELETE", "customers", id).by(extract_user_id(&claims).ok()),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
