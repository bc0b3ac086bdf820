use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AuditEntry, ExportFormat, ExportQuery, ProductDraft, ProductMutationResponse,
        ProductQuery, ProductRequest, ProductResponse, ProductSearchResponse, ValidationReport,
    },
    queries::{audit_queries, product_queries},
    routes::analytics::load_catalog,
    services::{import::products_to_csv, validation::validate_product},
    utils::{extractors::extract_user_id, jwt::Claims},
};

fn checked(draft: &ProductDraft) -> Result<ValidationReport> {
    let report = validate_product(draft);

    if !report.is_valid {
        return Err(AppError::Validation(report));
    }

    Ok(report)
}

async fn ensure_unique(state: &AppState, draft: &ProductDraft, except: Option<i32>) -> Result<()> {
    let db = state.db()?;

    if product_queries::name_taken(db, &draft.name, except).await? {
        return Err(AppError::Conflict(format!(
            "Ya existe un producto llamado '{}'",
            draft.name
        )));
    }

    if let Some(barcode) = draft.barcode.as_deref() {
        if product_queries::barcode_taken(db, barcode, except).await? {
            return Err(AppError::Conflict(format!(
                "El código de barras '{}' ya está en uso",
                barcode
            )));
        }
    }

    Ok(())
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<ProductResponse>>> {
    let (_, products) = load_catalog(&state).await?;

    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> Result<Json<ProductSearchResponse>> {
    if let Some(store) = state.demo_store() {
        let (products, total) = store.search_products(&params).await;

        return Ok(Json(ProductSearchResponse {
            products: products.into_iter().map(ProductResponse::from).collect(),
            total,
            limit: params.limit.unwrap_or(total),
            offset: params.offset.unwrap_or(0),
        }));
    }

    let response = product_queries::search_products(state.db()?, &params).await?;

    Ok(Json(response))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProductResponse>> {
    let product = match state.demo_store() {
        Some(store) => store.find_product(id).await,
        None => product_queries::find_by_id(state.db()?, id).await?,
    };

    let product = product.ok_or_else(|| AppError::NotFound("Producto no encontrado".to_string()))?;

    Ok(Json(product.into()))
}

/// Runs the product rules without saving anything.
pub async fn validate_product_input(Json(payload): Json<ProductRequest>) -> Json<ValidationReport> {
    Json(validate_product(&ProductDraft::from_request(&payload)))
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductMutationResponse>)> {
    let draft = ProductDraft::from_request(&payload);
    let report = checked(&draft)?;

    let product = match state.demo_store() {
        Some(store) => store.create_product(&draft).await?,
        None => {
            ensure_unique(&state, &draft, None).await?;
            let db = state.db()?;
            let product = product_queries::create_product(db, &draft).await?;

            audit_queries::log_action(
                db,
                AuditEntry::new("INSERT", "products", product.id)
                    .by(extract_user_id(&claims).ok())
                    .after(&product),
            )
            .await;

            product
        }
    };

    tracing::info!("Created product {} ({})", product.id, product.name);

    Ok((
        StatusCode::CREATED,
        Json(ProductMutationResponse {
            product: product.into(),
            warnings: report.warnings,
        }),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<ProductMutationResponse>> {
    let not_found = || AppError::NotFound(format!("Producto {} no encontrado", id));

    if let Some(store) = state.demo_store() {
        let existing = store.find_product(id).await.ok_or_else(not_found)?;
        let draft = ProductDraft::merged(&existing, &payload);
        let report = checked(&draft)?;
        let product = store.update_product(id, &draft).await?;

        return Ok(Json(ProductMutationResponse {
            product: product.into(),
            warnings: report.warnings,
        }));
    }

    let db = state.db()?;
    let existing = product_queries::find_by_id(db, id).await?.ok_or_else(not_found)?;

    let draft = ProductDraft::merged(&existing, &payload);
    let report = checked(&draft)?;
    ensure_unique(&state, &draft, Some(id)).await?;

    let product = product_queries::update_product(db, id, &draft).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("UPDATE", "products", id)
            .by(extract_user_id(&claims).ok())
            .before(&existing)
            .after(&product),
    )
    .await;

    Ok(Json(ProductMutationResponse {
        product: product.into(),
        warnings: report.warnings,
    }))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let not_found = || AppError::NotFound(format!("Producto {} no encontrado", id));

    if let Some(store) = state.demo_store() {
        if !store.delete_product(id).await {
            return Err(not_found());
        }
        return Ok(StatusCode::NO_CONTENT);
    }

    let db = state.db()?;
    let existing = product_queries::find_by_id(db, id).await?.ok_or_else(not_found)?;

    product_queries::delete_product(db, id).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("DELETE", "products", id)
            .by(extract_user_id(&claims).ok())
            .before(&existing),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_products(
    State(state): State<AppState>,
    Query(params): Query<ExportQuery>,
) -> Result<Response> {
    let (categories, products) = load_catalog(&state).await?;

    let response = match params.format {
        ExportFormat::Json => {
            let products: Vec<ProductResponse> =
                products.into_iter().map(ProductResponse::from).collect();
            Json(products).into_response()
        }
        ExportFormat::Csv => {
            let csv = products_to_csv(&products, &categories)?;
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"productos.csv\"",
                    ),
                ],
                csv,
            )
                .into_response()
        }
    };

    Ok(response)
}
