use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AuditEntry, AutoClassifyResponse, Category, CategorySuggestion, CategoryWithCount,
        CreateCategoryRequest, InsightsQuery, MarketInsights, SuggestCategoryRequest,
        UpdateCategoryRequest,
    },
    queries::{audit_queries, category_queries, product_queries},
    routes::analytics::load_catalog,
    services::category_engine::{auto_classify, generate_market_insights, suggest_categories},
    utils::{extractors::extract_user_id, jwt::Claims},
};

const NAME_MAX: usize = 100;

fn check_name(name: &str) -> Result<()> {
    let len = name.trim().chars().count();
    if len == 0 || len > NAME_MAX {
        return Err(AppError::BadRequest(format!(
            "El nombre de la categoría debe tener entre 1 y {} caracteres",
            NAME_MAX
        )));
    }
    Ok(())
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>> {
    if let Some(store) = state.demo_store() {
        let products = store.products().await;
        let categories = store
            .categories()
            .await
            .into_iter()
            .map(|category| CategoryWithCount {
                product_count: products
                    .iter()
                    .filter(|p| p.category_id == Some(category.id))
                    .count() as i64,
                category,
            })
            .collect();

        return Ok(Json(categories));
    }

    let categories = category_queries::list_with_counts(state.db()?).await?;

    Ok(Json(categories))
}

async fn find_category(state: &AppState, id: i32) -> Result<Category> {
    let category = match state.demo_store() {
        Some(store) => store.find_category(id).await,
        None => category_queries::find_by_id(state.db()?, id).await?,
    };

    category.ok_or_else(|| AppError::NotFound(format!("Categoría {} no encontrada", id)))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Category>> {
    Ok(Json(find_category(&state, id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    check_name(&payload.name)?;

    if let Some(store) = state.demo_store() {
        let category = store.create_category(&payload).await?;
        return Ok((StatusCode::CREATED, Json(category)));
    }

    let db = state.db()?;

    if category_queries::find_by_name(db, &payload.name).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "La categoría '{}' ya existe",
            payload.name.trim()
        )));
    }

    let category = category_queries::create_category(db, &payload).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("INSERT", "categories", category.id)
            .by(extract_user_id(&claims).ok())
            .after(&category),
    )
    .await;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    if let Some(name) = payload.name.as_deref() {
        check_name(name)?;
    }

    let not_found = || AppError::NotFound(format!("Categoría {} no encontrada", id));

    if let Some(store) = state.demo_store() {
        let category = store.update_category(id, &payload).await?.ok_or_else(not_found)?;
        return Ok(Json(category));
    }

    let db = state.db()?;

    let existing = category_queries::find_by_id(db, id).await?.ok_or_else(not_found)?;

    let category = category_queries::update_category(db, id, &payload)
        .await?
        .ok_or_else(not_found)?;

    audit_queries::log_action(
        db,
        AuditEntry::new("UPDATE", "categories", id)
            .by(extract_user_id(&claims).ok())
            .before(&existing)
            .after(&category),
    )
    .await;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let not_found = || AppError::NotFound(format!("Categoría {} no encontrada", id));

    if let Some(store) = state.demo_store() {
        if !store.delete_category(id).await {
            return Err(not_found());
        }
        return Ok(StatusCode::NO_CONTENT);
    }

    let db = state.db()?;
    let existing = category_queries::find_by_id(db, id).await?.ok_or_else(not_found)?;

    category_queries::delete_category(db, id).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("DELETE", "categories", id)
            .by(extract_user_id(&claims).ok())
            .before(&existing),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Always answers 200: a catalog that cannot be loaded yields no suggestions.
pub async fn suggest_category(
    State(state): State<AppState>,
    Json(payload): Json<SuggestCategoryRequest>,
) -> Json<Vec<CategorySuggestion>> {
    match load_catalog(&state).await {
        Ok((categories, products)) => Json(suggest_categories(
            &payload.name,
            payload.description.as_deref(),
            &categories,
            &products,
        )),
        Err(e) => {
            tracing::warn!("Category suggestion skipped, catalog unavailable: {}", e);
            Json(Vec::new())
        }
    }
}

pub async fn get_market_insights(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<InsightsQuery>,
) -> Result<Json<MarketInsights>> {
    let category = find_category(&state, id).await?;

    let products = match state.demo_store() {
        Some(store) => store.products().await,
        None => product_queries::list_by_category(state.db()?, id).await?,
    };

    Ok(Json(generate_market_insights(&category, &products, params.price)))
}

pub async fn auto_classify_products(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AutoClassifyResponse>> {
    let (categories, products) = load_catalog(&state).await?;
    let threshold = state.config.features.auto_classify_threshold;

    let examined = products.iter().filter(|p| p.category_id.is_none()).count();
    let assignments = auto_classify(&products, &categories, threshold);

    if let Some(store) = state.demo_store() {
        for assignment in &assignments {
            store
                .assign_category(assignment.product_id, assignment.category_id)
                .await;
        }
    } else {
        let db = state.db()?;

        for assignment in &assignments {
            product_queries::assign_category(db, assignment.product_id, assignment.category_id)
                .await?;
        }

        if !assignments.is_empty() {
            audit_queries::log_action(
                db,
                AuditEntry::new("CLASSIFY", "products", "auto")
                    .by(extract_user_id(&claims).ok())
                    .after(&assignments),
            )
            .await;
        }
    }

    tracing::info!(
        "Auto-classification assigned {} of {} uncategorised products",
        assignments.len(),
        examined
    );

    Ok(Json(AutoClassifyResponse {
        examined,
        classified: assignments.len(),
        assignments,
    }))
}
