use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgPool;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AuditEntry, BulkAddRequest, BulkAddSummary, CodeKind, ImeiSerialRequest, ImeiSerialStatus,
        ImeiSerialType, Product, ProductImeiSerial, SerialQuery,
    },
    queries::{audit_queries, imei_queries, product_queries},
    services::imei::{bulk_candidates, partition_bulk_input, validate_unit},
    utils::{extractors::extract_user_id, jwt::Claims},
};

async fn serialized_product(pool: &PgPool, product_id: i32) -> Result<Product> {
    let product = product_queries::find_by_id(pool, product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Producto {} no encontrado", product_id)))?;

    if !product.has_imei_serial {
        return Err(AppError::BadRequest(format!(
            "'{}' no lleva control de IMEI/serie",
            product.name
        )));
    }

    Ok(product)
}

fn accepts(tracking: Option<ImeiSerialType>, kind: CodeKind) -> bool {
    match (tracking, kind) {
        (None | Some(ImeiSerialType::Both), _) => true,
        (Some(ImeiSerialType::Imei), CodeKind::Imei) => true,
        (Some(ImeiSerialType::Serial), CodeKind::Serial) => true,
        _ => false,
    }
}

fn codes_of(req: &ImeiSerialRequest) -> Vec<String> {
    [&req.imei1, &req.imei2, &req.serial_number]
        .into_iter()
        .flatten()
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty())
        .collect()
}

pub async fn list_serials(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
    Query(params): Query<SerialQuery>,
) -> Result<Json<Vec<ProductImeiSerial>>> {
    let units = imei_queries::list_for_product(state.db()?, product_id, params.status).await?;

    Ok(Json(units))
}

pub async fn create_serial(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<i32>,
    Json(payload): Json<ImeiSerialRequest>,
) -> Result<(StatusCode, Json<ProductImeiSerial>)> {
    let db = state.db()?;
    serialized_product(db, product_id).await?;

    let report = validate_unit(&payload);
    if !report.is_valid {
        return Err(AppError::Validation(report));
    }

    if payload.status == Some(ImeiSerialStatus::Sold) {
        return Err(AppError::BadRequest(
            "Una unidad solo pasa a vendida a través de una venta".to_string(),
        ));
    }

    let existing = imei_queries::existing_codes(db, &codes_of(&payload)).await?;
    if let Some(code) = existing.iter().next() {
        return Err(AppError::Conflict(format!("El código {} ya está registrado", code)));
    }

    let unit = imei_queries::create_unit(db, product_id, &payload).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("INSERT", "product_imei_serials", unit.id)
            .by(extract_user_id(&claims).ok())
            .after(&unit),
    )
    .await;

    Ok((StatusCode::CREATED, Json(unit)))
}

pub async fn bulk_add_serials(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<i32>,
    Json(payload): Json<BulkAddRequest>,
) -> Result<Json<BulkAddSummary>> {
    let db = state.db()?;
    let product = serialized_product(db, product_id).await?;

    if !accepts(product.imei_serial_type, payload.kind) {
        return Err(AppError::BadRequest(format!(
            "'{}' no admite códigos de ese tipo",
            product.name
        )));
    }

    let candidates = bulk_candidates(&payload.input);
    let existing = imei_queries::existing_codes(db, &candidates).await?;
    let partition = partition_bulk_input(&payload.input, payload.kind, &existing);

    let inserted = imei_queries::bulk_insert(db, product_id, payload.kind, &partition.valid).await?;

    tracing::info!(
        "Bulk add for product {}: {} inserted, {} invalid, {} duplicated",
        product_id,
        inserted,
        partition.invalid.len(),
        partition.duplicates.len()
    );

    if inserted > 0 {
        audit_queries::log_action(
            db,
            AuditEntry::new("INSERT", "product_imei_serials", product_id)
                .by(extract_user_id(&claims).ok())
                .after(&partition.valid),
        )
        .await;
    }

    Ok(Json(BulkAddSummary {
        total_lines: candidates.len(),
        valid: partition.valid.len(),
        invalid: partition.invalid.len(),
        duplicates: partition.duplicates.len(),
        inserted: inserted as usize,
        invalid_codes: partition.invalid,
        duplicate_codes: partition.duplicates,
    }))
}

pub async fn lookup_serial(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ProductImeiSerial>> {
    imei_queries::find_by_code(state.db()?, &code)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No se encontró el código {}", code.trim())))
}

pub async fn update_serial(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<ImeiSerialRequest>,
) -> Result<Json<ProductImeiSerial>> {
    let db = state.db()?;

    let existing = imei_queries::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unidad {} no encontrada", id)))?;

    if existing.status.is_locked() {
        return Err(AppError::Conflict(
            "Una unidad vendida no se puede modificar".to_string(),
        ));
    }

    if payload.status == Some(ImeiSerialStatus::Sold) {
        return Err(AppError::BadRequest(
            "Una unidad solo pasa a vendida a través de una venta".to_string(),
        ));
    }

    let merged = ImeiSerialRequest {
        imei1: payload.imei1.clone().or_else(|| existing.imei1.clone()),
        imei2: payload.imei2.clone().or_else(|| existing.imei2.clone()),
        serial_number: payload
            .serial_number
            .clone()
            .or_else(|| existing.serial_number.clone()),
        status: payload.status,
        notes: payload.notes.clone(),
    };

    let report = validate_unit(&merged);
    if !report.is_valid {
        return Err(AppError::Validation(report));
    }

    let taken = imei_queries::existing_codes(db, &codes_of(&payload)).await?;
    let own = codes_of(&ImeiSerialRequest {
        imei1: existing.imei1.clone(),
        imei2: existing.imei2.clone(),
        serial_number: existing.serial_number.clone(),
        ..ImeiSerialRequest::default()
    });
    if let Some(code) = taken.iter().find(|code| !own.contains(code)) {
        return Err(AppError::Conflict(format!("El código {} ya está registrado", code)));
    }

    let unit = imei_queries::update_unit(db, id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unidad {} no encontrada", id)))?;

    audit_queries::log_action(
        db,
        AuditEntry::new("UPDATE", "product_imei_serials", id)
            .by(extract_user_id(&claims).ok())
            .before(&existing)
            .after(&unit),
    )
    .await;

    Ok(Json(unit))
}

pub async fn delete_serial(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let db = state.db()?;

    let existing = imei_queries::find_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unidad {} no encontrada", id)))?;

    if existing.status.is_locked() {
        return Err(AppError::Conflict(
            "Una unidad vendida no se puede eliminar".to_string(),
        ));
    }

    imei_queries::delete_unit(db, id).await?;

    audit_queries::log_action(
        db,
        AuditEntry::new("DELETE", "product_imei_serials", id)
            .by(extract_user_id(&claims).ok())
            .before(&existing),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(ImeiSerialType::Imei), CodeKind::Imei, true)]
    #[case(Some(ImeiSerialType::Imei), CodeKind::Serial, false)]
    #[case(Some(ImeiSerialType::Serial), CodeKind::Imei, false)]
    #[case(Some(ImeiSerialType::Both), CodeKind::Serial, true)]
    #[case(None, CodeKind::Imei, true)]
    fn tracking_type_limits_bulk_kind(
        #[case] tracking: Option<ImeiSerialType>,
        #[case] kind: CodeKind,
        #[case] expected: bool,
    ) {
        assert_eq!(accepts(tracking, kind), expected);
    }

    #[test]
    fn codes_skip_blank_identifiers() {
        let req = ImeiSerialRequest {
            imei1: Some(" 356938035643809 ".to_string()),
            imei2: Some("  ".to_string()),
            ..ImeiSerialRequest::default()
        };

        assert_eq!(codes_of(&req), vec!["356938035643809".to_string()]);
    }
}
