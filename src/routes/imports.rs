use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AuditEntry, CreateCategoryRequest, ImportBatch, ImportFormat, ImportRequest,
        ImportRowError, ImportSummary, ProductDraft,
    },
    queries::{audit_queries, category_queries, import_queries, product_queries},
    services::{
        import::{parse_csv, parse_json},
        validation::validate_product,
    },
    utils::{extractors::extract_user_id, jwt::Claims},
};

/// Names and barcodes already present, including rows inserted earlier in the same file.
#[derive(Debug, Default)]
struct KnownKeys {
    names: HashSet<String>,
    barcodes: HashSet<String>,
}

impl KnownKeys {
    fn contains(&self, draft: &ProductDraft) -> bool {
        self.names.contains(&draft.name.to_lowercase())
            || draft
                .barcode
                .as_ref()
                .is_some_and(|barcode| self.barcodes.contains(barcode))
    }

    fn insert(&mut self, draft: &ProductDraft) {
        self.names.insert(draft.name.to_lowercase());
        if let Some(barcode) = &draft.barcode {
            self.barcodes.insert(barcode.clone());
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum RowDecision {
    Insert,
    Duplicate,
    Invalid(String),
}

/// Decides a row's fate before anything is written for it, categories included.
fn screen_row(draft: &ProductDraft, known: &KnownKeys) -> RowDecision {
    let report = validate_product(draft);
    if !report.is_valid {
        let message = report
            .errors
            .iter()
            .map(|issue| issue.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return RowDecision::Invalid(message);
    }

    if known.contains(draft) {
        return RowDecision::Duplicate;
    }

    RowDecision::Insert
}

fn row_error(row: usize, message: impl Into<String>) -> ImportRowError {
    ImportRowError {
        row,
        message: message.into(),
    }
}

pub async fn import_products(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportSummary>> {
    let db = state.db()?;
    let user_id = extract_user_id(&claims)?;

    if payload.file_name.trim().is_empty() {
        return Err(AppError::BadRequest("Falta el nombre del archivo".to_string()));
    }

    let parsed = match payload.format {
        ImportFormat::Csv => parse_csv(&payload.content)?,
        ImportFormat::Json => parse_json(&payload.content)?,
    };

    let total = parsed.rows.len() + parsed.errors.len() + parsed.skipped_short_rows;
    let batch =
        import_queries::create_batch(db, payload.file_name.trim(), payload.format, total as i32, user_id)
            .await?;

    let (names, barcodes) = import_queries::existing_keys(db).await?;
    let mut known = KnownKeys { names, barcodes };

    let mut categories: HashMap<String, i32> = category_queries::list_all(db)
        .await?
        .into_iter()
        .map(|c| (c.name.to_lowercase(), c.id))
        .collect();

    let mut errors = parsed.errors;
    let mut skipped = parsed.skipped_short_rows;
    let mut processed = 0usize;
    let mut categories_created = Vec::new();

    for (row, item) in parsed.rows {
        let mut draft = item.to_draft(None);
        draft.import_batch_id = Some(batch.id);

        match screen_row(&draft, &known) {
            RowDecision::Insert => {}
            RowDecision::Duplicate => {
                skipped += 1;
                continue;
            }
            RowDecision::Invalid(message) => {
                errors.push(row_error(row, message));
                continue;
            }
        }

        let category_name = item
            .category
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        draft.category_id = match category_name {
            None => None,
            Some(name) => match categories.get(&name.to_lowercase()) {
                Some(id) => Some(*id),
                None => {
                    let request = CreateCategoryRequest {
                        name: name.to_string(),
                        description: None,
                        color: None,
                    };
                    match category_queries::create_category(db, &request).await {
                        Ok(category) => {
                            categories.insert(category.name.to_lowercase(), category.id);
                            categories_created.push(category.name);
                            Some(category.id)
                        }
                        Err(e) => {
                            errors.push(row_error(row, e.to_string()));
                            continue;
                        }
                    }
                }
            },
        };

        match product_queries::create_product(db, &draft).await {
            Ok(_) => {
                known.insert(&draft);
                processed += 1;
            }
            Err(e) => {
                tracing::warn!("Import row {} of batch {} failed: {}", row, batch.id, e);
                errors.push(row_error(row, e.to_string()));
            }
        }
    }

    import_queries::finish_batch(
        db,
        batch.id,
        processed as i32,
        skipped as i32,
        errors.len() as i32,
    )
    .await?;

    tracing::info!(
        "Import {} ({}): {} processed, {} skipped, {} errored",
        batch.id,
        batch.file_name,
        processed,
        skipped,
        errors.len()
    );

    let summary = ImportSummary {
        batch_id: batch.id,
        total,
        processed,
        skipped,
        errored: errors.len(),
        errors,
        categories_created,
    };

    audit_queries::log_action(
        db,
        AuditEntry::new("IMPORT", "import_batches", batch.id)
            .by(Some(user_id))
            .after(&summary),
    )
    .await;

    Ok(Json(summary))
}

pub async fn list_imports(State(state): State<AppState>) -> Result<Json<Vec<ImportBatch>>> {
    let batches = import_queries::list_batches(state.db()?).await?;

    Ok(Json(batches))
}

pub async fn delete_import(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let db = state.db()?;

    let removed = import_queries::delete_batch(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lote {} no encontrado", id)))?;

    tracing::info!("Deleted import batch {} with {} products", id, removed);

    audit_queries::log_action(
        db,
        AuditEntry::new("DELETE", "import_batches", id)
            .by(extract_user_id(&claims).ok())
            .after(&serde_json::json!({ "products_removed": removed })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductImportRow;
    use rust_decimal::{Decimal, dec};

    fn draft(name: &str, barcode: Option<&str>) -> ProductDraft {
        ProductImportRow {
            name: name.to_string(),
            barcode: barcode.map(str::to_string),
            ..ProductImportRow::default()
        }
        .to_draft(None)
    }

    #[test]
    fn known_keys_match_names_case_insensitively() {
        let mut known = KnownKeys::default();
        known.insert(&draft("Cargador USB-C", None));

        assert!(known.contains(&draft("cargador usb-c", None)));
        assert!(!known.contains(&draft("Cargador Lightning", None)));
    }

    #[test]
    fn invalid_and_duplicate_rows_are_screened_out() {
        let mut known = KnownKeys::default();
        known.insert(&draft("Funda silicona", None));

        let valid = ProductDraft {
            sale_price: dec!(15),
            ..draft("Cargador 20W", None)
        };
        assert_eq!(screen_row(&valid, &known), RowDecision::Insert);

        let duplicate = ProductDraft {
            sale_price: dec!(15),
            ..draft("FUNDA SILICONA", None)
        };
        assert_eq!(screen_row(&duplicate, &known), RowDecision::Duplicate);

        let no_price = draft("Cable HDMI", None);
        assert!(matches!(screen_row(&no_price, &known), RowDecision::Invalid(_)));

        let oversized = ProductDraft {
            sale_price: Decimal::MAX,
            ..draft("Cable HDMI", None)
        };
        assert!(matches!(screen_row(&oversized, &known), RowDecision::Invalid(_)));
    }

    #[test]
    fn known_keys_match_barcodes() {
        let mut known = KnownKeys::default();
        known.insert(&draft("Funda", Some("7701234567890")));

        assert!(known.contains(&draft("Funda silicona", Some("7701234567890"))));
        assert!(!known.contains(&draft("Funda silicona", Some("7700000000000"))));
    }
}
