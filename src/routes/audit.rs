use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AuditLog, AuditLogQuery, IntegrityReport, IssueSeverity, ReportConfiguration,
        ReportFormat, ReportValidation,
    },
    queries::audit_queries,
    services::audit::{integrity_report, report_to_csv, validate_report_configuration},
};

pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(params): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditLog>>> {
    let logs = audit_queries::list_logs(state.db()?, &params).await?;

    Ok(Json(logs))
}

pub async fn validate_report_config(
    Json(payload): Json<ReportConfiguration>,
) -> Json<ReportValidation> {
    Json(validate_report_configuration(
        &payload,
        Utc::now().date_naive(),
    ))
}

pub async fn generate_report(
    State(state): State<AppState>,
    Json(payload): Json<ReportConfiguration>,
) -> Result<Response> {
    let db = state.db()?;

    let validation = validate_report_configuration(&payload, Utc::now().date_naive());

    if !validation.is_valid {
        let reasons = validation
            .issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Critical)
            .map(|issue| issue.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(AppError::BadRequest(reasons));
    }

    let warnings = validation
        .issues
        .into_iter()
        .filter(|issue| issue.severity != IssueSeverity::Critical)
        .collect();

    let format = payload.format;
    let report = audit_queries::generate_report(db, payload, warnings).await?;

    tracing::info!(
        "Generated audit report with {} entries ({} returned)",
        report.total_entries,
        report.entries.len()
    );

    let response = match format {
        ReportFormat::Json => Json(report).into_response(),
        ReportFormat::Csv => {
            let csv = report_to_csv(&report)?;
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"auditoria.csv\"",
                    ),
                ],
                csv,
            )
                .into_response()
        }
    };

    Ok(response)
}

pub async fn check_integrity(State(state): State<AppState>) -> Result<Json<IntegrityReport>> {
    let checks = audit_queries::run_integrity_checks(state.db()?).await?;
    let report = integrity_report(checks, Utc::now());

    if !report.healthy {
        tracing::warn!("Integrity check found failing rules");
    }

    Ok(Json(report))
}
