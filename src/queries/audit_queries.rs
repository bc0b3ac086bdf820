use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{
        AuditEntry, AuditLog, AuditLogQuery, AuditReport, CountEntry, IntegrityCheck,
        IssueSeverity, ReportConfiguration, ReportIssue,
    },
    services::audit::{INTEGRITY_RULES, evaluate_integrity},
};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 1000;
const REPORT_ENTRY_LIMIT: i64 = 10_000;

pub async fn record(pool: &PgPool, entry: &AuditEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO audit_logs (user_id, action, table_name, record_id, old_values, new_values)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.table_name)
    .bind(&entry.record_id)
    .bind(&entry.old_values)
    .bind(&entry.new_values)
    .execute(pool)
    .await?;

    Ok(())
}

/// Best-effort audit write: a failure is logged and never reaches the caller.
pub async fn log_action(pool: &PgPool, entry: AuditEntry) {
    if let Err(e) = record(pool, &entry).await {
        tracing::warn!(
            "Failed to record audit entry {} on {}: {}",
            entry.action,
            entry.table_name,
            e
        );
    }
}

pub async fn list_logs(pool: &PgPool, params: &AuditLogQuery) -> Result<Vec<AuditLog>> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM audit_logs WHERE 1=1");

    if let Some(ref table_name) = params.table_name {
        query.push(" AND table_name = ");
        query.push_bind(table_name.clone());
    }

    if let Some(ref action) = params.action {
        query.push(" AND action = ");
        query.push_bind(action.to_uppercase());
    }

    if let Some(user_id) = params.user_id {
        query.push(" AND user_id = ");
        query.push_bind(user_id);
    }

    if let Some(from) = params.from {
        query.push(" AND created_at >= ");
        query.push_bind(from);
    }

    if let Some(to) = params.to {
        query.push(" AND created_at < ");
        query.push_bind(to);
        query.push(" + 1");
    }

    query.push(" ORDER BY created_at DESC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let logs = query.build_query_as::<AuditLog>().fetch_all(pool).await?;

    Ok(logs)
}

fn push_report_filters(query: &mut QueryBuilder<'_, Postgres>, config: &ReportConfiguration) {
    query.push(" WHERE created_at >= ");
    query.push_bind(config.start_date);
    query.push(" AND created_at < ");
    query.push_bind(config.end_date);
    query.push(" + 1");

    if !config.tables.is_empty() {
        query.push(" AND table_name = ANY(");
        query.push_bind(config.tables.clone());
        query.push(")");
    }

    if !config.actions.is_empty() {
        let actions: Vec<String> = config.actions.iter().map(|a| a.to_uppercase()).collect();
        query.push(" AND action = ANY(");
        query.push_bind(actions);
        query.push(")");
    }

    if let Some(user_id) = config.user_id {
        query.push(" AND user_id = ");
        query.push_bind(user_id);
    }
}

async fn count_by(
    pool: &PgPool,
    key_expr: &'static str,
    config: &ReportConfiguration,
) -> Result<Vec<CountEntry>> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
    query.push(key_expr);
    query.push(" AS key, COUNT(*)::bigint AS count FROM audit_logs");
    push_report_filters(&mut query, config);
    query.push(" GROUP BY 1 ORDER BY count DESC, key ASC");

    let counts = query.build_query_as::<CountEntry>().fetch_all(pool).await?;

    Ok(counts)
}

/// Aggregates and entries for an already validated configuration.
pub async fn generate_report(
    pool: &PgPool,
    config: ReportConfiguration,
    mut warnings: Vec<ReportIssue>,
) -> Result<AuditReport> {
    let (by_action, by_table, by_user) = tokio::try_join!(
        count_by(pool, "action", &config),
        count_by(pool, "table_name", &config),
        count_by(pool, "COALESCE(user_id::text, 'sistema')", &config),
    )?;

    let total_entries: i64 = by_action.iter().map(|c| c.count).sum();

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(if config.include_details {
        "SELECT * FROM audit_logs"
    } else {
        "SELECT id, user_id, action, table_name, record_id, NULL::jsonb AS old_values, NULL::jsonb AS new_values, created_at FROM audit_logs"
    });
    push_report_filters(&mut query, &config);
    query.push(" ORDER BY created_at ASC LIMIT ");
    query.push_bind(REPORT_ENTRY_LIMIT);

    let entries = query.build_query_as::<AuditLog>().fetch_all(pool).await?;

    if total_entries > REPORT_ENTRY_LIMIT {
        warnings.push(ReportIssue {
            severity: IssueSeverity::Warning,
            field: "entries".to_string(),
            message: format!(
                "El reporte incluye solo los primeros {} de {} registros",
                REPORT_ENTRY_LIMIT, total_entries
            ),
        });
    }

    Ok(AuditReport {
        configuration: config,
        generated_at: Utc::now(),
        total_entries,
        by_action,
        by_table,
        by_user,
        entries,
        warnings,
    })
}

pub async fn run_integrity_checks(pool: &PgPool) -> Result<Vec<IntegrityCheck>> {
    let mut checks = Vec::with_capacity(INTEGRITY_RULES.len());

    for rule in INTEGRITY_RULES {
        let affected = sqlx::query_scalar::<_, i64>(rule.query)
            .fetch_one(pool)
            .await?;

        checks.push(evaluate_integrity(rule, affected));
    }

    Ok(checks)
}
