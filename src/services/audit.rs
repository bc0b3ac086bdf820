use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    error::{AppError, Result},
    models::{
        AuditLog, AuditReport, IntegrityCheck, IntegrityReport, IntegrityStatus, IssueSeverity,
        ReportConfiguration, ReportIssue, ReportValidation,
    },
};

pub const MAX_REPORT_DAYS: i64 = 3 * 365;
pub const LARGE_REPORT_DAYS: i64 = 365;

pub const AUDITED_TABLES: &[&str] = &[
    "products",
    "categories",
    "suppliers",
    "customers",
    "sales",
    "cash_registers",
    "cash_movements",
    "product_imei_serials",
    "import_batches",
    "users",
];

pub const AUDIT_ACTIONS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "SALE", "IMPORT", "LOGIN", "OPEN", "CLOSE", "CLASSIFY",
];

fn issue(severity: IssueSeverity, field: &str, message: impl Into<String>) -> ReportIssue {
    ReportIssue {
        severity,
        field: field.to_string(),
        message: message.into(),
    }
}

pub fn validate_report_configuration(
    config: &ReportConfiguration,
    today: NaiveDate,
) -> ReportValidation {
    let mut issues = Vec::new();

    let span = (config.end_date - config.start_date).num_days();

    if span < 0 {
        issues.push(issue(
            IssueSeverity::Critical,
            "end_date",
            "La fecha final es anterior a la fecha inicial",
        ));
    } else if span > MAX_REPORT_DAYS {
        issues.push(issue(
            IssueSeverity::Critical,
            "end_date",
            "El rango de fechas no puede superar 3 años",
        ));
    } else if span > LARGE_REPORT_DAYS {
        issues.push(issue(
            IssueSeverity::Warning,
            "end_date",
            "Un rango mayor a un año puede generar un reporte muy grande",
        ));
    }

    if config.start_date > today {
        issues.push(issue(
            IssueSeverity::Critical,
            "start_date",
            "La fecha inicial no puede estar en el futuro",
        ));
    }

    if config.tables.is_empty() {
        issues.push(issue(
            IssueSeverity::Info,
            "tables",
            "No se seleccionaron tablas: se incluirán todas",
        ));
    }

    for table in config
        .tables
        .iter()
        .filter(|t| !AUDITED_TABLES.contains(&t.as_str()))
    {
        issues.push(issue(
            IssueSeverity::Warning,
            "tables",
            format!("La tabla '{}' no está auditada", table),
        ));
    }

    for action in config
        .actions
        .iter()
        .filter(|a| !AUDIT_ACTIONS.contains(&a.to_uppercase().as_str()))
    {
        issues.push(issue(
            IssueSeverity::Warning,
            "actions",
            format!("La acción '{}' no es reconocida", action),
        ));
    }

    ReportValidation {
        is_valid: !issues.iter().any(|i| i.severity == IssueSeverity::Critical),
        issues,
    }
}

/// Flat CSV rendering of a report's entries, one row per audit log.
pub fn report_to_csv(report: &AuditReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "id",
            "created_at",
            "user_id",
            "action",
            "table_name",
            "record_id",
            "old_values",
            "new_values",
        ])
        .map_err(csv_error)?;

    for entry in &report.entries {
        writer.write_record(log_record(entry)).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("CSV flush failed: {}", e)))?;

    String::from_utf8(bytes).map_err(|e| AppError::InternalError(e.to_string()))
}

fn log_record(entry: &AuditLog) -> [String; 8] {
    [
        entry.id.to_string(),
        entry.created_at.to_rfc3339(),
        entry.user_id.map(|id| id.to_string()).unwrap_or_default(),
        entry.action.clone(),
        entry.table_name.clone(),
        entry.record_id.clone().unwrap_or_default(),
        entry
            .old_values
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default(),
        entry
            .new_values
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default(),
    ]
}

/// A named consistency query returning the number of offending rows.
pub struct IntegrityRule {
    pub name: &'static str,
    pub description: &'static str,
    pub query: &'static str,
    pub status_on_hit: IntegrityStatus,
}

pub const INTEGRITY_RULES: &[IntegrityRule] = &[
    IntegrityRule {
        name: "negative_stock",
        description: "Productos con stock negativo",
        query: "SELECT COUNT(*)::bigint FROM products WHERE stock < 0",
        status_on_hit: IntegrityStatus::Failed,
    },
    IntegrityRule {
        name: "price_below_cost",
        description: "Productos con precio de venta menor al costo",
        query: "SELECT COUNT(*)::bigint FROM products WHERE sale_price < purchase_price",
        status_on_hit: IntegrityStatus::Warning,
    },
    IntegrityRule {
        name: "orphan_category",
        description: "Productos que referencian una categoría inexistente",
        query: "SELECT COUNT(*)::bigint FROM products p
                WHERE p.category_id IS NOT NULL
                  AND NOT EXISTS (SELECT 1 FROM categories c WHERE c.id = p.category_id)",
        status_on_hit: IntegrityStatus::Failed,
    },
    IntegrityRule {
        name: "orphan_supplier",
        description: "Productos que referencian un proveedor inexistente",
        query: "SELECT COUNT(*)::bigint FROM products p
                WHERE p.supplier_id IS NOT NULL
                  AND NOT EXISTS (SELECT 1 FROM suppliers s WHERE s.id = p.supplier_id)",
        status_on_hit: IntegrityStatus::Failed,
    },
    IntegrityRule {
        name: "duplicate_barcodes",
        description: "Códigos de barras repetidos",
        query: "SELECT COUNT(*)::bigint FROM (
                    SELECT barcode FROM products WHERE barcode IS NOT NULL
                    GROUP BY barcode HAVING COUNT(*) > 1
                ) AS duplicated",
        status_on_hit: IntegrityStatus::Failed,
    },
    IntegrityRule {
        name: "sold_units_without_sale",
        description: "Unidades IMEI/serie vendidas sin venta asociada",
        query: "SELECT COUNT(*)::bigint FROM product_imei_serials
                WHERE status = 'sold' AND sale_id IS NULL",
        status_on_hit: IntegrityStatus::Warning,
    },
    IntegrityRule {
        name: "serialized_stock_mismatch",
        description: "Productos serializados cuyo stock no coincide con las unidades disponibles",
        query: "SELECT COUNT(*)::bigint FROM products p
                WHERE p.has_imei_serial
                  AND p.stock <> (
                      SELECT COUNT(*) FROM product_imei_serials u
                      WHERE u.product_id = p.id AND u.status IN ('available', 'reserved')
                  )",
        status_on_hit: IntegrityStatus::Warning,
    },
    IntegrityRule {
        name: "sale_total_mismatch",
        description: "Ventas cuyo total no coincide con subtotal menos descuento",
        query: "SELECT COUNT(*)::bigint FROM sales WHERE total <> subtotal - discount",
        status_on_hit: IntegrityStatus::Failed,
    },
];

pub fn evaluate_integrity(rule: &IntegrityRule, affected: i64) -> IntegrityCheck {
    IntegrityCheck {
        name: rule.name,
        description: rule.description,
        status: if affected > 0 {
            rule.status_on_hit
        } else {
            IntegrityStatus::Ok
        },
        affected,
    }
}

/// Healthy means no check failed; warnings are reported but tolerated.
pub fn integrity_report(checks: Vec<IntegrityCheck>, checked_at: DateTime<Utc>) -> IntegrityReport {
    IntegrityReport {
        checked_at,
        healthy: checks.iter().all(|c| c.status != IntegrityStatus::Failed),
        checks,
    }
}

pub(crate) fn csv_error(err: csv::Error) -> AppError {
    AppError::InternalError(format!("CSV error: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(start: NaiveDate, end: NaiveDate) -> ReportConfiguration {
        ReportConfiguration {
            start_date: start,
            end_date: end,
            tables: vec!["products".to_string()],
            actions: vec!["insert".to_string()],
            user_id: None,
            include_details: false,
            format: Default::default(),
        }
    }

    fn today() -> NaiveDate {
        date(2024, 6, 1)
    }

    #[test]
    fn range_longer_than_three_years_is_critical() {
        let validation =
            validate_report_configuration(&config(date(2020, 1, 1), date(2024, 1, 1)), today());

        assert!(!validation.is_valid);
        assert!(
            validation
                .issues
                .iter()
                .any(|i| i.severity == IssueSeverity::Critical && i.field == "end_date")
        );
    }

    #[rstest]
    #[case(date(2021, 1, 1), date(2024, 1, 1), 1095, true)]
    #[case(date(2020, 1, 1), date(2023, 1, 1), 1096, false)]
    fn three_year_limit_counts_days(
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
        #[case] days: i64,
        #[case] valid: bool,
    ) {
        assert_eq!((end - start).num_days(), days);
        assert_eq!(MAX_REPORT_DAYS, 1095);

        let validation = validate_report_configuration(&config(start, end), today());
        assert_eq!(validation.is_valid, valid);
    }

    #[rstest]
    #[case(date(2024, 1, 1), date(2024, 3, 1), true, 0)]
    #[case(date(2022, 1, 1), date(2024, 3, 1), true, 1)]
    #[case(date(2024, 3, 1), date(2024, 1, 1), false, 0)]
    fn range_rules(
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
        #[case] valid: bool,
        #[case] warnings: usize,
    ) {
        let validation = validate_report_configuration(&config(start, end), today());
        assert_eq!(validation.is_valid, valid);
        assert_eq!(
            validation
                .issues
                .iter()
                .filter(|i| i.severity == IssueSeverity::Warning)
                .count(),
            warnings
        );
    }

    #[test]
    fn future_start_is_critical() {
        let validation =
            validate_report_configuration(&config(date(2024, 7, 1), date(2024, 8, 1)), today());
        assert!(!validation.is_valid);
    }

    #[test]
    fn unknown_tables_and_actions_warn() {
        let mut cfg = config(date(2024, 1, 1), date(2024, 2, 1));
        cfg.tables = vec!["sessions".to_string()];
        cfg.actions = vec!["PURGE".to_string()];

        let validation = validate_report_configuration(&cfg, today());

        assert!(validation.is_valid);
        assert_eq!(validation.issues.len(), 2);
    }

    #[test]
    fn empty_tables_is_informational() {
        let mut cfg = config(date(2024, 1, 1), date(2024, 2, 1));
        cfg.tables.clear();

        let validation = validate_report_configuration(&cfg, today());

        assert!(validation.is_valid);
        assert_eq!(validation.issues[0].severity, IssueSeverity::Info);
    }

    #[test]
    fn integrity_status_follows_affected_rows() {
        let warning_rule = &INTEGRITY_RULES[1];
        assert_eq!(evaluate_integrity(warning_rule, 0).status, IntegrityStatus::Ok);
        assert_eq!(evaluate_integrity(warning_rule, 3).status, IntegrityStatus::Warning);

        let report = integrity_report(
            vec![
                evaluate_integrity(warning_rule, 3),
                evaluate_integrity(&INTEGRITY_RULES[0], 0),
            ],
            Utc::now(),
        );
        assert!(report.healthy);

        let report = integrity_report(vec![evaluate_integrity(&INTEGRITY_RULES[0], 1)], Utc::now());
        assert!(!report.healthy);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let report = AuditReport {
            configuration: config(date(2024, 1, 1), date(2024, 2, 1)),
            generated_at: Utc::now(),
            total_entries: 1,
            by_action: Vec::new(),
            by_table: Vec::new(),
            by_user: Vec::new(),
            entries: vec![AuditLog {
                id: 7,
                user_id: Some(1),
                action: "DELETE".to_string(),
                table_name: "products".to_string(),
                record_id: Some("12".to_string()),
                old_values: Some(serde_json::json!({ "name": "Mouse, inalámbrico" })),
                new_values: None,
                created_at: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            }],
            warnings: Vec::new(),
        };

        let csv = report_to_csv(&report).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next(),
            Some("id,created_at,user_id,action,table_name,record_id,old_values,new_values")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("7,2024-01-15T10:00:00+00:00,1,DELETE,products,12,"));
        assert!(lines.next().is_none());
    }
}
