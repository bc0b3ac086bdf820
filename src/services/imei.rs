use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::{BulkPartition, CodeKind, ImeiSerialRequest, ValidationReport};

fn imei_regex() -> &'static Regex {
    static IMEI: OnceLock<Regex> = OnceLock::new();
    IMEI.get_or_init(|| {
        Regex::new(r"^[0-9]{15}$")
            .unwrap_or_else(|error| panic!("imei regex failed to compile: {error}"))
    })
}

fn serial_regex() -> &'static Regex {
    static SERIAL: OnceLock<Regex> = OnceLock::new();
    SERIAL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]{3,50}$")
            .unwrap_or_else(|error| panic!("serial regex failed to compile: {error}"))
    })
}

pub fn validate_imei(code: &str) -> bool {
    imei_regex().is_match(code)
}

pub fn validate_serial(code: &str) -> bool {
    serial_regex().is_match(code)
}

pub fn validate_code(kind: CodeKind, code: &str) -> bool {
    match kind {
        CodeKind::Imei => validate_imei(code),
        CodeKind::Serial => validate_serial(code),
    }
}

/// Splits one-code-per-line input into valid, malformed and duplicate codes.
///
/// A code is a duplicate when `existing` already holds it or when it appeared
/// earlier in the same input; only its first valid occurrence counts as valid.
pub fn partition_bulk_input(
    input: &str,
    kind: CodeKind,
    existing: &HashSet<String>,
) -> BulkPartition {
    let mut partition = BulkPartition::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for code in input.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if !validate_code(kind, code) {
            partition.invalid.push(code.to_string());
        } else if existing.contains(code) || !seen.insert(code) {
            partition.duplicates.push(code.to_string());
        } else {
            partition.valid.push(code.to_string());
        }
    }

    partition
}

/// Non-empty trimmed lines of a bulk input, used for the duplicate lookup.
pub fn bulk_candidates(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Format checks for a single unit. At least one identifier is required.
pub fn validate_unit(req: &ImeiSerialRequest) -> ValidationReport {
    let mut report = ValidationReport::default();

    let imei1 = req.imei1.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let imei2 = req.imei2.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let serial = req
        .serial_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if imei1.is_none() && imei2.is_none() && serial.is_none() {
        report.error("imei1", "Ingrese un IMEI o un número de serie");
    }

    if imei1.is_some_and(|code| !validate_imei(code)) {
        report.error("imei1", "El IMEI debe tener exactamente 15 dígitos");
    }

    if imei2.is_some_and(|code| !validate_imei(code)) {
        report.error("imei2", "El IMEI debe tener exactamente 15 dígitos");
    }

    if imei1.is_some() && imei1 == imei2 {
        report.error("imei2", "El segundo IMEI no puede repetir el primero");
    }

    if serial.is_some_and(|code| !validate_serial(code)) {
        report.error(
            "serial_number",
            "El número de serie debe tener entre 3 y 50 caracteres alfanuméricos",
        );
    }

    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("356938035643809", true)]
    #[case("35693803564380", false)]
    #[case("3569380356438091", false)]
    #[case("35693803564380a", false)]
    #[case("", false)]
    fn imei_must_be_fifteen_digits(#[case] code: &str, #[case] valid: bool) {
        assert_eq!(validate_imei(code), valid);
    }

    #[rstest]
    #[case("ABC", true)]
    #[case("C02XK1ZJJG5J", true)]
    #[case("AB", false)]
    #[case("SN-123", false)]
    fn serial_is_short_alphanumeric(#[case] code: &str, #[case] valid: bool) {
        assert_eq!(validate_serial(code), valid);
    }

    #[test]
    fn serial_length_is_bounded() {
        assert!(validate_serial(&"A".repeat(50)));
        assert!(!validate_serial(&"A".repeat(51)));
    }

    #[test]
    fn bulk_input_is_partitioned() {
        let existing: HashSet<String> = ["490154203237518".to_string()].into_iter().collect();
        let input = "356938035643809\n\n  12345\n490154203237518\n356938035643809\n352099001761481\n";

        let partition = partition_bulk_input(input, CodeKind::Imei, &existing);

        assert_eq!(
            partition.valid,
            vec!["356938035643809".to_string(), "352099001761481".to_string()]
        );
        assert_eq!(partition.invalid, vec!["12345".to_string()]);
        assert_eq!(
            partition.duplicates,
            vec!["490154203237518".to_string(), "356938035643809".to_string()]
        );
    }

    #[test]
    fn bulk_candidates_skip_blank_lines() {
        assert_eq!(bulk_candidates(" a \n\n b\n"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn unit_needs_an_identifier() {
        let report = validate_unit(&ImeiSerialRequest::default());
        assert!(!report.is_valid);
    }

    #[test]
    fn unit_rejects_repeated_imei() {
        let report = validate_unit(&ImeiSerialRequest {
            imei1: Some("356938035643809".to_string()),
            imei2: Some("356938035643809".to_string()),
            ..ImeiSerialRequest::default()
        });
        assert!(report.has_error_for("imei2"));
    }

    #[test]
    fn unit_with_serial_only_is_valid() {
        let report = validate_unit(&ImeiSerialRequest {
            serial_number: Some("SN0042".to_string()),
            ..ImeiSerialRequest::default()
        });
        assert!(report.is_valid);
    }
}
