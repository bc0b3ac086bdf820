use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::{Decimal, dec};

use crate::models::{ProductDraft, ValidationReport};
use crate::services::analytics::calculate_profit_margin;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;
const STOCK_WARNING: i32 = 10_000;
const MARGIN_WARNING: Decimal = dec!(300);

/// Largest amount a `NUMERIC(12,2)` money column holds.
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);
const AMOUNT_SCALE: u32 = 2;

/// Whether a money value fits the money columns: at most two decimals and
/// no larger than [`MAX_AMOUNT`] in magnitude.
pub fn amount_fits(value: Decimal) -> bool {
    value.abs() <= MAX_AMOUNT && value.normalize().scale() <= AMOUNT_SCALE
}

fn barcode_regex() -> &'static Regex {
    static BARCODE: OnceLock<Regex> = OnceLock::new();
    BARCODE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9-]{4,50}$")
            .unwrap_or_else(|error| panic!("barcode regex failed to compile: {error}"))
    })
}

pub fn validate_product(draft: &ProductDraft) -> ValidationReport {
    let mut report = ValidationReport::default();

    let name_len = draft.name.trim().chars().count();
    if name_len == 0 {
        report.error("name", "El nombre es obligatorio");
    } else if name_len < NAME_MIN {
        report.error("name", format!("El nombre debe tener al menos {} caracteres", NAME_MIN));
    } else if name_len > NAME_MAX {
        report.error("name", format!("El nombre no puede superar {} caracteres", NAME_MAX));
    }

    if draft
        .description
        .as_ref()
        .is_some_and(|d| d.chars().count() > DESCRIPTION_MAX)
    {
        report.error(
            "description",
            format!("La descripción no puede superar {} caracteres", DESCRIPTION_MAX),
        );
    }

    if draft
        .barcode
        .as_ref()
        .is_some_and(|b| !barcode_regex().is_match(b))
    {
        report.error(
            "barcode",
            "El código de barras debe tener entre 4 y 50 caracteres alfanuméricos",
        );
    }

    let mut prices_fit = true;
    for (field, price) in [
        ("purchase_price", draft.purchase_price),
        ("sale_price", draft.sale_price),
    ] {
        if !amount_fits(price) {
            report.error(
                field,
                format!(
                    "El precio debe tener como máximo 2 decimales y no superar {}",
                    MAX_AMOUNT
                ),
            );
            prices_fit = false;
        }
    }

    if draft.purchase_price < Decimal::ZERO {
        report.error("purchase_price", "El precio de compra no puede ser negativo");
    }

    if draft.sale_price <= Decimal::ZERO {
        report.error("sale_price", "El precio de venta debe ser mayor a cero");
    } else if prices_fit {
        if draft.sale_price < draft.purchase_price {
            report.warning(
                "sale_price",
                "El precio de venta es menor al precio de compra",
            );
        } else if calculate_profit_margin(draft.purchase_price, draft.sale_price) > MARGIN_WARNING
        {
            report.warning("sale_price", "El margen de ganancia supera el 300%");
        }
    }

    if draft.stock < 0 {
        report.error("stock", "El stock no puede ser negativo");
    } else if draft.stock > STOCK_WARNING {
        report.warning("stock", "El stock es inusualmente alto");
    }

    if draft.min_stock < 0 {
        report.error("min_stock", "El stock mínimo no puede ser negativo");
    }

    if draft.has_imei_serial && draft.imei_serial_type.is_none() {
        report.error(
            "imei_serial_type",
            "Indique si el producto usa IMEI, número de serie o ambos",
        );
    }

    report.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImeiSerialType, ProductRequest};
    use rstest::rstest;

    fn draft() -> ProductDraft {
        ProductDraft::from_request(&ProductRequest {
            name: Some("Galaxy A54".to_string()),
            purchase_price: Some(dec!(250)),
            sale_price: Some(dec!(320)),
            stock: Some(5),
            min_stock: Some(2),
            ..ProductRequest::default()
        })
    }

    #[test]
    fn accepts_a_regular_product() {
        let report = validate_product(&draft());
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[rstest]
    #[case("", "name")]
    #[case("A", "name")]
    fn rejects_short_names(#[case] name: &str, #[case] field: &str) {
        let report = validate_product(&ProductDraft {
            name: name.to_string(),
            ..draft()
        });
        assert!(!report.is_valid);
        assert!(report.has_error_for(field));
    }

    #[test]
    fn rejects_long_names_and_descriptions() {
        let report = validate_product(&ProductDraft {
            name: "x".repeat(101),
            description: Some("y".repeat(501)),
            ..draft()
        });
        assert!(report.has_error_for("name"));
        assert!(report.has_error_for("description"));
    }

    #[rstest]
    #[case("7790001234567", true)]
    #[case("SKU-001", true)]
    #[case("ab", false)]
    #[case("código#1", false)]
    fn checks_barcode_format(#[case] barcode: &str, #[case] valid: bool) {
        let report = validate_product(&ProductDraft {
            barcode: Some(barcode.to_string()),
            ..draft()
        });
        assert_eq!(!report.has_error_for("barcode"), valid);
    }

    #[test]
    fn price_rules() {
        let zero_price = validate_product(&ProductDraft {
            sale_price: Decimal::ZERO,
            ..draft()
        });
        assert!(zero_price.has_error_for("sale_price"));

        let below_cost = validate_product(&ProductDraft {
            sale_price: dec!(200),
            ..draft()
        });
        assert!(below_cost.is_valid);
        assert!(below_cost.has_warning_for("sale_price"));

        let huge_margin = validate_product(&ProductDraft {
            purchase_price: dec!(1),
            sale_price: dec!(10),
            ..draft()
        });
        assert!(huge_margin.has_warning_for("sale_price"));

        let negative_cost = validate_product(&ProductDraft {
            purchase_price: dec!(-1),
            ..draft()
        });
        assert!(negative_cost.has_error_for("purchase_price"));
    }

    #[rstest]
    #[case(dec!(9999999999.99), true)]
    #[case(dec!(10000000000), false)]
    #[case(dec!(19.999), false)]
    #[case(dec!(19.990), true)]
    #[case(Decimal::MAX, false)]
    fn money_fits_the_price_columns(#[case] price: Decimal, #[case] fits: bool) {
        assert_eq!(amount_fits(price), fits);
    }

    #[test]
    fn oversized_prices_are_field_errors() {
        let report = validate_product(&ProductDraft {
            purchase_price: dec!(0.01),
            sale_price: Decimal::MAX,
            ..draft()
        });
        assert!(!report.is_valid);
        assert!(report.has_error_for("sale_price"));
        assert!(!report.has_error_for("purchase_price"));

        let fractional = validate_product(&ProductDraft {
            purchase_price: dec!(10.005),
            ..draft()
        });
        assert!(fractional.has_error_for("purchase_price"));
    }

    #[test]
    fn stock_rules() {
        let negative = validate_product(&ProductDraft {
            stock: -1,
            min_stock: -1,
            ..draft()
        });
        assert!(negative.has_error_for("stock"));
        assert!(negative.has_error_for("min_stock"));

        let huge = validate_product(&ProductDraft {
            stock: 20_000,
            ..draft()
        });
        assert!(huge.is_valid);
        assert!(huge.has_warning_for("stock"));
    }

    #[test]
    fn serialized_products_need_a_tracking_type() {
        let missing = validate_product(&ProductDraft {
            has_imei_serial: true,
            ..draft()
        });
        assert!(missing.has_error_for("imei_serial_type"));

        let present = validate_product(&ProductDraft {
            has_imei_serial: true,
            imei_serial_type: Some(ImeiSerialType::Imei),
            ..draft()
        });
        assert!(present.is_valid);
    }
}
