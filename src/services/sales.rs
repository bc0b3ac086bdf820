use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::{
    error::{AppError, Result},
    models::{CashMovement, MovementType, Product, SaleItemRequest, SaleLine},
    services::validation::{MAX_AMOUNT, amount_fits},
};

fn amount_too_large() -> AppError {
    AppError::BadRequest(format!(
        "El importe debe tener como máximo 2 decimales y no superar {}",
        MAX_AMOUNT
    ))
}

/// Resolves requested items against the locked product rows.
///
/// Serialized products are sold one unit per line and must name the unit;
/// the summed quantity per product may not exceed its stock.
pub fn build_sale_lines(items: &[SaleItemRequest], products: &[Product]) -> Result<Vec<SaleLine>> {
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "La venta debe tener al menos un producto".to_string(),
        ));
    }

    let by_id: HashMap<i32, &Product> = products.iter().map(|p| (p.id, p)).collect();
    let mut requested: HashMap<i32, i32> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let product = by_id
            .get(&item.product_id)
            .ok_or_else(|| AppError::NotFound(format!("Producto {} no encontrado", item.product_id)))?;

        if item.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "Cantidad inválida para '{}'",
                product.name
            )));
        }

        if product.has_imei_serial && (item.imei_serial_id.is_none() || item.quantity != 1) {
            return Err(AppError::BadRequest(format!(
                "'{}' requiere indicar el IMEI/serie de cada unidad vendida",
                product.name
            )));
        }

        let unit_price = item.unit_price.unwrap_or(product.sale_price);
        if unit_price < Decimal::ZERO {
            return Err(AppError::BadRequest("El precio no puede ser negativo".to_string()));
        }
        if !amount_fits(unit_price) {
            return Err(amount_too_large());
        }

        let subtotal = unit_price
            .checked_mul(Decimal::from(item.quantity))
            .filter(|subtotal| amount_fits(*subtotal))
            .ok_or_else(amount_too_large)?;

        let requested_quantity = requested.entry(product.id).or_insert(0);
        *requested_quantity = requested_quantity.saturating_add(item.quantity);

        lines.push(SaleLine {
            product_id: product.id,
            imei_serial_id: item.imei_serial_id,
            quantity: item.quantity,
            unit_price,
            subtotal,
        });
    }

    for (product_id, quantity) in &requested {
        if let Some(product) = by_id.get(product_id).filter(|p| p.stock < *quantity) {
            return Err(AppError::Conflict(format!(
                "Stock insuficiente para '{}': disponible {}, solicitado {}",
                product.name, product.stock, quantity
            )));
        }
    }

    Ok(lines)
}

/// Returns `(subtotal, total)`; the discount may not push the total below zero.
pub fn sale_totals(lines: &[SaleLine], discount: Decimal) -> Result<(Decimal, Decimal)> {
    if discount < Decimal::ZERO {
        return Err(AppError::BadRequest("El descuento no puede ser negativo".to_string()));
    }
    if !amount_fits(discount) {
        return Err(amount_too_large());
    }

    let subtotal = lines
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.subtotal))
        .filter(|subtotal| amount_fits(*subtotal))
        .ok_or_else(amount_too_large)?;

    if discount > subtotal {
        return Err(AppError::BadRequest(
            "El descuento supera el total de la venta".to_string(),
        ));
    }

    Ok((subtotal, subtotal - discount))
}

/// Cash that should be in the drawer: opening plus income and sales, minus expenses.
pub fn expected_cash(opening_amount: Decimal, movements: &[CashMovement]) -> Decimal {
    movements
        .iter()
        .fold(opening_amount, |acc, movement| match movement.movement_type {
            MovementType::Income | MovementType::Sale => acc.saturating_add(movement.amount),
            MovementType::Expense => acc.saturating_sub(movement.amount),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImeiSerialType;
    use crate::services::demo_data::sample_product;
    use chrono::Utc;
    use rust_decimal::dec;

    fn item(product_id: i32, quantity: i32) -> SaleItemRequest {
        SaleItemRequest {
            product_id,
            quantity,
            unit_price: None,
            imei_serial_id: None,
        }
    }

    fn movement(movement_type: MovementType, amount: Decimal) -> CashMovement {
        CashMovement {
            id: 1,
            cash_register_id: 1,
            movement_type,
            amount,
            description: None,
            sale_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn lines_use_catalog_price_unless_overridden() {
        let products = vec![
            sample_product(1, "Funda", None, dec!(3), dec!(15), 10, 2),
            sample_product(2, "Cable", None, dec!(2), dec!(8), 10, 2),
        ];
        let mut discounted = item(2, 3);
        discounted.unit_price = Some(dec!(7));

        let lines = build_sale_lines(&[item(1, 2), discounted], &products).unwrap();

        assert_eq!(lines[0].subtotal, dec!(30));
        assert_eq!(lines[1].subtotal, dec!(21));
        assert_eq!(sale_totals(&lines, dec!(1)).unwrap(), (dec!(51), dec!(50)));
    }

    #[test]
    fn stock_is_checked_across_lines() {
        let products = vec![sample_product(1, "Funda", None, dec!(3), dec!(15), 3, 1)];

        let result = build_sale_lines(&[item(1, 2), item(1, 2)], &products);

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn serialized_products_need_a_unit() {
        let mut phone = sample_product(1, "iPhone 15", None, dec!(700), dec!(999), 3, 1);
        phone.has_imei_serial = true;
        phone.imei_serial_type = Some(ImeiSerialType::Imei);

        let missing = build_sale_lines(&[item(1, 1)], std::slice::from_ref(&phone));
        assert!(matches!(missing, Err(AppError::BadRequest(_))));

        let mut with_unit = item(1, 1);
        with_unit.imei_serial_id = Some(9);
        assert!(build_sale_lines(&[with_unit], &[phone]).is_ok());
    }

    #[test]
    fn unknown_product_and_empty_sale_fail() {
        assert!(matches!(build_sale_lines(&[item(5, 1)], &[]), Err(AppError::NotFound(_))));
        assert!(matches!(build_sale_lines(&[], &[]), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        let products = vec![sample_product(1, "Funda", None, dec!(3), dec!(15), 10, 2)];
        let lines = build_sale_lines(&[item(1, 1)], &products).unwrap();

        assert!(sale_totals(&lines, dec!(16)).is_err());
        assert!(sale_totals(&lines, dec!(-1)).is_err());
        assert_eq!(sale_totals(&lines, dec!(15)).unwrap().1, Decimal::ZERO);
    }

    #[test]
    fn oversized_prices_are_rejected_not_overflowed() {
        let products = vec![sample_product(1, "Funda", None, dec!(3), dec!(15), 10, 2)];

        let mut huge = item(1, 2);
        huge.unit_price = Some(Decimal::MAX);
        assert!(matches!(
            build_sale_lines(&[huge], &products),
            Err(AppError::BadRequest(_))
        ));

        let mut fractional = item(1, 1);
        fractional.unit_price = Some(dec!(1.005));
        assert!(build_sale_lines(&[fractional], &products).is_err());

        let mut at_limit = item(1, 2);
        at_limit.unit_price = Some(MAX_AMOUNT);
        assert!(matches!(
            build_sale_lines(&[at_limit], &products),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn subtotal_and_discount_must_fit_money_columns() {
        let line = SaleLine {
            product_id: 1,
            imei_serial_id: None,
            quantity: 1,
            unit_price: MAX_AMOUNT,
            subtotal: MAX_AMOUNT,
        };

        assert!(sale_totals(&[line.clone(), line.clone()], Decimal::ZERO).is_err());
        assert!(sale_totals(std::slice::from_ref(&line), Decimal::MAX).is_err());
        assert_eq!(
            sale_totals(&[line], dec!(0.99)).unwrap(),
            (MAX_AMOUNT, dec!(9999999999.00))
        );
    }

    #[test]
    fn expected_cash_balances_movements() {
        let movements = vec![
            movement(MovementType::Sale, dec!(120)),
            movement(MovementType::Income, dec!(30)),
            movement(MovementType::Expense, dec!(45.50)),
        ];

        assert_eq!(expected_cash(dec!(100), &movements), dec!(204.50));
        assert_eq!(expected_cash(dec!(100), &[]), dec!(100));
    }
}
