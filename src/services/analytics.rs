use std::collections::HashMap;

use rust_decimal::{Decimal, dec};

use crate::models::{
    Category, CategoryValue, InventorySummary, MarginDistribution, Product, ReorderItem,
    ReorderReport, StockBuckets, StockStatus,
};

/// Sale-price tiers and the stock level each tier is replenished to.
const REORDER_TIERS: [(Decimal, i32); 3] = [(dec!(50), 20), (dec!(200), 10), (dec!(1000), 5)];
const REORDER_TARGET_PREMIUM: i32 = 2;

/// Markup over purchase price, in percent. Zero when there is no cost to divide by;
/// saturates at the `Decimal` bounds instead of overflowing.
pub fn calculate_profit_margin(purchase_price: Decimal, sale_price: Decimal) -> Decimal {
    if purchase_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let clamped = || {
        if sale_price >= purchase_price {
            Decimal::MAX
        } else {
            Decimal::MIN
        }
    };

    sale_price
        .checked_sub(purchase_price)
        .and_then(|gain| gain.checked_div(purchase_price))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|margin| margin.round_dp(2))
        .unwrap_or_else(clamped)
}

pub fn get_stock_status_color(stock: i32, min_stock: i32) -> &'static str {
    StockStatus::of(stock, min_stock).color()
}

pub fn get_stock_status_label(stock: i32, min_stock: i32) -> &'static str {
    StockStatus::of(stock, min_stock).label()
}

pub fn inventory_summary(products: &[Product], categories: &[Category]) -> InventorySummary {
    let names: HashMap<i32, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut total_units = 0i64;
    let mut inventory_value = Decimal::ZERO;
    let mut retail_value = Decimal::ZERO;
    let mut margin_sum = Decimal::ZERO;
    let mut stock = StockBuckets::default();
    let mut margins = MarginDistribution::default();
    let mut by_category: HashMap<Option<i32>, CategoryValue> = HashMap::new();

    for product in products {
        let units = Decimal::from(product.stock.max(0));
        let cost = product.purchase_price.saturating_mul(units);

        total_units += i64::from(product.stock.max(0));
        inventory_value = inventory_value.saturating_add(cost);
        retail_value = retail_value.saturating_add(product.sale_price.saturating_mul(units));

        match StockStatus::of(product.stock, product.min_stock) {
            StockStatus::OutOfStock => stock.out_of_stock += 1,
            StockStatus::Low => stock.low += 1,
            StockStatus::InStock => stock.in_stock += 1,
        }

        let margin = calculate_profit_margin(product.purchase_price, product.sale_price);
        margin_sum = margin_sum.saturating_add(margin);
        if margin < Decimal::ZERO {
            margins.negative += 1;
        } else if margin < dec!(10) {
            margins.up_to_10 += 1;
        } else if margin < dec!(25) {
            margins.up_to_25 += 1;
        } else if margin < dec!(50) {
            margins.up_to_50 += 1;
        } else {
            margins.above_50 += 1;
        }

        let entry = by_category
            .entry(product.category_id)
            .or_insert_with(|| CategoryValue {
                category_id: product.category_id,
                category_name: product
                    .category_id
                    .and_then(|id| names.get(&id).copied())
                    .unwrap_or("Sin categoría")
                    .to_string(),
                product_count: 0,
                units: 0,
                inventory_value: Decimal::ZERO,
            });
        entry.product_count += 1;
        entry.units += i64::from(product.stock.max(0));
        entry.inventory_value = entry.inventory_value.saturating_add(cost);
    }

    let average_margin = if products.is_empty() {
        Decimal::ZERO
    } else {
        (margin_sum / Decimal::from(products.len())).round_dp(2)
    };

    let mut by_category: Vec<CategoryValue> = by_category.into_values().collect();
    by_category.sort_by(|a, b| {
        b.inventory_value
            .cmp(&a.inventory_value)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });

    InventorySummary {
        total_products: products.len(),
        total_units,
        inventory_value,
        retail_value,
        potential_profit: retail_value.saturating_sub(inventory_value),
        average_margin,
        stock,
        margins,
        by_category,
    }
}

fn reorder_target(sale_price: Decimal) -> i32 {
    REORDER_TIERS
        .iter()
        .find(|(ceiling, _)| sale_price < *ceiling)
        .map(|(_, target)| *target)
        .unwrap_or(REORDER_TARGET_PREMIUM)
}

pub fn reorder_list(products: &[Product]) -> ReorderReport {
    let mut items: Vec<ReorderItem> = products
        .iter()
        .filter_map(|product| {
            let status = StockStatus::of(product.stock, product.min_stock);
            if !status.needs_reorder() {
                return None;
            }

            let suggested_quantity = (reorder_target(product.sale_price) - product.stock).max(1);

            Some(ReorderItem {
                product_id: product.id,
                name: product.name.clone(),
                stock: product.stock,
                min_stock: product.min_stock,
                status,
                suggested_quantity,
                estimated_cost: product
                    .purchase_price
                    .saturating_mul(Decimal::from(suggested_quantity)),
            })
        })
        .collect();

    items.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));

    let total_estimated_cost = items
        .iter()
        .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.estimated_cost));

    ReorderReport {
        items,
        total_estimated_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::demo_data::sample_product;
    use rstest::rstest;

    #[test]
    fn margin_is_zero_without_purchase_price() {
        assert_eq!(calculate_profit_margin(Decimal::ZERO, dec!(100)), Decimal::ZERO);
        assert_eq!(calculate_profit_margin(dec!(-5), dec!(100)), Decimal::ZERO);
    }

    #[rstest]
    #[case(dec!(100), dec!(150), dec!(50))]
    #[case(dec!(80), dec!(100), dec!(25))]
    #[case(dec!(100), dec!(90), dec!(-10))]
    #[case(dec!(3), dec!(4), dec!(33.33))]
    fn margin_is_relative_to_cost(
        #[case] purchase: Decimal,
        #[case] sale: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(calculate_profit_margin(purchase, sale), expected);
    }

    #[test]
    fn margin_saturates_instead_of_overflowing() {
        assert_eq!(calculate_profit_margin(dec!(0.01), Decimal::MAX), Decimal::MAX);
        assert_eq!(calculate_profit_margin(dec!(0.01), Decimal::MIN), Decimal::MIN);
    }

    #[test]
    fn summary_saturates_on_huge_values() {
        let products = vec![
            sample_product(1, "Lingote", None, Decimal::MAX, Decimal::MAX, i32::MAX, 0),
            sample_product(2, "Lingote 2", None, Decimal::MAX, Decimal::MAX, 5, 0),
        ];

        let summary = inventory_summary(&products, &[]);
        assert_eq!(summary.inventory_value, Decimal::MAX);
        assert_eq!(summary.retail_value, Decimal::MAX);

        let empty = sample_product(3, "Lingote", None, Decimal::MAX, Decimal::MAX, 0, 1);
        let report = reorder_list(&[empty]);
        assert_eq!(report.total_estimated_cost, Decimal::MAX);
    }

    #[rstest]
    #[case(0, 5, "Sin stock", "red")]
    #[case(-2, 5, "Sin stock", "red")]
    #[case(3, 5, "Stock bajo", "yellow")]
    #[case(5, 5, "Stock bajo", "yellow")]
    #[case(6, 5, "En stock", "green")]
    fn stock_status_label_and_color(
        #[case] stock: i32,
        #[case] min_stock: i32,
        #[case] label: &str,
        #[case] color: &str,
    ) {
        assert_eq!(get_stock_status_label(stock, min_stock), label);
        assert_eq!(get_stock_status_color(stock, min_stock), color);
    }

    #[test]
    fn summary_aggregates_value_and_buckets() {
        let products = vec![
            sample_product(1, "iPhone 15", Some(1), dec!(800), dec!(1000), 4, 2),
            sample_product(2, "Funda silicona", Some(2), dec!(2), dec!(10), 0, 5),
            sample_product(3, "Cargador USB-C", Some(2), dec!(10), dec!(9), 3, 5),
        ];

        let summary = inventory_summary(&products, &[]);

        assert_eq!(summary.total_products, 3);
        assert_eq!(summary.total_units, 7);
        assert_eq!(summary.inventory_value, dec!(3230));
        assert_eq!(summary.retail_value, dec!(4027));
        assert_eq!(summary.potential_profit, dec!(797));
        assert_eq!(
            summary.stock,
            StockBuckets {
                out_of_stock: 1,
                low: 1,
                in_stock: 1
            }
        );
        assert_eq!(summary.margins.negative, 1);
        assert_eq!(summary.margins.up_to_50, 1);
        assert_eq!(summary.margins.above_50, 1);
        assert_eq!(summary.by_category.first().map(|c| c.category_id), Some(Some(1)));
    }

    #[test]
    fn summary_of_nothing_is_zero() {
        let summary = inventory_summary(&[], &[]);
        assert_eq!(summary.total_products, 0);
        assert_eq!(summary.average_margin, Decimal::ZERO);
        assert!(summary.by_category.is_empty());
    }

    #[rstest]
    #[case(dec!(10), 20)]
    #[case(dec!(50), 10)]
    #[case(dec!(199.99), 10)]
    #[case(dec!(999), 5)]
    #[case(dec!(1500), 2)]
    fn reorder_target_follows_price_tiers(#[case] price: Decimal, #[case] target: i32) {
        assert_eq!(reorder_target(price), target);
    }

    #[test]
    fn reorder_list_only_includes_low_and_empty_stock() {
        let products = vec![
            sample_product(1, "Laptop", None, dec!(900), dec!(1200), 1, 2),
            sample_product(2, "Mouse", None, dec!(5), dec!(15), 0, 3),
            sample_product(3, "Monitor", None, dec!(100), dec!(150), 20, 3),
        ];

        let report = reorder_list(&products);

        assert_eq!(report.items.len(), 2);
        let first = &report.items[0];
        assert_eq!(first.name, "Mouse");
        assert_eq!(first.suggested_quantity, 20);
        assert_eq!(first.estimated_cost, dec!(100));
        let second = &report.items[1];
        assert_eq!(second.suggested_quantity, 1);
        assert_eq!(report.total_estimated_cost, dec!(1000));
    }
}
