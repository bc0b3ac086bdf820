//! Keyword-driven category suggestion and per-category price insights.
//!
//! Everything here is deterministic: fixed keyword lists, substring matching
//! and plain descriptive statistics over the products already in a category.

use std::{cmp::Ordering, collections::HashMap};

use rust_decimal::{Decimal, dec, prelude::ToPrimitive};

use crate::models::{
    Category, CategorySuggestion, ClassificationAssignment, MarketInsights, Product,
    SuggestionSource,
};
use crate::services::analytics::calculate_profit_margin;

const MAX_SUGGESTIONS: usize = 5;
const KEYWORD_CONFIDENCE_CAP: f64 = 95.0;
const KEYWORD_CONFIDENCE_BASE: f64 = 20.0;
const SIMILAR_CONFIDENCE_CAP: f64 = 85.0;
const SIMILAR_CONFIDENCE_BASE: f64 = 30.0;
const SIMILAR_CONFIDENCE_STEP: f64 = 10.0;
const GENERIC_CONFIDENCE: f64 = 15.0;
const MIN_WORD_LEN: usize = 3;

const HIGH_DISPERSION: f64 = 0.5;
const LOW_DISPERSION: f64 = 0.15;
const LOW_MARGIN: Decimal = dec!(15);
const PRICE_POSITION_BAND: Decimal = dec!(20);

pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Smartphones",
        &[
            "iphone", "galaxy", "xiaomi", "redmi", "motorola", "huawei", "celular",
            "smartphone", "teléfono", "telefono", "pixel", "oneplus", "honor",
        ],
    ),
    ("Tablets", &["ipad", "tablet", "galaxy tab", "kindle", "lenovo tab"]),
    (
        "Laptops",
        &["laptop", "notebook", "macbook", "portátil", "portatil", "chromebook", "thinkpad"],
    ),
    (
        "Accesorios",
        &[
            "funda", "case", "cargador", "cable", "protector", "mica", "soporte", "adaptador",
            "power bank", "vidrio templado",
        ],
    ),
    (
        "Audio",
        &[
            "audífonos", "audifonos", "auriculares", "airpods", "parlante", "bocina", "speaker",
            "headphones", "earbuds", "buds",
        ],
    ),
    (
        "Smartwatches",
        &["smartwatch", "apple watch", "reloj", "smartband", "galaxy watch", "mi band"],
    ),
    (
        "Computación",
        &[
            "teclado", "mouse", "monitor", "impresora", "disco", "ssd", "memoria", "usb",
            "router", "webcam",
        ],
    ),
    (
        "Gaming",
        &["playstation", "ps5", "xbox", "nintendo", "consola", "joystick", "gamer", "mando"],
    ),
    ("Cámaras", &["cámara", "camara", "gopro", "lente", "drone", "trípode", "tripode"]),
];

/// Ranked category suggestions for a product that is being created.
///
/// Keyword matches win; when no dictionary entry matches, products with
/// similar names vote for their categories; as a last resort the first word of
/// the name is offered as a new category.
pub fn suggest_categories(
    name: &str,
    description: Option<&str>,
    categories: &[Category],
    products: &[Product],
) -> Vec<CategorySuggestion> {
    let name = name.trim();
    if name.is_empty() {
        return Vec::new();
    }

    let text = format!("{} {}", name, description.unwrap_or_default()).to_lowercase();

    let mut suggestions = keyword_suggestions(&text, categories);

    if suggestions.is_empty() {
        suggestions = similar_product_suggestions(name, categories, products);
    }

    if suggestions.is_empty() {
        suggestions.extend(generic_suggestion(name, categories));
    }

    suggestions.sort_by(by_confidence);
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Highest confidence first; ties ordered by name so the ranking is stable.
fn by_confidence(a: &CategorySuggestion, b: &CategorySuggestion) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.suggested_name.cmp(&b.suggested_name))
}

fn find_category<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
    categories
        .iter()
        .find(|c| c.name.trim().to_lowercase() == name.to_lowercase())
}

fn keyword_suggestions(text: &str, categories: &[Category]) -> Vec<CategorySuggestion> {
    CATEGORY_KEYWORDS
        .iter()
        .filter_map(|(category, keywords)| {
            let matched: Vec<String> = keywords
                .iter()
                .filter(|keyword| text.contains(**keyword))
                .map(|keyword| keyword.to_string())
                .collect();

            if matched.is_empty() {
                return None;
            }

            let ratio = matched.len() as f64 / keywords.len() as f64;
            let confidence = (ratio * 100.0 + KEYWORD_CONFIDENCE_BASE).min(KEYWORD_CONFIDENCE_CAP);

            Some(CategorySuggestion {
                suggested_name: category.to_string(),
                confidence: round1(confidence),
                reason: format!("Palabras clave detectadas: {}", matched.join(", ")),
                source: SuggestionSource::Keywords,
                existing_category_id: find_category(categories, category).map(|c| c.id),
                matched_keywords: matched,
            })
        })
        .collect()
}

fn significant_words(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= MIN_WORD_LEN)
        .map(str::to_string)
        .collect()
}

fn similar_product_suggestions(
    name: &str,
    categories: &[Category],
    products: &[Product],
) -> Vec<CategorySuggestion> {
    let words = significant_words(name);
    if words.is_empty() {
        return Vec::new();
    }

    let mut hits: HashMap<i32, Vec<&str>> = HashMap::new();
    for product in products {
        let Some(category_id) = product.category_id else {
            continue;
        };
        let product_name = product.name.to_lowercase();
        if words.iter().any(|word| product_name.contains(word.as_str())) {
            hits.entry(category_id).or_default().push(product.name.as_str());
        }
    }

    hits.into_iter()
        .filter_map(|(category_id, similar)| {
            let category = categories.iter().find(|c| c.id == category_id)?;
            let confidence = (SIMILAR_CONFIDENCE_BASE
                + SIMILAR_CONFIDENCE_STEP * similar.len() as f64)
                .min(SIMILAR_CONFIDENCE_CAP);
            let examples: Vec<&str> = similar.iter().take(3).copied().collect();

            Some(CategorySuggestion {
                suggested_name: category.name.clone(),
                confidence,
                reason: format!("Productos similares: {}", examples.join(", ")),
                source: SuggestionSource::SimilarProducts,
                existing_category_id: Some(category.id),
                matched_keywords: Vec::new(),
            })
        })
        .collect()
}

fn generic_suggestion(name: &str, categories: &[Category]) -> Option<CategorySuggestion> {
    let first = name.split_whitespace().next()?;
    let mut chars = first.chars();
    let suggested_name: String = match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => return None,
    };

    Some(CategorySuggestion {
        existing_category_id: find_category(categories, &suggested_name).map(|c| c.id),
        suggested_name,
        confidence: GENERIC_CONFIDENCE,
        reason: "Sugerencia genérica basada en el nombre del producto".to_string(),
        source: SuggestionSource::Generic,
        matched_keywords: Vec::new(),
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Price statistics and readable observations for one category.
pub fn generate_market_insights(
    category: &Category,
    products: &[Product],
    candidate_price: Option<Decimal>,
) -> MarketInsights {
    let in_category: Vec<&Product> = products
        .iter()
        .filter(|p| p.category_id == Some(category.id))
        .collect();

    if in_category.is_empty() {
        return MarketInsights {
            category_id: category.id,
            category_name: category.name.clone(),
            product_count: 0,
            average_price: Decimal::ZERO,
            min_price: Decimal::ZERO,
            max_price: Decimal::ZERO,
            price_std_dev: 0.0,
            average_margin: Decimal::ZERO,
            insights: vec![format!(
                "Aún no hay productos en {} para generar estadísticas",
                category.name
            )],
        };
    }

    let count = Decimal::from(in_category.len());
    let total = in_category
        .iter()
        .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.sale_price));
    let average_price = (total / count).round_dp(2);
    let min_price = in_category.iter().map(|p| p.sale_price).min().unwrap_or_default();
    let max_price = in_category.iter().map(|p| p.sale_price).max().unwrap_or_default();
    let average_margin = (in_category.iter().fold(Decimal::ZERO, |acc, p| {
        acc.saturating_add(calculate_profit_margin(p.purchase_price, p.sale_price))
    }) / count)
        .round_dp(2);

    let mean = average_price.to_f64().unwrap_or(0.0);
    let variance = in_category
        .iter()
        .map(|p| {
            let delta = p.sale_price.to_f64().unwrap_or(0.0) - mean;
            delta * delta
        })
        .sum::<f64>()
        / in_category.len() as f64;
    let price_std_dev = round1(variance.sqrt());

    let mut insights = vec![format!(
        "Precio promedio en {}: {} ({} productos)",
        category.name,
        average_price,
        in_category.len()
    )];

    if mean > 0.0 {
        let variation = price_std_dev / mean;
        if variation > HIGH_DISPERSION {
            insights.push(format!(
                "Alta dispersión de precios: entre {} y {}",
                min_price, max_price
            ));
        } else if variation < LOW_DISPERSION {
            insights.push("Precios homogéneos en la categoría".to_string());
        }
    }

    insights.push(format!("Margen promedio: {}%", average_margin));
    if average_margin < LOW_MARGIN {
        insights.push("Margen bajo: revise costos o precios de venta".to_string());
    }

    let deviation = candidate_price
        .filter(|_| average_price > Decimal::ZERO)
        .map(|price| {
            price
                .checked_sub(average_price)
                .and_then(|delta| delta.checked_div(average_price))
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(|deviation| deviation.round_dp(1))
                .unwrap_or(if price > average_price { Decimal::MAX } else { Decimal::MIN })
        });

    if let Some(deviation) = deviation {
        if deviation > PRICE_POSITION_BAND {
            insights.push(format!(
                "El precio propuesto está {}% por encima del promedio",
                deviation
            ));
        } else if deviation < -PRICE_POSITION_BAND {
            insights.push(format!(
                "El precio propuesto está {}% por debajo del promedio",
                deviation.abs()
            ));
        } else {
            insights.push("El precio propuesto está dentro del rango habitual".to_string());
        }
    }

    MarketInsights {
        category_id: category.id,
        category_name: category.name.clone(),
        product_count: in_category.len(),
        average_price,
        min_price,
        max_price,
        price_std_dev,
        average_margin,
        insights,
    }
}

/// Picks a category for every uncategorised product whose best keyword
/// suggestion maps onto an existing category with enough confidence.
pub fn auto_classify(
    products: &[Product],
    categories: &[Category],
    threshold: f64,
) -> Vec<ClassificationAssignment> {
    products
        .iter()
        .filter(|p| p.category_id.is_none())
        .filter_map(|product| {
            let text = format!(
                "{} {}",
                product.name,
                product.description.as_deref().unwrap_or_default()
            )
            .to_lowercase();

            let mut candidates = keyword_suggestions(&text, categories);
            candidates.sort_by(by_confidence);

            let best = candidates
                .into_iter()
                .find(|s| s.existing_category_id.is_some() && s.confidence >= threshold)?;
            let category_id = best.existing_category_id?;

            Some(ClassificationAssignment {
                product_id: product.id,
                product_name: product.name.clone(),
                category_id,
                category_name: best.suggested_name,
                confidence: best.confidence,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::demo_data::{sample_category, sample_product};

    fn categories() -> Vec<Category> {
        vec![
            sample_category(1, "Smartphones"),
            sample_category(2, "Accesorios"),
            sample_category(3, "Repuestos"),
        ]
    }

    #[test]
    fn iphone_is_suggested_as_smartphone() {
        let suggestions = suggest_categories("iPhone 15 Pro 256GB", None, &categories(), &[]);

        let first = suggestions.first().expect("at least one suggestion");
        assert_eq!(first.suggested_name, "Smartphones");
        assert!(first.confidence > 20.0);
        assert_eq!(first.existing_category_id, Some(1));
        assert_eq!(first.source, SuggestionSource::Keywords);
        assert_eq!(first.matched_keywords, vec!["iphone".to_string()]);
    }

    #[test]
    fn keyword_confidence_is_capped() {
        let text = "iphone galaxy xiaomi redmi motorola huawei celular smartphone telefono pixel oneplus honor";
        let suggestions = suggest_categories(text, None, &categories(), &[]);

        assert_eq!(suggestions[0].confidence, 95.0);
    }

    #[test]
    fn description_contributes_keywords() {
        let suggestions = suggest_categories(
            "Modelo X200",
            Some("Funda con protector de cámara"),
            &categories(),
            &[],
        );

        assert!(suggestions.iter().any(|s| s.suggested_name == "Accesorios"));
        assert!(suggestions.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn falls_back_to_similar_products() {
        let products = vec![
            sample_product(1, "Pantalla Moto G8", Some(3), dec!(20), dec!(45), 2, 1),
            sample_product(2, "Pantalla Moto G9", Some(3), dec!(22), dec!(50), 1, 1),
            sample_product(3, "Pantalla", None, dec!(22), dec!(50), 1, 1),
        ];

        let suggestions = suggest_categories("Pantalla G10", None, &categories(), &products);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].suggested_name, "Repuestos");
        assert_eq!(suggestions[0].source, SuggestionSource::SimilarProducts);
        assert_eq!(suggestions[0].confidence, 50.0);
    }

    #[test]
    fn falls_back_to_first_word() {
        let suggestions = suggest_categories("bicicleta rodado 29", None, &categories(), &[]);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].suggested_name, "Bicicleta");
        assert_eq!(suggestions[0].source, SuggestionSource::Generic);
        assert_eq!(suggestions[0].existing_category_id, None);
    }

    #[test]
    fn blank_name_yields_nothing() {
        assert!(suggest_categories("   ", Some("iphone"), &categories(), &[]).is_empty());
    }

    #[test]
    fn insights_describe_category_prices() {
        let category = sample_category(1, "Smartphones");
        let products = vec![
            sample_product(1, "A", Some(1), dec!(100), dec!(200), 1, 0),
            sample_product(2, "B", Some(1), dec!(100), dec!(200), 1, 0),
            sample_product(3, "C", Some(2), dec!(1), dec!(5000), 1, 0),
        ];

        let insights = generate_market_insights(&category, &products, Some(dec!(300)));

        assert_eq!(insights.product_count, 2);
        assert_eq!(insights.average_price, dec!(200));
        assert_eq!(insights.price_std_dev, 0.0);
        assert_eq!(insights.average_margin, dec!(100));
        assert!(insights.insights.iter().any(|i| i.contains("homogéneos")));
        assert!(insights.insights.iter().any(|i| i.contains("por encima")));
    }

    #[test]
    fn insights_survive_extreme_prices() {
        let category = sample_category(1, "Smartphones");
        let products = vec![
            sample_product(1, "A", Some(1), dec!(0.01), Decimal::MAX, 1, 0),
            sample_product(2, "B", Some(1), dec!(0.01), Decimal::MAX, 1, 0),
        ];

        let insights = generate_market_insights(&category, &products, Some(Decimal::MIN));

        assert_eq!(insights.product_count, 2);
        assert!(insights.insights.iter().any(|i| i.contains("por debajo")));
    }

    #[test]
    fn tied_suggestions_are_ordered_by_name() {
        let categories = vec![
            sample_category(1, "Zapatillas"),
            sample_category(2, "Audio"),
            sample_category(3, "Mochilas"),
        ];
        let products = vec![
            sample_product(1, "Negro clásico", Some(1), dec!(1), dec!(2), 1, 0),
            sample_product(2, "Negro mate", Some(2), dec!(1), dec!(2), 1, 0),
            sample_product(3, "Negro urbano", Some(3), dec!(1), dec!(2), 1, 0),
        ];

        for _ in 0..10 {
            let names: Vec<String> = suggest_categories("Negro", None, &categories, &products)
                .into_iter()
                .map(|s| s.suggested_name)
                .collect();
            assert_eq!(names, vec!["Audio", "Mochilas", "Zapatillas"]);
        }
    }

    #[test]
    fn insights_for_empty_category() {
        let category = sample_category(9, "Drones");
        let insights = generate_market_insights(&category, &[], None);

        assert_eq!(insights.product_count, 0);
        assert_eq!(insights.insights.len(), 1);
    }

    #[test]
    fn auto_classify_respects_threshold_and_existing_categories() {
        let products = vec![
            sample_product(1, "iPhone 13 celular", None, dec!(1), dec!(2), 1, 0),
            sample_product(2, "Funda", None, dec!(1), dec!(2), 1, 0),
            sample_product(3, "Galaxy S24", Some(1), dec!(1), dec!(2), 1, 0),
        ];

        let assignments = auto_classify(&products, &categories(), 32.0);

        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].product_id, 1);
        assert_eq!(assignments[0].category_id, 1);
    }
}
