use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{
    error::{AppError, Result},
    models::{
        Category, ImportRowError, ParsedImport, Product, ProductDraft, ProductImportRow,
    },
    services::audit::csv_error,
};

/// Accepted header spellings for each import column.
const COLUMN_ALIASES: &[(&str, &[&str])] = &[
    ("name", &["name", "nombre", "producto"]),
    ("description", &["description", "descripcion", "descripción"]),
    ("barcode", &["barcode", "codigo", "código", "codigo_barras", "sku"]),
    ("category", &["category", "categoria", "categoría"]),
    ("supplier_id", &["supplier_id", "proveedor_id"]),
    ("purchase_price", &["purchase_price", "precio_compra", "costo"]),
    ("sale_price", &["sale_price", "precio_venta", "precio", "price"]),
    ("stock", &["stock", "cantidad"]),
    ("min_stock", &["min_stock", "stock_minimo", "stock_mínimo"]),
];

fn canonical_column(header: &str) -> Option<&'static str> {
    COLUMN_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&header))
        .map(|(column, _)| *column)
}

/// Reads a CSV export into product rows.
///
/// The first record is the header. Records with fewer fields than the header
/// are skipped and counted; fields that fail to parse mark the row as errored.
pub fn parse_csv(content: &str) -> Result<ParsedImport> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(csv_error)?,
        None => return Ok(ParsedImport::default()),
    };

    let columns: HashMap<&'static str, usize> = header
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| canonical_column(&name.to_lowercase()).map(|c| (c, idx)))
        .collect();

    if !columns.contains_key("name") {
        return Err(AppError::BadRequest(
            "El archivo debe incluir una columna 'name' o 'nombre'".to_string(),
        ));
    }

    let mut parsed = ParsedImport::default();

    for (idx, record) in records.enumerate() {
        let row_number = idx + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                parsed.errors.push(ImportRowError {
                    row: row_number,
                    message: e.to_string(),
                });
                continue;
            }
        };

        if record.len() < header.len() {
            parsed.skipped_short_rows += 1;
            continue;
        }

        let field = |column: &str| -> Option<&str> {
            columns
                .get(column)
                .and_then(|idx| record.get(*idx))
                .filter(|value| !value.is_empty())
        };

        match row_from_fields(field) {
            Ok(row) => parsed.rows.push((row_number, row)),
            Err(message) => parsed.errors.push(ImportRowError {
                row: row_number,
                message,
            }),
        }
    }

    Ok(parsed)
}

fn row_from_fields<'a>(
    field: impl Fn(&str) -> Option<&'a str>,
) -> std::result::Result<ProductImportRow, String> {
    let name = field("name")
        .ok_or_else(|| "Falta el nombre del producto".to_string())?
        .to_string();

    Ok(ProductImportRow {
        name,
        description: field("description").map(str::to_string),
        barcode: field("barcode").map(str::to_string),
        category: field("category").map(str::to_string),
        supplier_id: parse_number(field("supplier_id"), "supplier_id")?,
        purchase_price: parse_decimal(field("purchase_price"), "purchase_price")?,
        sale_price: parse_decimal(field("sale_price"), "sale_price")?,
        stock: parse_number(field("stock"), "stock")?.unwrap_or(0),
        min_stock: parse_number(field("min_stock"), "min_stock")?.unwrap_or(0),
    })
}

fn parse_decimal(value: Option<&str>, column: &str) -> std::result::Result<Decimal, String> {
    let Some(raw) = value else {
        return Ok(Decimal::ZERO);
    };

    let cleaned = raw.trim_start_matches('$').trim();
    let normalized = if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned.replace(',', ".")
    } else {
        cleaned.replace(',', "")
    };

    Decimal::from_str(&normalized).map_err(|_| format!("Valor inválido en {}: '{}'", column, raw))
}

fn parse_number(value: Option<&str>, column: &str) -> std::result::Result<Option<i32>, String> {
    value
        .map(|raw| {
            raw.parse::<i32>()
                .map_err(|_| format!("Valor inválido en {}: '{}'", column, raw))
        })
        .transpose()
}

/// Reads a JSON array of product objects.
pub fn parse_json(content: &str) -> Result<ParsedImport> {
    let values: Vec<serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| AppError::BadRequest(format!("JSON inválido: {}", e)))?;

    let mut parsed = ParsedImport::default();

    for (idx, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<ProductImportRow>(value) {
            Ok(row) if row.name.trim().is_empty() => parsed.errors.push(ImportRowError {
                row: idx + 1,
                message: "Falta el nombre del producto".to_string(),
            }),
            Ok(row) => parsed.rows.push((idx + 1, row)),
            Err(e) => parsed.errors.push(ImportRowError {
                row: idx + 1,
                message: e.to_string(),
            }),
        }
    }

    Ok(parsed)
}

impl ProductImportRow {
    pub fn to_draft(&self, category_id: Option<i32>) -> ProductDraft {
        ProductDraft {
            name: self.name.trim().to_string(),
            description: self.description.clone().filter(|d| !d.trim().is_empty()),
            barcode: self.barcode.clone().filter(|b| !b.trim().is_empty()),
            category_id,
            supplier_id: self.supplier_id,
            purchase_price: self.purchase_price,
            sale_price: self.sale_price,
            stock: self.stock,
            min_stock: self.min_stock,
            has_imei_serial: false,
            imei_serial_type: None,
            import_batch_id: None,
        }
    }
}

pub fn products_to_csv(products: &[Product], categories: &[Category]) -> Result<String> {
    let names: HashMap<i32, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record([
            "id",
            "name",
            "description",
            "barcode",
            "category",
            "supplier_id",
            "purchase_price",
            "sale_price",
            "stock",
            "min_stock",
        ])
        .map_err(csv_error)?;

    for product in products {
        writer
            .write_record([
                product.id.to_string(),
                product.name.clone(),
                product.description.clone().unwrap_or_default(),
                product.barcode.clone().unwrap_or_default(),
                product
                    .category_id
                    .and_then(|id| names.get(&id))
                    .map(|name| name.to_string())
                    .unwrap_or_default(),
                product.supplier_id.map(|id| id.to_string()).unwrap_or_default(),
                product.purchase_price.to_string(),
                product.sale_price.to_string(),
                product.stock.to_string(),
                product.min_stock.to_string(),
            ])
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("CSV flush failed: {}", e)))?;

    String::from_utf8(bytes).map_err(|e| AppError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::demo_data::{sample_category, sample_product};
    use rust_decimal::dec;

    #[test]
    fn csv_rows_are_mapped_by_header() {
        let content = "Nombre,Precio_Venta,precio_compra,stock,categoria\n\
                       Funda iPhone 15,15.5,4,30,Accesorios\n\
                       Cargador 20W,\"25,90\",10,12,\n";

        let parsed = parse_csv(content).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        let (row_number, first) = &parsed.rows[0];
        assert_eq!(*row_number, 1);
        assert_eq!(first.name, "Funda iPhone 15");
        assert_eq!(first.sale_price, dec!(15.5));
        assert_eq!(first.stock, 30);
        assert_eq!(first.category.as_deref(), Some("Accesorios"));
        assert_eq!(parsed.rows[1].1.sale_price, dec!(25.90));
        assert_eq!(parsed.rows[1].1.category, None);
    }

    #[test]
    fn csv_rows_with_missing_columns_are_skipped() {
        let content = "name,sale_price,stock\nMouse,10,5\nTeclado,20\nMonitor,300,2\n";

        let parsed = parse_csv(content).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.skipped_short_rows, 1);
        assert_eq!(parsed.rows[1].1.name, "Monitor");
        assert_eq!(parsed.rows[1].0, 3);
    }

    #[test]
    fn csv_bad_numbers_are_reported_per_row() {
        let content = "name,sale_price,stock\nMouse,diez,5\n,10,1\n";

        let parsed = parse_csv(content).unwrap();

        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.errors[0].row, 1);
        assert!(parsed.errors[0].message.contains("sale_price"));
    }

    #[test]
    fn csv_without_name_column_is_rejected() {
        assert!(matches!(
            parse_csv("sku,price\nA1,10\n"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn empty_csv_is_empty() {
        let parsed = parse_csv("").unwrap();
        assert!(parsed.rows.is_empty());
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn json_rows_are_parsed_individually() {
        let content = r#"[
            {"name": "Galaxy S24", "sale_price": 999.99, "purchase_price": "800", "stock": 3},
            {"name": "Broken", "stock": "many"},
            {"name": "  "}
        ]"#;

        let parsed = parse_json(content).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].1.sale_price, dec!(999.99));
        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.errors[1].row, 3);
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        assert!(matches!(parse_json("{nope"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn export_writes_category_names() {
        let products = vec![sample_product(4, "Mouse", Some(2), dec!(5), dec!(12), 8, 2)];
        let categories = vec![sample_category(2, "Computación")];

        let csv = products_to_csv(&products, &categories).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "4,Mouse,,,Computación,,5,12,8,2");
    }
}
