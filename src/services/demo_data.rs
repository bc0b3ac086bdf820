//! In-memory catalog used when the service runs in demo mode.

use chrono::Utc;
use rust_decimal::{Decimal, dec};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, Result},
    models::{
        Category, CreateCategoryRequest, Product, ProductDraft, ProductQuery, SortBy, Supplier,
        UpdateCategoryRequest,
    },
};

pub fn sample_category(id: i32, name: &str) -> Category {
    let now = Utc::now();
    Category {
        id,
        name: name.to_string(),
        description: None,
        color: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_product(
    id: i32,
    name: &str,
    category_id: Option<i32>,
    purchase_price: Decimal,
    sale_price: Decimal,
    stock: i32,
    min_stock: i32,
) -> Product {
    let now = Utc::now();
    Product {
        id,
        name: name.to_string(),
        description: None,
        barcode: None,
        category_id,
        supplier_id: None,
        purchase_price,
        sale_price,
        stock,
        min_stock,
        has_imei_serial: false,
        imei_serial_type: None,
        import_batch_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn sample_supplier(id: i32, name: &str, contact: &str) -> Supplier {
    let now = Utc::now();
    Supplier {
        id,
        name: name.to_string(),
        contact_name: Some(contact.to_string()),
        email: None,
        phone: None,
        address: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Debug, Default)]
struct DemoData {
    products: Vec<Product>,
    categories: Vec<Category>,
    suppliers: Vec<Supplier>,
}

impl DemoData {
    fn next_product_id(&self) -> i32 {
        self.products.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    fn next_category_id(&self) -> i32 {
        self.categories.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }
}

#[derive(Debug, Default)]
pub struct DemoStore {
    data: RwLock<DemoData>,
}

impl DemoStore {
    pub fn seeded() -> Self {
        let categories = vec![
            sample_category(1, "Smartphones"),
            sample_category(2, "Accesorios"),
            sample_category(3, "Audio"),
            sample_category(4, "Computación"),
        ];

        let mut products = vec![
            sample_product(1, "iPhone 15 128GB", Some(1), dec!(780), dec!(999), 6, 2),
            sample_product(2, "Samsung Galaxy A54", Some(1), dec!(260), dec!(349), 2, 3),
            sample_product(3, "Xiaomi Redmi Note 13", Some(1), dec!(150), dec!(219), 0, 2),
            sample_product(4, "Funda silicona iPhone 15", Some(2), dec!(3), dec!(15), 40, 10),
            sample_product(5, "Cargador USB-C 20W", Some(2), dec!(8), dec!(25), 8, 10),
            sample_product(6, "AirPods Pro 2", Some(3), dec!(170), dec!(249), 3, 2),
            sample_product(7, "Mouse inalámbrico", Some(4), dec!(6), dec!(18), 15, 5),
            sample_product(8, "Protector de pantalla", None, dec!(1), dec!(9), 100, 20),
        ];

        for product in products.iter_mut().filter(|p| p.category_id == Some(1)) {
            product.has_imei_serial = true;
            product.imei_serial_type = Some(crate::models::ImeiSerialType::Imei);
        }
        if let Some(cable) = products.iter_mut().find(|p| p.id == 5) {
            cable.supplier_id = Some(1);
            cable.barcode = Some("7791234500012".to_string());
        }

        let suppliers = vec![
            sample_supplier(1, "Distribuidora Central", "Laura Gómez"),
            sample_supplier(2, "TecnoImport", "Martín Ruiz"),
        ];

        Self {
            data: RwLock::new(DemoData {
                products,
                categories,
                suppliers,
            }),
        }
    }

    pub async fn products(&self) -> Vec<Product> {
        self.data.read().await.products.clone()
    }

    pub async fn search_products(&self, params: &ProductQuery) -> (Vec<Product>, i64) {
        let data = self.data.read().await;
        let needle = params.query.as_deref().map(str::to_lowercase);

        let mut matches: Vec<Product> = data
            .products
            .iter()
            .filter(|p| {
                needle.as_deref().is_none_or(|q| {
                    p.name.to_lowercase().contains(q)
                        || p.barcode.as_deref() == Some(q)
                        || p.description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(q))
                })
            })
            .filter(|p| params.category_id.is_none_or(|id| p.category_id == Some(id)))
            .filter(|p| params.supplier_id.is_none_or(|id| p.supplier_id == Some(id)))
            .filter(|p| params.price_from.is_none_or(|from| p.sale_price >= from))
            .filter(|p| params.price_to.is_none_or(|to| p.sale_price <= to))
            .filter(|p| params.low_stock != Some(true) || p.stock <= p.min_stock)
            .cloned()
            .collect();

        match params.sort_by {
            Some(SortBy::NameAsc) => matches.sort_by(|a, b| a.name.cmp(&b.name)),
            Some(SortBy::PriceAsc) => matches.sort_by(|a, b| a.sale_price.cmp(&b.sale_price)),
            Some(SortBy::PriceDesc) => matches.sort_by(|a, b| b.sale_price.cmp(&a.sale_price)),
            Some(SortBy::StockAsc) => matches.sort_by(|a, b| a.stock.cmp(&b.stock)),
            Some(SortBy::Newest) | None => matches.sort_by(|a, b| b.id.cmp(&a.id)),
        }

        let total = matches.len() as i64;
        let offset = params.offset.unwrap_or(0).max(0) as usize;
        let limit = params.limit.unwrap_or(i64::MAX).max(0) as usize;

        (matches.into_iter().skip(offset).take(limit).collect(), total)
    }

    pub async fn find_product(&self, id: i32) -> Option<Product> {
        self.data
            .read()
            .await
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
        let mut data = self.data.write().await;
        ensure_unique(&data.products, draft, None)?;

        let now = Utc::now();
        let product = Product {
            id: data.next_product_id(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            barcode: draft.barcode.clone(),
            category_id: draft.category_id,
            supplier_id: draft.supplier_id,
            purchase_price: draft.purchase_price,
            sale_price: draft.sale_price,
            stock: draft.stock,
            min_stock: draft.min_stock,
            has_imei_serial: draft.has_imei_serial,
            imei_serial_type: draft.imei_serial_type,
            import_batch_id: draft.import_batch_id,
            created_at: now,
            updated_at: now,
        };

        data.products.push(product.clone());
        Ok(product)
    }

    pub async fn update_product(&self, id: i32, draft: &ProductDraft) -> Result<Product> {
        let mut data = self.data.write().await;
        ensure_unique(&data.products, draft, Some(id))?;

        let product = data
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Producto {} no encontrado", id)))?;

        product.name = draft.name.clone();
        product.description = draft.description.clone();
        product.barcode = draft.barcode.clone();
        product.category_id = draft.category_id;
        product.supplier_id = draft.supplier_id;
        product.purchase_price = draft.purchase_price;
        product.sale_price = draft.sale_price;
        product.stock = draft.stock;
        product.min_stock = draft.min_stock;
        product.has_imei_serial = draft.has_imei_serial;
        product.imei_serial_type = draft.imei_serial_type;
        product.updated_at = Utc::now();

        Ok(product.clone())
    }

    pub async fn delete_product(&self, id: i32) -> bool {
        let mut data = self.data.write().await;
        let before = data.products.len();
        data.products.retain(|p| p.id != id);
        data.products.len() != before
    }

    pub async fn assign_category(&self, product_id: i32, category_id: i32) {
        let mut data = self.data.write().await;
        if let Some(product) = data.products.iter_mut().find(|p| p.id == product_id) {
            product.category_id = Some(category_id);
            product.updated_at = Utc::now();
        }
    }

    pub async fn categories(&self) -> Vec<Category> {
        let mut categories = self.data.read().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        categories
    }

    pub async fn find_category(&self, id: i32) -> Option<Category> {
        self.data
            .read()
            .await
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub async fn create_category(&self, req: &CreateCategoryRequest) -> Result<Category> {
        let mut data = self.data.write().await;
        let name = req.name.trim();

        if data
            .categories
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(name))
        {
            return Err(AppError::Conflict(format!(
                "La categoría '{}' ya existe",
                name
            )));
        }

        let mut category = sample_category(data.next_category_id(), name);
        category.description = req.description.clone();
        category.color = req.color.clone();
        data.categories.push(category.clone());

        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: i32,
        req: &UpdateCategoryRequest,
    ) -> Result<Option<Category>> {
        let mut data = self.data.write().await;

        let clash = req.name.as_deref().map(str::trim).filter(|name| {
            data.categories
                .iter()
                .any(|c| c.id != id && c.name.eq_ignore_ascii_case(name))
        });
        if let Some(name) = clash {
            return Err(AppError::Conflict(format!(
                "La categoría '{}' ya existe",
                name
            )));
        }

        let Some(category) = data.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &req.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = &req.description {
            category.description = Some(description.clone());
        }
        if let Some(color) = &req.color {
            category.color = Some(color.clone());
        }
        category.updated_at = Utc::now();

        Ok(Some(category.clone()))
    }

    /// Removes a category and detaches its products.
    pub async fn delete_category(&self, id: i32) -> bool {
        let mut data = self.data.write().await;
        let before = data.categories.len();
        data.categories.retain(|c| c.id != id);

        if data.categories.len() == before {
            return false;
        }

        for product in data.products.iter_mut().filter(|p| p.category_id == Some(id)) {
            product.category_id = None;
        }
        true
    }

    pub async fn suppliers(&self) -> Vec<Supplier> {
        self.data.read().await.suppliers.clone()
    }

    pub async fn find_supplier(&self, id: i32) -> Option<Supplier> {
        self.data
            .read()
            .await
            .suppliers
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }
}

fn ensure_unique(products: &[Product], draft: &ProductDraft, except: Option<i32>) -> Result<()> {
    let others = || products.iter().filter(|p| Some(p.id) != except);

    if others().any(|p| p.name.eq_ignore_ascii_case(&draft.name)) {
        return Err(AppError::Conflict(format!(
            "Ya existe un producto llamado '{}'",
            draft.name
        )));
    }

    let taken = draft
        .barcode
        .as_deref()
        .filter(|barcode| others().any(|p| p.barcode.as_deref() == Some(*barcode)));
    if let Some(barcode) = taken {
        return Err(AppError::Conflict(format!(
            "El código de barras '{}' ya está en uso",
            barcode
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductRequest;

    fn draft(name: &str) -> ProductDraft {
        ProductDraft::from_request(&ProductRequest {
            name: Some(name.to_string()),
            sale_price: Some(dec!(10)),
            ..ProductRequest::default()
        })
    }

    #[tokio::test]
    async fn seeded_store_has_catalog() {
        let store = DemoStore::seeded();
        assert_eq!(store.products().await.len(), 8);
        assert_eq!(store.categories().await.len(), 4);
        assert_eq!(store.suppliers().await.len(), 2);
    }

    #[tokio::test]
    async fn create_assigns_next_id_and_rejects_duplicates() {
        let store = DemoStore::seeded();

        let created = store.create_product(&draft("Parlante JBL Go 3")).await.unwrap();
        assert_eq!(created.id, 9);

        let duplicate = store.create_product(&draft("parlante jbl go 3")).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn search_filters_and_paginates() {
        let store = DemoStore::seeded();

        let (phones, total) = store
            .search_products(&ProductQuery {
                category_id: Some(1),
                sort_by: Some(SortBy::PriceAsc),
                limit: Some(2),
                ..ProductQuery::default()
            })
            .await;

        assert_eq!(total, 3);
        assert_eq!(phones.len(), 2);
        assert_eq!(phones[0].name, "Xiaomi Redmi Note 13");

        let (low, _) = store
            .search_products(&ProductQuery {
                low_stock: Some(true),
                ..ProductQuery::default()
            })
            .await;
        assert!(low.iter().all(|p| p.stock <= p.min_stock));
        assert_eq!(low.len(), 3);
    }

    #[tokio::test]
    async fn deleting_a_category_detaches_products() {
        let store = DemoStore::seeded();

        assert!(store.delete_category(2).await);
        assert!(!store.delete_category(2).await);
        let product = store.find_product(4).await.unwrap();
        assert_eq!(product.category_id, None);
    }
}
