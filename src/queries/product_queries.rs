use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{Product, ProductDraft, ProductQuery, ProductSearchResponse, SortBy},
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 500;

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(product)
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name ASC")
        .fetch_all(pool)
        .await?;

    Ok(products)
}

pub async fn list_by_category(pool: &PgPool, category_id: i32) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE category_id = $1 ORDER BY name ASC",
    )
    .bind(category_id)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Case-insensitive name lookup, optionally ignoring one product (for updates).
pub async fn name_taken(pool: &PgPool, name: &str, except: Option<i32>) -> Result<bool> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM products WHERE LOWER(name) = LOWER($1) AND ($2::int IS NULL OR id <> $2))",
    )
    .bind(name)
    .bind(except)
    .fetch_one(pool)
    .await?;

    Ok(taken)
}

pub async fn barcode_taken(pool: &PgPool, barcode: &str, except: Option<i32>) -> Result<bool> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM products WHERE barcode = $1 AND ($2::int IS NULL OR id <> $2))",
    )
    .bind(barcode)
    .bind(except)
    .fetch_one(pool)
    .await?;

    Ok(taken)
}

pub async fn search_products(pool: &PgPool, params: &ProductQuery) -> Result<ProductSearchResponse> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT *, COUNT(*) OVER() AS total_count FROM products WHERE 1=1");

    // text search
    if let Some(ref q) = params.query {
        let pattern = format!("%{}%", q.trim());
        query.push(" AND (name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR description ILIKE ");
        query.push_bind(pattern);
        query.push(" OR barcode = ");
        query.push_bind(q.trim().to_string());
        query.push(")");
    }

    if let Some(category_id) = params.category_id {
        query.push(" AND category_id = ");
        query.push_bind(category_id);
    }

    if let Some(supplier_id) = params.supplier_id {
        query.push(" AND supplier_id = ");
        query.push_bind(supplier_id);
    }

    // price range
    if let Some(price_from) = params.price_from {
        query.push(" AND sale_price >= ");
        query.push_bind(price_from);
    }

    if let Some(price_to) = params.price_to {
        query.push(" AND sale_price <= ");
        query.push_bind(price_to);
    }

    if params.low_stock == Some(true) {
        query.push(" AND stock <= min_stock");
    }

    query.push(" ORDER BY ");
    query.push(match params.sort_by {
        Some(SortBy::NameAsc) => "name ASC",
        Some(SortBy::PriceAsc) => "sale_price ASC",
        Some(SortBy::PriceDesc) => "sale_price DESC",
        Some(SortBy::StockAsc) => "stock ASC",
        Some(SortBy::Newest) | None => "created_at DESC",
    });

    query.push(" LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    #[derive(sqlx::FromRow)]
    struct SearchResult {
        #[sqlx(flatten)]
        product: Product,
        total_count: i64,
    }

    let results = query
        .build_query_as::<SearchResult>()
        .fetch_all(pool)
        .await?;

    let total = results.first().map(|r| r.total_count).unwrap_or(0);
    let products = results.into_iter().map(|r| r.product.into()).collect();

    Ok(ProductSearchResponse {
        products,
        total,
        limit,
        offset,
    })
}

pub async fn create_product(pool: &PgPool, draft: &ProductDraft) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (
            name, description, barcode, category_id, supplier_id, purchase_price,
            sale_price, stock, min_stock, has_imei_serial, imei_serial_type, import_batch_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(&draft.barcode)
    .bind(draft.category_id)
    .bind(draft.supplier_id)
    .bind(draft.purchase_price)
    .bind(draft.sale_price)
    .bind(draft.stock)
    .bind(draft.min_stock)
    .bind(draft.has_imei_serial)
    .bind(draft.imei_serial_type)
    .bind(draft.import_batch_id)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

/// Overwrites every editable column with the merged draft.
pub async fn update_product(pool: &PgPool, id: i32, draft: &ProductDraft) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET
            name = $1,
            description = $2,
            barcode = $3,
            category_id = $4,
            supplier_id = $5,
            purchase_price = $6,
            sale_price = $7,
            stock = $8,
            min_stock = $9,
            has_imei_serial = $10,
            imei_serial_type = $11,
            updated_at = NOW()
        WHERE id = $12
        RETURNING *
        "#,
    )
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(&draft.barcode)
    .bind(draft.category_id)
    .bind(draft.supplier_id)
    .bind(draft.purchase_price)
    .bind(draft.sale_price)
    .bind(draft.stock)
    .bind(draft.min_stock)
    .bind(draft.has_imei_serial)
    .bind(draft.imei_serial_type)
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

pub async fn delete_product(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn assign_category(pool: &PgPool, product_id: i32, category_id: i32) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE products SET category_id = $1, updated_at = NOW() WHERE id = $2 AND category_id IS NULL",
    )
    .bind(category_id)
    .bind(product_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
