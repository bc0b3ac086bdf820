use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, Result},
    models::{
        CashRegister, CreateSaleRequest, Product, Sale, SaleItem, SaleQuery, SaleResponse,
    },
    services::sales::{build_sale_lines, sale_totals},
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Records a sale atomically.
///
/// Product rows are locked, stock is deducted, serialized units are marked as
/// sold and, when the cashier has an open register, a `sale` movement is added.
pub async fn create_sale(pool: &PgPool, user_id: i32, req: &CreateSaleRequest) -> Result<SaleResponse> {
    let mut tx = pool.begin().await?;

    let mut product_ids: Vec<i32> = req.items.iter().map(|item| item.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&product_ids)
    .fetch_all(&mut *tx)
    .await?;

    let lines = build_sale_lines(&req.items, &products)?;
    let (subtotal, total) = sale_totals(&lines, req.discount.unwrap_or(Decimal::ZERO))?;

    let register = sqlx::query_as::<_, CashRegister>(
        "SELECT * FROM cash_registers WHERE user_id = $1 AND status = 'open' FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let sale = sqlx::query_as::<_, Sale>(
        "INSERT INTO sales (customer_id, user_id, cash_register_id, subtotal, discount, total, payment_method)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(req.customer_id)
    .bind(user_id)
    .bind(register.as_ref().map(|r| r.id))
    .bind(subtotal)
    .bind(subtotal - total)
    .bind(total)
    .bind(req.payment_method)
    .fetch_one(&mut *tx)
    .await?;

    let item_product_ids: Vec<i32> = lines.iter().map(|l| l.product_id).collect();
    let serial_ids: Vec<Option<i32>> = lines.iter().map(|l| l.imei_serial_id).collect();
    let quantities: Vec<i32> = lines.iter().map(|l| l.quantity).collect();
    let unit_prices: Vec<Decimal> = lines.iter().map(|l| l.unit_price).collect();
    let subtotals: Vec<Decimal> = lines.iter().map(|l| l.subtotal).collect();

    let items = sqlx::query_as::<_, SaleItem>(
        "INSERT INTO sale_items (sale_id, product_id, imei_serial_id, quantity, unit_price, subtotal)
         SELECT $1, unnest($2::int[]), unnest($3::int[]), unnest($4::int[]), unnest($5::numeric[]), unnest($6::numeric[])
         RETURNING *",
    )
    .bind(sale.id)
    .bind(&item_product_ids)
    .bind(&serial_ids)
    .bind(&quantities)
    .bind(&unit_prices)
    .bind(&subtotals)
    .fetch_all(&mut *tx)
    .await?;

    for line in lines.iter().filter(|l| l.imei_serial_id.is_some()) {
        let result = sqlx::query(
            "UPDATE product_imei_serials
             SET status = 'sold', sale_id = $1, updated_at = NOW()
             WHERE id = $2 AND product_id = $3 AND status IN ('available', 'reserved')",
        )
        .bind(sale.id)
        .bind(line.imei_serial_id)
        .bind(line.product_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "La unidad {} no está disponible para la venta",
                line.imei_serial_id.unwrap_or_default()
            )));
        }
    }

    let mut deductions: HashMap<i32, i32> = HashMap::new();
    for line in &lines {
        *deductions.entry(line.product_id).or_insert(0) += line.quantity;
    }

    for (product_id, quantity) in deductions {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $1, updated_at = NOW()
             WHERE id = $2 AND stock >= $1",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "Stock insuficiente para el producto {}",
                product_id
            )));
        }
    }

    if let Some(register) = register.as_ref().filter(|_| total > Decimal::ZERO) {
        sqlx::query(
            "INSERT INTO cash_movements (cash_register_id, movement_type, amount, description, sale_id)
             VALUES ($1, 'sale', $2, $3, $4)",
        )
        .bind(register.id)
        .bind(total)
        .bind(format!("Venta #{}", sale.id))
        .bind(sale.id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(SaleResponse { sale, items })
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<SaleResponse>> {
    let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(sale) = sale else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, SaleItem>("SELECT * FROM sale_items WHERE sale_id = $1 ORDER BY id")
        .bind(sale.id)
        .fetch_all(pool)
        .await?;

    Ok(Some(SaleResponse { sale, items }))
}

pub async fn search_sales(pool: &PgPool, params: &SaleQuery) -> Result<Vec<SaleResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM sales WHERE 1=1");

    if let Some(from) = params.from {
        query.push(" AND created_at >= ");
        query.push_bind(from);
    }

    if let Some(to) = params.to {
        query.push(" AND created_at < ");
        query.push_bind(to);
        query.push(" + 1");
    }

    if let Some(customer_id) = params.customer_id {
        query.push(" AND customer_id = ");
        query.push_bind(customer_id);
    }

    if let Some(user_id) = params.user_id {
        query.push(" AND user_id = ");
        query.push_bind(user_id);
    }

    query.push(" ORDER BY created_at DESC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let sales = query.build_query_as::<Sale>().fetch_all(pool).await?;

    if sales.is_empty() {
        return Ok(Vec::new());
    }

    let sale_ids: Vec<i32> = sales.iter().map(|s| s.id).collect();
    let all_items = sqlx::query_as::<_, SaleItem>(
        "SELECT * FROM sale_items WHERE sale_id = ANY($1) ORDER BY sale_id, id",
    )
    .bind(&sale_ids)
    .fetch_all(pool)
    .await?;

    let mut items_map: HashMap<i32, Vec<SaleItem>> = HashMap::new();
    for item in all_items {
        items_map.entry(item.sale_id).or_default().push(item);
    }

    let result = sales
        .into_iter()
        .map(|sale| {
            let items = items_map.remove(&sale.id).unwrap_or_default();
            SaleResponse { sale, items }
        })
        .collect();

    Ok(result)
}
