use std::collections::HashSet;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{CodeKind, ImeiSerialRequest, ImeiSerialStatus, ProductImeiSerial},
};

pub async fn list_for_product(
    pool: &PgPool,
    product_id: i32,
    status: Option<ImeiSerialStatus>,
) -> Result<Vec<ProductImeiSerial>> {
    let units = sqlx::query_as::<_, ProductImeiSerial>(
        "SELECT * FROM product_imei_serials
         WHERE product_id = $1 AND ($2::imei_serial_status IS NULL OR status = $2)
         ORDER BY created_at DESC",
    )
    .bind(product_id)
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(units)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<ProductImeiSerial>> {
    let unit =
        sqlx::query_as::<_, ProductImeiSerial>("SELECT * FROM product_imei_serials WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(unit)
}

/// Looks a code up in any of the three identifier columns.
pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<ProductImeiSerial>> {
    let unit = sqlx::query_as::<_, ProductImeiSerial>(
        "SELECT * FROM product_imei_serials
         WHERE imei1 = $1 OR imei2 = $1 OR serial_number = $1
         LIMIT 1",
    )
    .bind(code.trim())
    .fetch_optional(pool)
    .await?;

    Ok(unit)
}

/// The subset of `codes` already registered on any unit.
pub async fn existing_codes(pool: &PgPool, codes: &[String]) -> Result<HashSet<String>> {
    if codes.is_empty() {
        return Ok(HashSet::new());
    }

    let found = sqlx::query_scalar::<_, String>(
        "SELECT code FROM (
            SELECT imei1 AS code FROM product_imei_serials
            UNION SELECT imei2 FROM product_imei_serials
            UNION SELECT serial_number FROM product_imei_serials
         ) AS codes
         WHERE code = ANY($1)",
    )
    .bind(codes)
    .fetch_all(pool)
    .await?;

    Ok(found.into_iter().collect())
}

pub async fn create_unit(
    pool: &PgPool,
    product_id: i32,
    req: &ImeiSerialRequest,
) -> Result<ProductImeiSerial> {
    let unit = sqlx::query_as::<_, ProductImeiSerial>(
        "INSERT INTO product_imei_serials (product_id, imei1, imei2, serial_number, status, notes)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(product_id)
    .bind(trimmed(&req.imei1))
    .bind(trimmed(&req.imei2))
    .bind(trimmed(&req.serial_number))
    .bind(req.status.unwrap_or(ImeiSerialStatus::Available))
    .bind(&req.notes)
    .fetch_one(pool)
    .await?;

    Ok(unit)
}

/// Inserts every code as an available unit in a single statement.
pub async fn bulk_insert(
    pool: &PgPool,
    product_id: i32,
    kind: CodeKind,
    codes: &[String],
) -> Result<u64> {
    if codes.is_empty() {
        return Ok(0);
    }

    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO product_imei_serials (product_id, imei1, serial_number) ");

    query.push_values(codes, |mut row, code| {
        let (imei, serial) = match kind {
            CodeKind::Imei => (Some(code.clone()), None),
            CodeKind::Serial => (None, Some(code.clone())),
        };
        row.push_bind(product_id).push_bind(imei).push_bind(serial);
    });

    let result = query.build().execute(pool).await?;

    Ok(result.rows_affected())
}

pub async fn update_unit(
    pool: &PgPool,
    id: i32,
    req: &ImeiSerialRequest,
) -> Result<Option<ProductImeiSerial>> {
    let unit = sqlx::query_as::<_, ProductImeiSerial>(
        r#"
        UPDATE product_imei_serials
        SET
            imei1 = COALESCE($1, imei1),
            imei2 = COALESCE($2, imei2),
            serial_number = COALESCE($3, serial_number),
            status = COALESCE($4, status),
            notes = COALESCE($5, notes),
            updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(trimmed(&req.imei1))
    .bind(trimmed(&req.imei2))
    .bind(trimmed(&req.serial_number))
    .bind(req.status)
    .bind(&req.notes)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(unit)
}

pub async fn delete_unit(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM product_imei_serials WHERE id = $1 AND status <> 'sold'")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
