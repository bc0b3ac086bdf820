use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{PartnerQuery, PartnerRequest, Supplier},
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

pub async fn search_suppliers(pool: &PgPool, params: &PartnerQuery) -> Result<Vec<Supplier>> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM suppliers WHERE 1=1");

    if let Some(ref q) = params.query {
        let pattern = format!("%{}%", q.trim());
        query.push(" AND (name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR contact_name ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    query.push(" ORDER BY name ASC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let suppliers = query.build_query_as::<Supplier>().fetch_all(pool).await?;

    Ok(suppliers)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Supplier>> {
    let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(supplier)
}

pub async fn create_supplier(pool: &PgPool, name: &str, req: &PartnerRequest) -> Result<Supplier> {
    let supplier = sqlx::query_as::<_, Supplier>(
        "INSERT INTO suppliers (name, contact_name, email, phone, address)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(name)
    .bind(&req.contact_name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .fetch_one(pool)
    .await?;

    Ok(supplier)
}

pub async fn update_supplier(
    pool: &PgPool,
    id: i32,
    req: &PartnerRequest,
) -> Result<Option<Supplier>> {
    let supplier = sqlx::query_as::<_, Supplier>(
        r#"
        UPDATE suppliers
        SET
            name = COALESCE($1, name),
            contact_name = COALESCE($2, contact_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            address = COALESCE($5, address),
            updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.contact_name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(supplier)
}

pub async fn delete_supplier(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
