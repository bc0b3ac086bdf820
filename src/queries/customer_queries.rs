use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{Customer, PartnerQuery, PartnerRequest},
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

pub async fn search_customers(pool: &PgPool, params: &PartnerQuery) -> Result<Vec<Customer>> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM customers WHERE 1=1");

    if let Some(ref q) = params.query {
        let pattern = format!("%{}%", q.trim());
        query.push(" AND (name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR document ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR email ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    query.push(" ORDER BY name ASC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let customers = query.build_query_as::<Customer>().fetch_all(pool).await?;

    Ok(customers)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(customer)
}

pub async fn create_customer(pool: &PgPool, name: &str, req: &PartnerRequest) -> Result<Customer> {
    let customer = sqlx::query_as::<_, Customer>(
        "INSERT INTO customers (name, document, email, phone, address)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(name)
    .bind(&req.document)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .fetch_one(pool)
    .await?;

    Ok(customer)
}

pub async fn update_customer(
    pool: &PgPool,
    id: i32,
    req: &PartnerRequest,
) -> Result<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers
        SET
            name = COALESCE($1, name),
            document = COALESCE($2, document),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            address = COALESCE($5, address),
            updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.document)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.address)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(customer)
}

pub async fn delete_customer(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
