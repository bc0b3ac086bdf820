use sqlx::PgPool;

use crate::{
    error::Result,
    models::{Category, CategoryWithCount, CreateCategoryRequest, UpdateCategoryRequest},
};

pub async fn list_all(pool: &PgPool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
        .fetch_all(pool)
        .await?;

    Ok(categories)
}

pub async fn list_with_counts(pool: &PgPool) -> Result<Vec<CategoryWithCount>> {
    let categories = sqlx::query_as::<_, CategoryWithCount>(
        "SELECT c.*, COUNT(p.id)::bigint AS product_count
         FROM categories c
         LEFT JOIN products p ON p.category_id = c.id
         GROUP BY c.id
         ORDER BY c.name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE LOWER(name) = LOWER($1)",
    )
    .bind(name.trim())
    .fetch_optional(pool)
    .await?;

    Ok(category)
}

pub async fn create_category(pool: &PgPool, req: &CreateCategoryRequest) -> Result<Category> {
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, description, color) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(req.name.trim())
    .bind(&req.description)
    .bind(&req.color)
    .fetch_one(pool)
    .await?;

    Ok(category)
}

pub async fn update_category(
    pool: &PgPool,
    id: i32,
    req: &UpdateCategoryRequest,
) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        r#"
        UPDATE categories
        SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            color = COALESCE($3, color),
            updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(&req.color)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(category)
}

/// Products keep existing with no category (`ON DELETE SET NULL`).
pub async fn delete_category(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
