use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{User, UserResponse, UserRole},
};

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<UserResponse> {
    let user = sqlx::query_as::<_, UserResponse>(
        "INSERT INTO users (email, name, password, role) VALUES ($1, $2, $3, $4)
         RETURNING id, email, name, role, active, created_at",
    )
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<UserResponse>> {
    let users = sqlx::query_as::<_, UserResponse>(
        "SELECT id, email, name, role, active, created_at FROM users ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}

pub struct UserChanges<'a> {
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
}

pub async fn update_user(
    pool: &PgPool,
    id: i32,
    changes: UserChanges<'_>,
) -> Result<Option<UserResponse>> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET updated_at = NOW()");

    if let Some(email) = changes.email {
        query.push(", email = ");
        query.push_bind(email.to_string());
    }

    if let Some(name) = changes.name {
        query.push(", name = ");
        query.push_bind(name.to_string());
    }

    if let Some(hash) = changes.password_hash {
        query.push(", password = ");
        query.push_bind(hash);
    }

    if let Some(role) = changes.role {
        query.push(", role = ");
        query.push_bind(role);
    }

    if let Some(active) = changes.active {
        query.push(", active = ");
        query.push_bind(active);
    }

    query.push(" WHERE id = ");
    query.push_bind(id);
    query.push(" RETURNING id, email, name, role, active, created_at");

    let user = query
        .build_query_as::<UserResponse>()
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Users referenced by sales and registers are deactivated, never removed.
pub async fn deactivate_user(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query("UPDATE users SET active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
