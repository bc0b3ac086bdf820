use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{ImportBatch, ImportFormat},
};

pub async fn create_batch(
    pool: &PgPool,
    file_name: &str,
    format: ImportFormat,
    total_rows: i32,
    created_by: i32,
) -> Result<ImportBatch> {
    let batch = sqlx::query_as::<_, ImportBatch>(
        "INSERT INTO import_batches (id, file_name, source_format, total_rows, created_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(file_name)
    .bind(format.as_str())
    .bind(total_rows)
    .bind(created_by)
    .fetch_one(pool)
    .await?;

    Ok(batch)
}

pub async fn finish_batch(
    pool: &PgPool,
    id: Uuid,
    processed: i32,
    skipped: i32,
    errored: i32,
) -> Result<()> {
    sqlx::query(
        "UPDATE import_batches SET processed = $1, skipped = $2, errored = $3 WHERE id = $4",
    )
    .bind(processed)
    .bind(skipped)
    .bind(errored)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_batches(pool: &PgPool) -> Result<Vec<ImportBatch>> {
    let batches =
        sqlx::query_as::<_, ImportBatch>("SELECT * FROM import_batches ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;

    Ok(batches)
}

/// Lower-cased product names and raw barcodes, used to skip rows that already exist.
pub async fn existing_keys(pool: &PgPool) -> Result<(HashSet<String>, HashSet<String>)> {
    #[derive(sqlx::FromRow)]
    struct Key {
        name: String,
        barcode: Option<String>,
    }

    let keys = sqlx::query_as::<_, Key>("SELECT LOWER(name) AS name, barcode FROM products")
        .fetch_all(pool)
        .await?;

    let mut names = HashSet::with_capacity(keys.len());
    let mut barcodes = HashSet::new();

    for key in keys {
        names.insert(key.name);
        if let Some(barcode) = key.barcode {
            barcodes.insert(barcode);
        }
    }

    Ok((names, barcodes))
}

/// Removes a batch together with the products it created.
/// Returns `None` when the batch does not exist.
pub async fn delete_batch(pool: &PgPool, id: Uuid) -> Result<Option<u64>> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM products WHERE import_batch_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let batch = sqlx::query("DELETE FROM import_batches WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if batch.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;

    Ok(Some(removed.rows_affected()))
}
