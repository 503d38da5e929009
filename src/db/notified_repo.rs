use sqlx::PgPool;

/// Whether `(item_type, item_id)` is already in the dedup ledger.
pub async fn has_notified(pool: &PgPool, item_type: &str, item_id: &str) -> anyhow::Result<bool> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM notified_items WHERE item_type = $1 AND item_id = $2)",
    )
    .bind(item_type)
    .bind(item_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Append to the ledger. Returns `true` if the row was inserted by this call.
pub async fn mark_notified(pool: &PgPool, item_type: &str, item_id: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO notified_items (item_type, item_id, notified_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (item_type, item_id) DO NOTHING
        "#,
    )
    .bind(item_type)
    .bind(item_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
