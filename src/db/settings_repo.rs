use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;

pub const CONFIG_KEY: &str = "config";
pub const FILTER_KEY: &str = "filter";
pub const NOTIFICATION_CONFIG_KEY: &str = "notification_config";

/// Upsert a JSON-encoded setting; latest value wins.
pub async fn save_setting<T: Serialize>(pool: &PgPool, key: &str, value: &T) -> anyhow::Result<()> {
    let encoded = serde_json::to_string(value)?;

    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
        "#,
    )
    .bind(key)
    .bind(encoded)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a JSON-encoded setting, `None` if it was never saved.
pub async fn load_setting<T: DeserializeOwned>(pool: &PgPool, key: &str) -> anyhow::Result<Option<T>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    match row {
        Some((value,)) => Ok(Some(serde_json::from_str(&value)?)),
        None => Ok(None),
    }
}
