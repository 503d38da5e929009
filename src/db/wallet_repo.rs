use sqlx::PgPool;

use crate::models::wallet::WalletRow;
use crate::models::WalletProfile;

/// Insert or update an analyzed wallet profile.
pub async fn upsert_wallet(pool: &PgPool, profile: &WalletProfile) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wallets (address, bet_count, join_date, freshness_level, is_fresh, last_analyzed_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (address) DO UPDATE SET
            bet_count = EXCLUDED.bet_count,
            join_date = EXCLUDED.join_date,
            freshness_level = EXCLUDED.freshness_level,
            is_fresh = EXCLUDED.is_fresh,
            last_analyzed_at = EXCLUDED.last_analyzed_at
        "#,
    )
    .bind(&profile.address)
    .bind(profile.bet_count)
    .bind(&profile.join_date)
    .bind(profile.freshness_level.as_str())
    .bind(profile.is_fresh)
    .bind(profile.analyzed_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_wallet(pool: &PgPool, address: &str) -> anyhow::Result<Option<WalletProfile>> {
    let row = sqlx::query_as::<_, WalletRow>("SELECT * FROM wallets WHERE address = $1")
        .bind(address)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(WalletProfile::from))
}

/// Most recently analyzed wallets first; never-analyzed ones last.
pub async fn get_all_wallets(pool: &PgPool, limit: i64) -> anyhow::Result<Vec<WalletProfile>> {
    let rows = sqlx::query_as::<_, WalletRow>(
        "SELECT * FROM wallets ORDER BY last_analyzed_at DESC NULLS LAST, first_seen_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(WalletProfile::from).collect())
}

/// Addresses for the refresh worker: unanalyzed first, then low-activity
/// wallets by oldest analysis.
pub async fn get_wallets_for_refresh(
    pool: &PgPool,
    limit: i64,
    max_bet_count: i32,
) -> anyhow::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT address FROM wallets
        WHERE bet_count = -1 OR bet_count <= $2
        ORDER BY
            CASE WHEN bet_count = -1 THEN 0 ELSE 1 END,
            COALESCE(last_analyzed_at, '1970-01-01'::timestamptz) ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .bind(max_bet_count)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(a,)| a).collect())
}

/// Queue an address as unanalyzed. Returns `true` when the row is new.
pub async fn insert_wallet_address(pool: &PgPool, address: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO wallets (address, bet_count)
        VALUES ($1, -1)
        ON CONFLICT (address) DO NOTHING
        "#,
    )
    .bind(address)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_wallets(pool: &PgPool) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM wallets")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}
