use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::event::TradeEventRow;
use crate::models::{EventFilter, TradeEvent};

pub const DEFAULT_EVENT_LIMIT: i64 = 100;

// Feed values are stored as text; malformed ones compare as NULL.
const PRICE_NUMERIC: &str = "(CASE WHEN price ~ '^[0-9]*\\.?[0-9]+$' THEN price::numeric END)";
const SIZE_NUMERIC: &str = "(CASE WHEN size ~ '^[0-9]*\\.?[0-9]+$' THEN size::numeric END)";

/// Insert an event, returning the assigned id.
pub async fn insert_event(pool: &PgPool, event: &TradeEvent) -> anyhow::Result<i64> {
    let signal = event
        .fresh_wallet_signal
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;
    let profile = event.wallet_profile.as_ref();

    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO trade_events (
            event_type, asset_id, condition_id, market_slug, market_name, market_image,
            market_link, event_slug, event_title, event_timestamp, price, size, side,
            trade_id, wallet_address, trader_name, outcome, outcome_index,
            is_fresh_wallet, wallet_bet_count, freshness_level, risk_score, risk_signals,
            fresh_wallet_signal
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24)
        RETURNING id
        "#,
    )
    .bind(event.event_type.as_str())
    .bind(&event.asset_id)
    .bind(&event.condition_id)
    .bind(&event.market_slug)
    .bind(&event.market_name)
    .bind(&event.market_image)
    .bind(&event.market_link)
    .bind(&event.event_slug)
    .bind(&event.event_title)
    .bind(event.timestamp)
    .bind(&event.price)
    .bind(&event.size)
    .bind(event.side.map(|s| s.as_str()))
    .bind(&event.trade_id)
    .bind(&event.wallet_address)
    .bind(&event.trader_name)
    .bind(&event.outcome)
    .bind(event.outcome_index)
    .bind(event.is_fresh_wallet)
    .bind(profile.map(|p| p.bet_count))
    .bind(profile.map(|p| p.freshness_level.as_str()))
    .bind(event.risk_score)
    .bind(&event.risk_signals)
    .bind(signal)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Write the enrichment columns of an already stored event.
pub async fn update_enrichment(pool: &PgPool, id: i64, event: &TradeEvent) -> anyhow::Result<()> {
    let signal = event
        .fresh_wallet_signal
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;
    let profile = event.wallet_profile.as_ref();

    sqlx::query(
        r#"
        UPDATE trade_events
        SET is_fresh_wallet = $2,
            wallet_bet_count = $3,
            freshness_level = $4,
            risk_score = $5,
            risk_signals = $6,
            fresh_wallet_signal = $7
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(event.is_fresh_wallet)
    .bind(profile.map(|p| p.bet_count))
    .bind(profile.map(|p| p.freshness_level.as_str()))
    .bind(event.risk_score)
    .bind(&event.risk_signals)
    .bind(signal)
    .execute(pool)
    .await?;

    Ok(())
}

/// Query events matching `filter`, newest first.
pub async fn get_events(pool: &PgPool, filter: &EventFilter) -> anyhow::Result<Vec<TradeEvent>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM trade_events WHERE TRUE");

    if !filter.event_types.is_empty() {
        let types: Vec<String> = filter.event_types.iter().map(|t| t.to_string()).collect();
        qb.push(" AND event_type = ANY(").push_bind(types).push(")");
    }
    if !filter.market_name.is_empty() {
        let pattern = format!("%{}%", filter.market_name);
        qb.push(" AND (market_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR event_title ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(side) = filter.side {
        qb.push(" AND side = ").push_bind(side.as_str());
    }
    if filter.min_price > Decimal::ZERO {
        qb.push(format!(" AND {PRICE_NUMERIC} >= "))
            .push_bind(filter.min_price);
    }
    if filter.max_price > Decimal::ZERO {
        qb.push(format!(" AND {PRICE_NUMERIC} <= "))
            .push_bind(filter.max_price);
    }
    if filter.min_size > Decimal::ZERO {
        qb.push(format!(" AND {PRICE_NUMERIC} * {SIZE_NUMERIC} >= "))
            .push_bind(filter.min_size);
    }
    if filter.fresh_wallets_only {
        qb.push(" AND is_fresh_wallet");
    }
    if filter.min_risk_score > 0.0 {
        qb.push(" AND risk_score >= ").push_bind(filter.min_risk_score);
    }
    if filter.max_wallet_bet_count > 0 {
        qb.push(" AND wallet_bet_count >= 0 AND wallet_bet_count <= ")
            .push_bind(filter.max_wallet_bet_count);
    }

    let limit = if filter.limit > 0 { filter.limit } else { DEFAULT_EVENT_LIMIT };
    qb.push(" ORDER BY event_timestamp DESC, id DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(filter.offset.max(0));

    let rows = qb.build_query_as::<TradeEventRow>().fetch_all(pool).await?;

    Ok(rows.into_iter().map(TradeEvent::from).collect())
}

pub async fn count_events(pool: &PgPool) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trade_events")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

/// Delete all events and wallets in one transaction.
pub async fn clear_events_and_wallets(pool: &PgPool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM trade_events").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM wallets").execute(&mut *tx).await?;
    tx.commit().await?;

    Ok(())
}

/// Total on-disk size of the current database, in bytes.
pub async fn database_size(pool: &PgPool) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT pg_database_size(current_database())")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}
