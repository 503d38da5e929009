use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::models::{EventType, Side, TradeEvent};
use crate::polymarket::{LiveMessage, LiveSubscribe, LiveTrade};
use crate::shutdown::signalled;

const PING_INTERVAL: Duration = Duration::from_secs(25);
const BASE_RECONNECT_DELAY: Duration = Duration::from_secs(2);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

const MARKET_URL_BASE: &str = "https://polymarket.com/event";

/// Why a connection ended.
enum Disconnect {
    Shutdown,
    Dropped,
}

/// Stream `activity/trades` from the live-data WebSocket into `tx`.
///
/// Reconnects with capped exponential backoff until `shutdown` flips or the
/// receiving side of `tx` goes away.
pub async fn run_feed_listener(
    ws_url: String,
    tx: mpsc::Sender<TradeEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }
        tracing::info!(url = %ws_url, "Connecting to live-data feed...");

        let connected = tokio::select! {
            _ = signalled(&mut shutdown) => break,
            result = connect_async(&ws_url) => result,
        };

        match connected {
            Ok((ws_stream, _response)) => {
                tracing::info!("Live-data feed connected");
                attempt = 0;
                if let Disconnect::Shutdown = stream_trades(ws_stream, &tx, &mut shutdown).await {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Live-data connection failed");
            }
        }

        if tx.is_closed() {
            tracing::warn!("Pipeline channel closed, stopping feed listener");
            break;
        }

        let delay = reconnect_delay(attempt);
        attempt = attempt.saturating_add(1);
        tracing::info!(delay_secs = delay.as_secs(), attempt, "Reconnecting...");
        tokio::select! {
            _ = signalled(&mut shutdown) => break,
            _ = sleep(delay) => {}
        }
    }

    tracing::info!("Feed listener stopped");
}

async fn stream_trades<S>(
    ws_stream: S,
    tx: &mpsc::Sender<TradeEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> Disconnect
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut write, mut read) = ws_stream.split();

    let subscribe = match serde_json::to_string(&LiveSubscribe::activity_trades()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode subscribe message");
            return Disconnect::Dropped;
        }
    };
    if let Err(e) = write.send(Message::Text(subscribe.into())).await {
        tracing::error!(error = %e, "Failed to send subscribe message");
        return Disconnect::Dropped;
    }
    tracing::info!("Subscribed to activity/trades");

    let mut ping_timer = interval(PING_INTERVAL);
    ping_timer.tick().await;

    loop {
        tokio::select! {
            _ = signalled(shutdown) => {
                let _ = write.send(Message::Close(None)).await;
                return Disconnect::Shutdown;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    for event in parse_message(text.as_ref()) {
                        if tx.send(event).await.is_err() {
                            return Disconnect::Dropped;
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        tracing::warn!(error = %e, "Failed to send pong");
                        return Disconnect::Dropped;
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    tracing::warn!("Live-data server sent close frame");
                    return Disconnect::Dropped;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Live-data read error");
                    return Disconnect::Dropped;
                }
                None => {
                    tracing::warn!("Live-data stream ended");
                    return Disconnect::Dropped;
                }
            },
            _ = ping_timer.tick() => {
                if let Err(e) = write.send(Message::Ping(Vec::new().into())).await {
                    tracing::warn!(error = %e, "Failed to send ping");
                    return Disconnect::Dropped;
                }
            }
        }
    }
}

fn reconnect_delay(attempt: u32) -> Duration {
    let delay = BASE_RECONNECT_DELAY.saturating_mul(2u32.saturating_pow(attempt));
    delay.min(MAX_RECONNECT_DELAY)
}

/// Decode one text frame into zero or more trade events. Acks, heartbeats
/// and other topics yield nothing.
pub fn parse_message(text: &str) -> Vec<TradeEvent> {
    let message: LiveMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(_) => {
            tracing::trace!(raw = %text, "Non-JSON frame received");
            return Vec::new();
        }
    };
    if message.topic != "activity" || message.kind != "trades" {
        return Vec::new();
    }

    let trades: Vec<LiveTrade> = match message.payload {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        Some(value) => serde_json::from_value(value).ok().into_iter().collect(),
        None => Vec::new(),
    };

    trades.iter().map(convert_trade).collect()
}

/// Map a live-data trade onto the pipeline's event shape.
pub fn convert_trade(trade: &LiveTrade) -> TradeEvent {
    let mut event = TradeEvent::new(EventType::Trade);
    event.asset_id = trade.asset.clone();
    event.condition_id = trade.condition_id.clone();
    event.market_slug = trade.slug.clone();
    event.market_name = trade.title.clone();
    event.market_image = trade.icon.clone();
    event.event_slug = trade.event_slug.clone();
    event.event_title = trade.title.clone();
    if !trade.event_slug.is_empty() {
        event.market_link = format!("{}/{}", MARKET_URL_BASE, trade.event_slug);
    }
    event.timestamp = DateTime::from_timestamp(trade.timestamp, 0)
        .filter(|_| trade.timestamp > 0)
        .unwrap_or_else(Utc::now);
    event.price = trade.price.clone();
    event.size = trade.size.clone();
    event.side = Side::from_api_str(&trade.side);
    event.trade_id = fill_id(trade);
    event.wallet_address = trade.proxy_wallet.to_lowercase();
    event.trader_name = if trade.name.is_empty() {
        trade.pseudonym.clone()
    } else {
        trade.name.clone()
    };
    event.outcome = trade.outcome.clone();
    event.outcome_index = trade.outcome_index;
    event
}

/// One transaction can carry several fills, so the hash alone is not unique.
fn fill_id(trade: &LiveTrade) -> String {
    if trade.transaction_hash.is_empty() {
        return String::new();
    }
    format!(
        "{}_{}_{}",
        trade.transaction_hash, trade.asset, trade.outcome_index
    )
}
