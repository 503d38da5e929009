use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Live-data WebSocket (real-time activity feed)
// ---------------------------------------------------------------------------

pub const LIVE_DATA_WS_URL: &str = "wss://ws-live-data.polymarket.com";

/// One entry in a live-data subscribe request.
#[derive(Debug, Clone, Serialize)]
pub struct LiveSubscription {
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// `{"action": "subscribe", "subscriptions": [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct LiveSubscribe {
    pub action: String,
    pub subscriptions: Vec<LiveSubscription>,
}

impl LiveSubscribe {
    /// Every executed trade across all markets.
    pub fn activity_trades() -> Self {
        Self {
            action: "subscribe".into(),
            subscriptions: vec![LiveSubscription {
                topic: "activity".into(),
                kind: "trades".into(),
            }],
        }
    }
}

/// Envelope around every message the live-data service pushes.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveMessage {
    #[serde(default)]
    pub topic: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Payload of an `activity/trades` message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveTrade {
    pub asset: String,
    pub condition_id: String,
    pub event_slug: String,
    pub slug: String,
    pub title: String,
    pub icon: String,
    pub outcome: String,
    pub outcome_index: i32,
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
    #[serde(deserialize_with = "string_or_number")]
    pub size: String,
    pub side: String,
    pub proxy_wallet: String,
    pub name: String,
    pub pseudonym: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub transaction_hash: String,
}

/// The feed sends numeric fields either as JSON numbers or strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
