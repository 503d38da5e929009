pub mod database;
pub mod events;
pub mod health;
pub mod metrics;
pub mod settings;
pub mod wallets;
pub mod ws;

use axum::Json;
use serde::Serialize;

/// Envelope for every JSON API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}
