use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::ApiResponse;
use crate::errors::AppError;
use crate::models::WalletProfile;
use crate::AppState;

const DEFAULT_WALLET_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<WalletQuery>,
) -> Result<Json<ApiResponse<Vec<WalletProfile>>>, AppError> {
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_WALLET_LIMIT);
    let wallets = state.store.get_all_wallets(limit).await?;
    Ok(ApiResponse::ok(wallets))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<WalletProfile>>, AppError> {
    let address = address.to_lowercase();
    match state.store.get_wallet(&address).await? {
        Some(profile) => Ok(ApiResponse::ok(profile)),
        None => Err(AppError::NotFound(format!("wallet {address}"))),
    }
}
