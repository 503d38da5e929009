use axum::extract::State;
use axum::Json;

use super::ApiResponse;
use crate::db::DatabaseInfo;
use crate::errors::AppError;
use crate::AppState;

pub async fn info(State(state): State<AppState>) -> Result<Json<ApiResponse<DatabaseInfo>>, AppError> {
    Ok(ApiResponse::ok(state.store.database_info().await?))
}
