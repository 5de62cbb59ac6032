/// Proxmox 集群状态接口

use axum::{extract::State, routing::get, Json, Router};
use common::ClusterSnapshot;
use serde::Serialize;

use super::ApiError;
use crate::{app_state::AppState, extractors::SessionKey};

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub data: ClusterSnapshot,
}

pub fn pve_routes() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

/// 获取集群状态快照
///
/// 每次请求都会触发一次上游轮询；并发请求共享同一次轮询。
pub async fn get_status(
    State(state): State<AppState>,
    _session: SessionKey,
) -> Result<Json<StatusResponse>, ApiError> {
    let snapshot = state
        .poll_guard
        .poll()
        .await
        .map_err(|e| ApiError::Internal(e.public_message().to_string()))?;

    Ok(Json(StatusResponse {
        success: true,
        data: snapshot,
    }))
}
