/// 书签域名接口

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::error;

use super::ApiError;
use crate::{
    app_state::AppState,
    extractors::{SessionKey, SessionQuery},
};

#[derive(Debug, Serialize)]
pub struct DomainsResponse {
    /// base64("Salted__" ‖ 盐 ‖ 密文)，前端以会话密钥为口令解密
    pub data: String,
}

pub fn domain_routes() -> Router<AppState> {
    Router::new().route("/domains", get(get_domains))
}

/// 缺少 `sessionKey` 返回 400，密钥无效返回 401
pub async fn get_domains(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<DomainsResponse>, ApiError> {
    let key = query
        .session_key()
        .ok_or_else(|| ApiError::BadRequest("Missing sessionKey".to_string()))?;
    let SessionKey(session_key) = SessionKey::verify(&state, key).await?;

    let data = state
        .domain_service()
        .encrypted_domains(&session_key)
        .await
        .map_err(|e| {
            error!("读取域名列表失败: {}", e);
            ApiError::Internal("Failed to load domains".to_string())
        })?;

    Ok(Json(DomainsResponse { data }))
}
