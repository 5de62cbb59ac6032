/// 登录接口

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

use super::ApiError;
use crate::app_state::AppState;

/// 登录请求
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub session_key: String,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// 登录，成功后返回会话密钥
pub async fn login(
    State(state): State<AppState>,
    Json(dto): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if let Err(e) = dto.validate() {
        warn!("登录请求参数校验失败: {}", e);
        return Err(ApiError::BadRequest("Missing username or password".to_string()));
    }

    let session_key = state
        .auth
        .login(&dto.username, &dto.password)
        .await
        .map_err(|_| ApiError::Unauthorized)?;

    Ok(Json(LoginResponse {
        success: true,
        session_key,
    }))
}
