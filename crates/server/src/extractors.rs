/// 请求提取器

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use tracing::debug;

use crate::{api::ApiError, app_state::AppState};

/// 已校验的会话密钥，来自查询参数 `sessionKey`
///
/// 作为提取器使用时，缺少或无效的密钥都返回 401
#[derive(Debug, Clone)]
pub struct SessionKey(pub String);

/// `?sessionKey=` 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionKey")]
    session_key: Option<String>,
}

impl SessionQuery {
    /// 非空的会话密钥
    pub fn session_key(self) -> Option<String> {
        self.session_key.filter(|key| !key.is_empty())
    }
}

impl SessionKey {
    /// 校验会话密钥
    pub async fn verify(state: &AppState, key: String) -> Result<Self, ApiError> {
        if !state.auth.validate(&key).await {
            debug!("会话密钥无效");
            return Err(ApiError::Unauthorized);
        }
        Ok(SessionKey(key))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SessionKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<SessionQuery>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Unauthorized)?;

        let key = query.session_key().ok_or(ApiError::Unauthorized)?;
        Self::verify(state, key).await
    }
}
