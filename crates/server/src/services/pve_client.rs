/// Proxmox API 传输层
///
/// 发起带 API Token 认证的 GET 请求，处理超时、非 2xx 状态以及 `{ data: ... }` 包装

use async_trait::async_trait;
use common::utils::truncate_for_log;
use reqwest::{header::AUTHORIZATION, Url};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PveConfig;

/// 传输层错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PveError {
    #[error("无效的上游地址: {0}")]
    InvalidUrl(String),

    #[error("请求超时")]
    Timeout,

    #[error("网络错误: {0}")]
    Network(String),

    #[error("上游返回 HTTP {0}")]
    UpstreamStatus(u16),

    #[error("响应格式错误: {0}")]
    MalformedResponse(String),
}

/// Proxmox API 传输接口
#[async_trait]
pub trait PveTransport: Send + Sync {
    /// 请求相对路径，返回解包后的 JSON
    async fn get(&self, path: &str) -> Result<Value, PveError>;
}

/// 节点状态路径
pub fn node_status_path(node: &str) -> String {
    format!("/api2/json/nodes/{}/status", urlencoding::encode(node))
}

/// 解包上游响应：存在非 null 的 `data` 字段时取该字段，否则原样返回
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(|data| !data.is_null()) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// 基于 reqwest 的 Proxmox 客户端
///
/// 每次轮询创建一个，连接随轮询结束释放
pub struct PveClient {
    client: reqwest::Client,
    base: Url,
    authorization: String,
}

impl PveClient {
    pub fn new(config: &PveConfig, timeout: Duration) -> Result<Self, PveError> {
        let base = Url::parse(config.host.trim())
            .map_err(|e| PveError::InvalidUrl(format!("{}: {}", config.host, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| PveError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base,
            authorization: config.authorization(),
        })
    }
}

fn classify(err: reqwest::Error) -> PveError {
    if err.is_timeout() {
        PveError::Timeout
    } else {
        PveError::Network(err.to_string())
    }
}

#[async_trait]
impl PveTransport for PveClient {
    async fn get(&self, path: &str) -> Result<Value, PveError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| PveError::InvalidUrl(format!("{}: {}", path, e)))?;

        debug!("📤 PVE 请求: {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| {
                warn!("PVE 请求失败: {} ({})", url, e);
                classify(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("PVE 响应 {}: {}", status.as_u16(), url);
            return Err(PveError::UpstreamStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        let parsed: Value = serde_json::from_slice(&body).map_err(|e| {
            warn!(
                "PVE JSON 解析失败: {}",
                truncate_for_log(&String::from_utf8_lossy(&body), 200)
            );
            PveError::MalformedResponse(e.to_string())
        })?;

        Ok(unwrap_envelope(parsed))
    }
}
