/// 测试辅助：模拟上游服务与传输层

use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::{Config, PveConfig};
use crate::services::pve_client::{PveError, PveTransport};

/// 在随机端口上启动模拟的 Proxmox API，返回基地址
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// 测试配置：用户 box / 密码 purple123，数据目录为给定路径
pub fn test_config(data_dir: &Path) -> Config {
    Config {
        server_port: 0,
        log_level: "debug".to_string(),
        data_dir: data_dir.to_path_buf(),
        public_dir: data_dir.join("public"),
        dashboard_user: "box".to_string(),
        password_sha256: hex::encode(Sha256::digest(b"purple123")),
        session_salt: "salt123".to_string(),
        pve_timeout_secs: 5,
    }
}

pub fn pve_config(host: &str) -> PveConfig {
    PveConfig {
        host: host.to_string(),
        token_id: "root@pam!dash".to_string(),
        token_secret: "secret".to_string(),
        verify_ssl: true,
    }
}

/// 按路径返回预设结果的传输层
#[derive(Default)]
pub struct FakeTransport {
    responses: HashMap<String, Result<Value, PveError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, response: Result<Value, PveError>) -> Self {
        self.responses.insert(path.to_string(), response);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PveTransport for FakeTransport {
    async fn get(&self, path: &str) -> Result<Value, PveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .get(path)
            .cloned()
            .unwrap_or(Err(PveError::UpstreamStatus(404)))
    }
}
