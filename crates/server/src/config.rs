/// 配置管理

use common::models::constants::{DEFAULT_PVE_TIMEOUT_SECS, DEFAULT_SERVER_PORT};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub log_level: String,
    /// pve.json、domains.json 所在目录
    pub data_dir: PathBuf,
    /// 静态页面目录
    pub public_dir: PathBuf,
    pub dashboard_user: String,
    /// 登录密码的 SHA-256 十六进制摘要
    pub password_sha256: String,
    pub session_salt: String,
    pub pve_timeout_secs: u64,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
            .parse()?;

        let log_level = std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "debug".to_string());

        let data_dir = std::env::var("DATA_DIR")
            .unwrap_or_else(|_| "./data".to_string())
            .into();

        let public_dir = std::env::var("PUBLIC_DIR")
            .unwrap_or_else(|_| "./public".to_string())
            .into();

        let dashboard_user = std::env::var("DASHBOARD_USER")
            .unwrap_or_else(|_| "box".to_string());

        let password_sha256 = std::env::var("DASHBOARD_PASSWORD_SHA256")
            .map(|hash| hash.trim().to_lowercase())
            .unwrap_or_else(|_| default_password_sha256());

        let session_salt = std::env::var("SESSION_SALT")
            .unwrap_or_else(|_| "salt123".to_string());

        let pve_timeout_secs = std::env::var("PVE_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_PVE_TIMEOUT_SECS.to_string())
            .parse()?;

        Ok(Self {
            server_port,
            log_level,
            data_dir,
            public_dir,
            dashboard_user,
            password_sha256,
            session_salt,
            pve_timeout_secs,
        })
    }

    /// 是否仍在使用默认密码
    pub fn uses_default_password(&self) -> bool {
        self.password_sha256 == default_password_sha256()
    }

    /// Proxmox 连接配置文件路径
    pub fn pve_config_path(&self) -> PathBuf {
        self.data_dir.join("pve.json")
    }

    /// 书签域名列表文件路径
    pub fn domains_path(&self) -> PathBuf {
        self.data_dir.join("domains.json")
    }

    /// 会话密钥持久化文件路径
    pub fn session_store_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    /// 上游请求超时
    pub fn pve_timeout(&self) -> Duration {
        Duration::from_secs(self.pve_timeout_secs)
    }
}

fn default_password_sha256() -> String {
    hex::encode(Sha256::digest(b"change-me"))
}

/// Proxmox 连接配置
///
/// 每次轮询时重新从 pve.json 读取
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PveConfig {
    pub host: String,
    #[serde(alias = "tokenid")]
    pub token_id: String,
    #[serde(alias = "tokensecret")]
    pub token_secret: String,
    #[serde(default = "default_verify_ssl", alias = "verifyssl")]
    pub verify_ssl: bool,
}

fn default_verify_ssl() -> bool {
    true
}

impl PveConfig {
    /// 从 JSON 文件加载
    pub fn load(path: &Path) -> common::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Json)
                    .required(true),
            )
            .build()
            .map_err(|e| common::Error::Config(format!("读取 {} 失败: {}", path.display(), e)))?;

        let pve: PveConfig = settings
            .try_deserialize()
            .map_err(|e| common::Error::Config(format!("解析 {} 失败: {}", path.display(), e)))?;

        if pve.host.trim().is_empty() {
            return Err(common::Error::Config("host 不能为空".to_string()));
        }

        Ok(pve)
    }

    /// `Authorization` 请求头的值
    pub fn authorization(&self) -> String {
        format!("PVEAPIToken={}={}", self.token_id, self.token_secret)
    }
}

impl fmt::Debug for PveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PveConfig")
            .field("host", &self.host)
            .field("token_id", &self.token_id)
            .field("token_secret", &"[REDACTED]")
            .field("verify_ssl", &self.verify_ssl)
            .finish()
    }
}
