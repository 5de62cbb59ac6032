/// 登录认证与会话密钥
///
/// 单用户：密码以 SHA-256 摘要比对，会话密钥由密码经 PBKDF2-HMAC-SHA256 派生。
/// 服务端只保存登录成功时派生出的会话密钥，并写入数据目录，重启后仍然有效。

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

/// PBKDF2 迭代次数
pub const SESSION_KEY_ITERATIONS: u32 = 1000;

/// 派生会话密钥（32 字节，十六进制编码）
pub fn derive_session_key(password: &str, salt: &str, iterations: u32) -> common::Result<String> {
    let prf = HmacSha256::new_from_slice(password.as_bytes())
        .map_err(|e| common::Error::Crypto(e.to_string()))?;

    // 输出长度等于摘要长度，只需计算第一个块
    let mut mac = prf.clone();
    mac.update(salt.as_bytes());
    mac.update(&1u32.to_be_bytes());
    let mut block = mac.finalize().into_bytes();
    let mut derived = block.clone();

    for _ in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&block);
        block = mac.finalize().into_bytes();
        derived
            .iter_mut()
            .zip(block.iter())
            .for_each(|(acc, b)| *acc ^= b);
    }

    Ok(hex::encode(derived))
}

/// 比对密码摘要
pub fn verify_password(password: &str, expected_sha256: &str) -> bool {
    let actual = hex::encode(Sha256::digest(password.as_bytes()));
    actual.as_bytes().ct_eq(expected_sha256.as_bytes()).into()
}

/// 持久化的会话密钥
///
/// 记录派生时的密码摘要与盐，配置变更后旧密钥自动失效
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    password_sha256: String,
    salt: String,
    session_key: String,
}

/// 认证器
#[derive(Clone)]
pub struct Authenticator {
    user: String,
    password_sha256: String,
    salt: String,
    /// 会话密钥文件
    store_path: PathBuf,
    /// 当前有效的会话密钥
    session_key: Arc<RwLock<Option<String>>>,
}

impl Authenticator {
    pub fn new(config: &Config) -> Self {
        let store_path = config.session_store_path();
        let session_key = load_session_key(&store_path, &config.password_sha256, &config.session_salt);
        if session_key.is_some() {
            info!("🔑 已恢复会话密钥: {}", store_path.display());
        }

        Self {
            user: config.dashboard_user.clone(),
            password_sha256: config.password_sha256.clone(),
            salt: config.session_salt.clone(),
            store_path,
            session_key: Arc::new(RwLock::new(session_key)),
        }
    }

    /// 登录，成功返回会话密钥
    pub async fn login(&self, username: &str, password: &str) -> common::Result<String> {
        let user_ok: bool = username.as_bytes().ct_eq(self.user.as_bytes()).into();
        if !user_ok || !verify_password(password, &self.password_sha256) {
            warn!("🔒 登录失败: 用户 {}", username);
            return Err(common::Error::Authentication("用户名或密码错误".to_string()));
        }

        let key = derive_session_key(password, &self.salt, SESSION_KEY_ITERATIONS)?;
        *self.session_key.write().await = Some(key.clone());

        // 写入失败不影响本次登录，只是重启后需要重新登录
        if let Err(e) = self.persist(&key).await {
            warn!("会话密钥写入失败 {}: {}", self.store_path.display(), e);
        }

        info!("🔓 用户 {} 登录成功", username);
        Ok(key)
    }

    /// 校验会话密钥
    pub async fn validate(&self, session_key: &str) -> bool {
        match self.session_key.read().await.as_deref() {
            Some(expected) => session_key.as_bytes().ct_eq(expected.as_bytes()).into(),
            None => false,
        }
    }

    async fn persist(&self, key: &str) -> common::Result<()> {
        let stored = StoredSession {
            password_sha256: self.password_sha256.clone(),
            salt: self.salt.clone(),
            session_key: key.to_string(),
        };
        if let Some(dir) = self.store_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.store_path, serde_json::to_vec(&stored)?).await?;
        Ok(())
    }
}

fn load_session_key(path: &Path, password_sha256: &str, salt: &str) -> Option<String> {
    let raw = std::fs::read(path).ok()?;
    let stored: StoredSession = match serde_json::from_slice(&raw) {
        Ok(stored) => stored,
        Err(e) => {
            warn!("会话密钥文件无法解析 {}: {}", path.display(), e);
            return None;
        }
    };

    if stored.password_sha256 != password_sha256 || stored.salt != salt {
        info!("密码或盐已变更，忽略旧的会话密钥");
        return None;
    }
    Some(stored.session_key)
}
