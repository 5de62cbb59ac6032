/// 书签域名服务
///
/// domains.json 以会话密钥为口令加密后下发，格式与 CryptoJS / OpenSSL 口令加密一致：
/// base64("Salted__" ‖ 8 字节盐 ‖ AES-256-CBC 密文)，密钥与 IV 由 EVP_BytesToKey(MD5) 派生

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};
use rand::RngCore;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const SALT_MAGIC: &[u8; 8] = b"Salted__";
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

pub struct DomainService {
    path: PathBuf,
}

impl DomainService {
    pub fn new(config: &Config) -> Self {
        Self {
            path: config.domains_path(),
        }
    }

    /// 读取域名列表
    pub async fn load_domains(&self) -> common::Result<Value> {
        let raw = tokio::fs::read(&self.path).await?;
        let domains: Value = serde_json::from_slice(&raw)?;
        Ok(domains)
    }

    /// 读取并加密域名列表
    pub async fn encrypted_domains(&self, session_key: &str) -> common::Result<String> {
        let domains = self.load_domains().await?;
        let plaintext = serde_json::to_vec(&domains)?;
        debug!("加密域名列表: {} 字节", plaintext.len());
        encrypt_envelope(&plaintext, session_key)
    }
}

/// EVP_BytesToKey：MD5，单次迭代
fn derive_key_iv(passphrase: &[u8], salt: &[u8]) -> ([u8; KEY_LEN], [u8; IV_LEN]) {
    let mut material = Vec::with_capacity(KEY_LEN + IV_LEN + 16);
    let mut block: Vec<u8> = Vec::new();

    while material.len() < KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&block);
        hasher.update(passphrase);
        hasher.update(salt);
        block = hasher.finalize().to_vec();
        material.extend_from_slice(&block);
    }

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    key.copy_from_slice(&material[..KEY_LEN]);
    iv.copy_from_slice(&material[KEY_LEN..KEY_LEN + IV_LEN]);
    (key, iv)
}

/// 加密，随机生成盐
pub fn encrypt_envelope(plaintext: &[u8], passphrase: &str) -> common::Result<String> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    seal(plaintext, passphrase, &salt)
}

fn seal(plaintext: &[u8], passphrase: &str, salt: &[u8; SALT_LEN]) -> common::Result<String> {
    let (key, iv) = derive_key_iv(passphrase.as_bytes(), salt);
    let ciphertext = Aes256CbcEnc::new_from_slices(&key, &iv)
        .map_err(|e| common::Error::Crypto(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut envelope = Vec::with_capacity(SALT_MAGIC.len() + SALT_LEN + ciphertext.len());
    envelope.extend_from_slice(SALT_MAGIC);
    envelope.extend_from_slice(salt);
    envelope.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(envelope))
}

/// 解密
pub fn decrypt_envelope(envelope: &str, passphrase: &str) -> common::Result<Vec<u8>> {
    let bytes = STANDARD
        .decode(envelope.trim())
        .map_err(|e| common::Error::Crypto(e.to_string()))?;

    let header = SALT_MAGIC.len() + SALT_LEN;
    if bytes.len() < header || &bytes[..SALT_MAGIC.len()] != SALT_MAGIC {
        return Err(common::Error::Crypto("缺少 Salted__ 头".to_string()));
    }
    let (salt, ciphertext) = bytes[SALT_MAGIC.len()..].split_at(SALT_LEN);

    let (key, iv) = derive_key_iv(passphrase.as_bytes(), salt);
    Aes256CbcDec::new_from_slices(&key, &iv)
        .map_err(|e| common::Error::Crypto(e.to_string()))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| common::Error::Crypto("解密失败".to_string()))
}
