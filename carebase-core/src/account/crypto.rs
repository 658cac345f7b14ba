//! 密码哈希工具函数

use crate::error::{AccountError, Result};
use bcrypt::{hash, verify};

/// bcrypt 工作因子，与既有存量数据保持一致
const HASH_COST: u32 = 10;

/// 异步哈希密码（在阻塞线程中执行 bcrypt），每次生成随机盐
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash(&password, HASH_COST))
        .await
        .map_err(|e| AccountError::Other(format!("spawn_blocking failed: {}", e)))?
        .map_err(|e| AccountError::Other(format!("bcrypt hash failed: {}", e)))
}

/// 异步验证密码（在阻塞线程中执行 bcrypt）。
/// 哈希格式不合法按不匹配处理，而不是报错。
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || verify(&password, &hash))
        .await
        .map_err(|e| AccountError::Other(format!("spawn_blocking failed: {}", e)))?
        .unwrap_or(false);
    Ok(verified)
}
