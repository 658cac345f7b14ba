//! 账户管理器：核心结构与账户持久化

use super::mailer::AccountMailer;
use super::models::Account;
use super::tokens::TokenCodec;
use crate::error::{AccountError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// 邮箱确认令牌默认有效期：1 天
const DEFAULT_CONFIRM_TTL: i64 = 24 * 3600;
/// 改密令牌默认有效期：2 小时
const DEFAULT_CHANGE_TTL: i64 = 2 * 3600;

/// 归一化邮箱，用于查找与唯一性判定
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 基本邮箱格式检查，入参需已归一化
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// 账户管理器
#[derive(Clone)]
pub struct AccountManager {
    /// 账户数据存储目录
    pub(super) data_dir: PathBuf,
    /// 令牌编解码器（双密钥）
    pub(super) tokens: TokenCodec,
    /// 邮件发送器
    pub(super) mailer: Arc<dyn AccountMailer>,
    /// 确认令牌有效期（秒）
    pub(super) confirm_token_ttl: i64,
    /// 改密令牌有效期（秒）
    pub(super) change_token_ttl: i64,
}

// ============================================================================
// 构造器和配置
// ============================================================================

impl AccountManager {
    /// 创建新的账户管理器
    pub fn new<P: AsRef<Path>>(
        data_dir: P,
        session_secret: impl Into<String>,
        action_secret: impl Into<String>,
        mailer: Arc<dyn AccountMailer>,
    ) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            tokens: TokenCodec::new(session_secret, action_secret),
            mailer,
            confirm_token_ttl: DEFAULT_CONFIRM_TTL,
            change_token_ttl: DEFAULT_CHANGE_TTL,
        }
    }

    /// 配置操作令牌有效期
    pub fn with_ttl(mut self, confirm_ttl: i64, change_ttl: i64) -> Self {
        self.confirm_token_ttl = confirm_ttl;
        self.change_token_ttl = change_ttl;
        self
    }
}

// ============================================================================
// 内部辅助方法
// ============================================================================

impl AccountManager {
    /// 持久化账户数据
    pub(super) fn persist_account(&self, account: &Account) -> Result<()> {
        let data = serde_json::to_vec_pretty(account)?;
        std::fs::write(self.account_path(&account.id), data)?;
        Ok(())
    }

    /// 邮箱索引文件路径
    fn index_path(&self) -> PathBuf {
        self.accounts_dir().join("index.json")
    }

    /// 加载邮箱 -> ID 索引
    pub(super) fn load_email_index(&self) -> HashMap<String, String> {
        let path = self.index_path();
        if let Ok(data) = fs::read(&path) {
            if let Ok(map) = serde_json::from_slice::<HashMap<String, String>>(&data) {
                return map;
            }
        }
        HashMap::new()
    }

    /// 保存邮箱索引
    pub(super) fn save_email_index(&self, index: &HashMap<String, String>) -> Result<()> {
        let data = serde_json::to_vec_pretty(index)?;
        fs::write(self.index_path(), data)?;
        Ok(())
    }

    /// 确保账户目录存在
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.accounts_dir())?;
        Ok(())
    }

    /// 账户存储目录
    fn accounts_dir(&self) -> PathBuf {
        self.data_dir.join("accounts")
    }

    /// 账户文件路径
    fn account_path(&self, id: &str) -> PathBuf {
        self.accounts_dir().join(format!("{}.json", id))
    }
}

// ============================================================================
// 账户查找
// ============================================================================

impl AccountManager {
    /// 获取账户
    #[instrument(skip(self))]
    pub async fn get_account(&self, id: &str) -> Result<Account> {
        let path = self.account_path(id);
        if !path.exists() {
            return Err(AccountError::NotFound(format!("account: {}", id)));
        }
        let data = std::fs::read(&path)?;
        let account: Account = serde_json::from_slice(&data)?;
        Ok(account)
    }

    /// 通过邮箱查找（大小写不敏感；优先使用索引，避免全量扫描）
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.ensure_dirs()?;
        let email = normalize_email(email);
        let index = self.load_email_index();

        // 优先从索引查找
        if let Some(id) = index.get(&email) {
            match self.get_account(id).await {
                Ok(account) => return Ok(Some(account)),
                Err(AccountError::NotFound(_)) => {
                    // 索引指向的账户不存在，需要清理索引
                    let mut index = index;
                    index.remove(&email);
                    let _ = self.save_email_index(&index);
                }
                Err(e) => return Err(e),
            }
        }

        // 索引中没有，逐个读取账户文件，找到匹配的邮箱即停止
        let dir = self.accounts_dir();
        if !dir.exists() {
            return Ok(None);
        }

        let entries = std::fs::read_dir(&dir)?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false)
                && path.file_stem().map(|s| s != "index").unwrap_or(true)
            {
                if let Ok(data) = std::fs::read(&path) {
                    if let Ok(account) = serde_json::from_slice::<Account>(&data) {
                        if account.email == email {
                            // 更新索引
                            let mut index = self.load_email_index();
                            index.insert(email, account.id.clone());
                            let _ = self.save_email_index(&index);
                            return Ok(Some(account));
                        }
                    }
                }
            }
        }

        Ok(None)
    }

    /// 列出所有账户
    #[instrument(skip(self))]
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.ensure_dirs()?;
        let mut accounts = Vec::new();

        let dir = self.accounts_dir();
        if dir.exists() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                // 跳过 index.json
                if path.file_stem().map(|s| s == "index").unwrap_or(false) {
                    continue;
                }
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    if let Ok(data) = std::fs::read(&path) {
                        if let Ok(account) = serde_json::from_slice::<Account>(&data) {
                            accounts.push(account);
                        }
                    }
                }
            }
        }

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::super::mailer::LogMailer;
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> AccountManager {
        AccountManager::new(dir.path(), "session-secret", "action-secret", Arc::new(LogMailer))
    }

    fn account(email: &str) -> Account {
        Account {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: "$2b$10$AAAAAAAAAAAAAAAAAAAAAA".to_string(),
            confirmed: false,
            sessions: Vec::new(),
            display_name: None,
            avatar: None,
            workplace: None,
            location: None,
            signup_date: Some(Utc::now()),
            last_login: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn find_by_email_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.ensure_dirs().unwrap();

        let stored = account("eva@example.com");
        manager.persist_account(&stored).unwrap();
        let mut index = manager.load_email_index();
        index.insert(stored.email.clone(), stored.id.clone());
        manager.save_email_index(&index).unwrap();

        let found = manager.find_by_email(" Eva@Example.COM ").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(stored.id));
    }

    #[tokio::test]
    async fn find_by_email_scan_repairs_missing_index() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.ensure_dirs().unwrap();

        // 只落盘账户文件，不写索引
        let stored = account("no-index@example.com");
        manager.persist_account(&stored).unwrap();

        let found = manager.find_by_email("no-index@example.com").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(stored.id.clone()));

        // 扫描命中后索引被回填
        let index = manager.load_email_index();
        assert_eq!(index.get("no-index@example.com"), Some(&stored.id));
    }

    #[tokio::test]
    async fn get_account_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.ensure_dirs().unwrap();
        let err = manager.get_account("missing").await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound(_)));
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("spaces in@example.com"));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }
}
