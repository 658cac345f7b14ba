//! 会话管理：签发、解析与撤销会话令牌

use super::manager::AccountManager;
use super::models::{Account, SessionEntry};
use super::tokens::SESSION_ACCESS;
use crate::error::{AccountError, Result};
use chrono::Utc;
use tracing::{instrument, warn};

impl AccountManager {
    /// 签发新会话令牌：追加到会话列表、更新 last_login 并落盘。
    /// 同一账户允许多个并发会话。
    pub(super) async fn add_session(&self, account: &mut Account) -> Result<String> {
        let token = self.tokens.sign_session(&account.id)?;
        account.sessions.push(SessionEntry {
            access: SESSION_ACCESS.to_string(),
            token: token.clone(),
        });
        let now = Utc::now();
        account.last_login = Some(now);
        account.updated_at = Some(now);
        self.persist_account(account)?;
        Ok(token)
    }

    /// 通过会话令牌解析账户。
    /// 签名有效还不够：令牌必须仍在账户的会话列表中，撤销后立即失效。
    #[instrument(skip(self, token))]
    pub async fn find_by_session_token(&self, token: &str) -> Result<Account> {
        let claims = self.tokens.verify_session(token).map_err(|e| {
            warn!(error = %e, "session token rejected");
            AccountError::Unauthorized("invalid session token".into())
        })?;

        let account = match self.get_account(&claims.sub).await {
            Ok(account) => account,
            Err(AccountError::NotFound(_)) => {
                return Err(AccountError::Unauthorized("invalid session token".into()));
            }
            Err(e) => return Err(e),
        };

        if !account.sessions.iter().any(|s| s.token == token) {
            warn!(account_id = %account.id, "session token not in active set");
            return Err(AccountError::Unauthorized("session revoked".into()));
        }

        Ok(account)
    }

    /// 撤销会话：给定令牌时仅移除匹配项，`None` 时清空全部会话
    pub(super) async fn revoke_sessions(
        &self,
        account: &mut Account,
        token: Option<&str>,
    ) -> Result<()> {
        match token {
            Some(t) => account.sessions.retain(|s| s.token != t),
            None => account.sessions.clear(),
        }
        account.updated_at = Some(Utc::now());
        self.persist_account(account)?;
        Ok(())
    }
}
