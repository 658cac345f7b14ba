//! 凭证生命周期：注册、确认、登录登出与改密流程

use super::crypto::{hash_password, verify_password};
use super::mailer::MailKind;
use super::manager::{normalize_email, valid_email, AccountManager};
use super::models::*;
use crate::error::{AccountError, Result};
use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::{info, instrument, warn};

/// 修剪首尾空白并检查密码长度（至少 6 个字符）。
/// 哈希的是修剪后的密码。
pub(super) fn acceptable_password(password: &str) -> Option<&str> {
    let trimmed = password.trim();
    (trimmed.len() >= 6).then_some(trimmed)
}

impl AccountManager {
    /// 校验操作令牌并匹配用途。所有失败对调用方折叠为同一种错误。
    fn verify_action_kind(&self, token: &str, kind: ActionKind) -> Result<ActionClaims> {
        let claims = self.tokens.verify_action(token).map_err(|e| {
            warn!(error = %e, "action token rejected");
            AccountError::InvalidOrExpiredToken
        })?;
        if claims.kind != kind {
            warn!("action token kind mismatch");
            return Err(AccountError::InvalidOrExpiredToken);
        }
        Ok(claims)
    }
}

// ============================================================================
// 注册与确认
// ============================================================================

impl AccountManager {
    /// 注册账户：校验邮箱与密码、检查唯一性、落盘并签发首个会话令牌。
    /// 确认邮件在注册成功后发出，发送失败不影响注册。
    #[instrument(skip(self, req))]
    pub async fn register(
        &self,
        req: RegisterRequest,
        hostname: &str,
    ) -> Result<(AccountSummary, String)> {
        self.ensure_dirs()?;

        let email = normalize_email(&req.email);
        if !valid_email(&email) {
            return Err(AccountError::Validation("invalid email address".into()));
        }
        let password = acceptable_password(&req.password).ok_or_else(|| {
            AccountError::Validation("password must be at least 6 characters".into())
        })?;

        // 邮箱唯一性（大小写不敏感）
        if self.find_by_email(&email).await?.is_some() {
            return Err(AccountError::DuplicateEmail);
        }

        let password_hash = hash_password(password).await?;

        let now = Utc::now();
        let mut account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            password_hash,
            confirmed: false,
            sessions: Vec::new(),
            display_name: req.display_name,
            avatar: req.avatar,
            workplace: req.workplace,
            location: req.location,
            signup_date: Some(now),
            last_login: None,
            updated_at: Some(now),
        };

        self.persist_account(&account)?;
        let mut index = self.load_email_index();
        index.insert(account.email.clone(), account.id.clone());
        self.save_email_index(&index)?;

        let token = self.add_session(&mut account).await?;

        let confirm = self.tokens.sign_action(
            &account.id,
            ActionKind::ConfirmEmail,
            None,
            self.confirm_token_ttl,
        )?;
        self.dispatch_mail(MailKind::Confirmation, &account, Some(&confirm), hostname);

        info!(account_id = %account.id, "registered account");
        Ok((AccountSummary::from(account), token))
    }

    /// 兑换邮箱确认令牌。重复确认无害，再次调用仍然成功。
    #[instrument(skip(self, action_token))]
    pub async fn confirm_email(&self, action_token: &str) -> Result<AccountSummary> {
        let claims = self.verify_action_kind(action_token, ActionKind::ConfirmEmail)?;

        let mut account = match self.get_account(&claims.sub).await {
            Ok(account) => account,
            Err(AccountError::NotFound(_)) => return Err(AccountError::InvalidOrExpiredToken),
            Err(e) => return Err(e),
        };

        account.confirmed = true;
        account.updated_at = Some(Utc::now());
        self.persist_account(&account)?;

        info!(account_id = %account.id, "email confirmed");
        Ok(AccountSummary::from(account))
    }

    /// 重发确认邮件。已确认的账户直接返回 `false`，不再发信。
    #[instrument(skip(self, account))]
    pub async fn resend_confirmation(&self, account: &Account, hostname: &str) -> Result<bool> {
        if account.confirmed {
            return Ok(false);
        }
        let confirm = self.tokens.sign_action(
            &account.id,
            ActionKind::ConfirmEmail,
            None,
            self.confirm_token_ttl,
        )?;
        self.dispatch_mail(MailKind::Confirmation, account, Some(&confirm), hostname);
        info!(account_id = %account.id, "confirmation email resent");
        Ok(true)
    }
}

// ============================================================================
// 登录与登出
// ============================================================================

impl AccountManager {
    /// 登录：查找邮箱并验证密码，成功则签发新会话令牌。
    /// 邮箱不存在与密码错误返回同一种错误，避免探测注册邮箱。
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(AccountSummary, String)> {
        let mut account = self
            .find_by_email(email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        let valid = verify_password(password, &account.password_hash).await?;
        if !valid {
            warn!(account_id = %account.id, "login failed: invalid password");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.add_session(&mut account).await?;
        info!(account_id = %account.id, "account logged in");
        Ok((AccountSummary::from(account), token))
    }

    /// 登出：仅撤销本次请求携带的会话令牌，其余会话保留
    #[instrument(skip(self, account, token))]
    pub async fn logout(&self, account: &mut Account, token: &str) -> Result<()> {
        self.revoke_sessions(account, Some(token)).await?;
        info!(account_id = %account.id, "account logged out");
        Ok(())
    }
}

// ============================================================================
// 账户更新与改密
// ============================================================================

impl AccountManager {
    /// 更新账户资料或密码。任何修改都必须提供当前密码。
    /// 修改了密码时撤销本次请求使用的会话令牌，其余会话保留。
    #[instrument(skip(self, account, session_token, req))]
    pub async fn update_account(
        &self,
        account: &mut Account,
        session_token: &str,
        req: UpdateAccountRequest,
    ) -> Result<UpdateOutcome> {
        let current = req.current_password.as_deref().unwrap_or("");
        if current.is_empty() || !verify_password(current, &account.password_hash).await? {
            warn!(account_id = %account.id, "update rejected: current password check failed");
            return Err(AccountError::WrongPassword);
        }

        let mut password_changed = false;
        if let Some(password) = req.password.as_deref() {
            let password = acceptable_password(password).ok_or_else(|| {
                AccountError::InvalidPassword("password must be at least 6 characters".into())
            })?;
            account.password_hash = hash_password(password).await?;
            password_changed = true;
        }

        if let Some(display_name) = req.display_name {
            account.display_name = Some(display_name);
        }
        if let Some(avatar) = req.avatar {
            account.avatar = Some(avatar);
        }
        if let Some(workplace) = req.workplace {
            account.workplace = Some(workplace);
        }
        if let Some(location) = req.location {
            account.location = Some(location);
        }

        if password_changed {
            self.revoke_sessions(account, Some(session_token)).await?;
            info!(account_id = %account.id, "password changed, presented session revoked");
            Ok(UpdateOutcome::PasswordChanged)
        } else {
            account.updated_at = Some(Utc::now());
            self.persist_account(account)?;
            info!(account_id = %account.id, "account profile updated");
            Ok(UpdateOutcome::Profile(AccountSummary::from(account.clone())))
        }
    }

    /// 发起改密请求（已登录）：签发改密令牌并通过邮件发出，不改动凭证状态
    #[instrument(skip(self, account))]
    pub async fn request_password_change(&self, account: &Account, hostname: &str) -> Result<()> {
        let token = self.tokens.sign_action(
            &account.id,
            ActionKind::ChangePasswordAuthenticated,
            None,
            self.change_token_ttl,
        )?;
        self.dispatch_mail(MailKind::AuthChangePassword, account, Some(&token), hostname);
        info!(account_id = %account.id, "password change email requested");
        Ok(())
    }

    /// 发起改密请求（忘记密码）。邮箱不存在时明确返回 NotFound，
    /// 与登录的失败口径刻意不同。
    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str, hostname: &str) -> Result<()> {
        let email = normalize_email(email);
        let account = self
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AccountError::NotFound(format!("account: {}", email)))?;

        let token = self.tokens.sign_action(
            &account.id,
            ActionKind::ChangePasswordForgotten,
            Some(&account.email),
            self.change_token_ttl,
        )?;
        self.dispatch_mail(
            MailKind::ForgottenChangePassword,
            &account,
            Some(&token),
            hostname,
        );
        info!(account_id = %account.id, "password reset email requested");
        Ok(())
    }

    /// 通过改密令牌改密（已登录路径）。
    /// 令牌必须属于当前会话账户，且必须再次验证当前密码。
    /// 成功后撤销本次请求使用的会话令牌并发送成功通知。
    #[instrument(skip(self, account, session_token, action_token, current_password, new_password))]
    pub async fn redeem_password_change(
        &self,
        account: &mut Account,
        session_token: &str,
        action_token: &str,
        current_password: Option<&str>,
        new_password: Option<&str>,
        hostname: &str,
    ) -> Result<()> {
        let claims =
            self.verify_action_kind(action_token, ActionKind::ChangePasswordAuthenticated)?;
        if claims.sub != account.id {
            warn!(account_id = %account.id, "action token bound to a different account");
            return Err(AccountError::InvalidOrExpiredToken);
        }

        let current = current_password.unwrap_or("");
        if current.is_empty() || !verify_password(current, &account.password_hash).await? {
            warn!(account_id = %account.id, "password change rejected: current password check failed");
            return Err(AccountError::WrongPassword);
        }

        let password = acceptable_password(new_password.unwrap_or("")).ok_or_else(|| {
            AccountError::InvalidPassword("password must be at least 6 characters".into())
        })?;

        account.password_hash = hash_password(password).await?;
        self.revoke_sessions(account, Some(session_token)).await?;
        self.dispatch_mail(MailKind::ChangeSuccess, account, None, hostname);

        info!(account_id = %account.id, "password changed via action token");
        Ok(())
    }

    /// 通过改密令牌改密（忘记密码路径）。
    /// 请求中的邮箱必须格式合法且与令牌声明一致；不要求当前密码，
    /// 也不触碰既有会话。
    #[instrument(skip(self, action_token, new_password))]
    pub async fn redeem_password_reset(
        &self,
        action_token: &str,
        email: &str,
        new_password: Option<&str>,
        hostname: &str,
    ) -> Result<()> {
        let claims = self.verify_action_kind(action_token, ActionKind::ChangePasswordForgotten)?;

        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(AccountError::Validation("invalid email address".into()));
        }
        let claim_email = claims.email.as_deref().unwrap_or("");
        if !bool::from(claim_email.as_bytes().ct_eq(email.as_bytes())) {
            warn!("password reset rejected: email does not match token claim");
            return Err(AccountError::InvalidOrExpiredToken);
        }

        let password = acceptable_password(new_password.unwrap_or("")).ok_or_else(|| {
            AccountError::InvalidPassword("password must be at least 6 characters".into())
        })?;

        let mut account = match self.get_account(&claims.sub).await {
            Ok(account) => account,
            Err(AccountError::NotFound(_)) => return Err(AccountError::InvalidOrExpiredToken),
            Err(e) => return Err(e),
        };

        account.password_hash = hash_password(password).await?;
        account.updated_at = Some(Utc::now());
        self.persist_account(&account)?;
        self.dispatch_mail(MailKind::ChangeSuccess, &account, None, hostname);

        info!(account_id = %account.id, "password reset via email token");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::mailer::{AccountMail, AccountMailer, MailKind};
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<AccountMail>>,
    }

    impl RecordingMailer {
        fn kinds(&self) -> Vec<MailKind> {
            self.sent.lock().unwrap().iter().map(|m| m.kind).collect()
        }

        fn last(&self) -> Option<AccountMail> {
            self.sent.lock().unwrap().last().cloned()
        }
    }

    impl AccountMailer for RecordingMailer {
        fn send(&self, mail: &AccountMail) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    fn manager(dir: &TempDir) -> (AccountManager, Arc<RecordingMailer>) {
        let mailer = Arc::new(RecordingMailer::default());
        let manager = AccountManager::new(
            dir.path(),
            "session-secret",
            "action-secret",
            mailer.clone(),
        );
        (manager, mailer)
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
            display_name: Some("Eva".into()),
            avatar: None,
            workplace: None,
            location: None,
        }
    }

    /// 从邮件正文的链接中截取令牌
    fn token_from_body(body: &str, marker: &str) -> String {
        let tail = body.split(marker).nth(1).expect("link in mail body");
        tail.split(|c: char| c.is_whitespace() || c == '?')
            .next()
            .expect("token in link")
            .to_string()
    }

    /// 会话令牌的 iat 以秒计，隔开一秒再开第二个会话，令牌才保证互不相同
    async fn next_second() {
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    }

    #[tokio::test]
    async fn register_returns_resolving_session_token() {
        let dir = TempDir::new().unwrap();
        let (manager, mailer) = manager(&dir);

        let (summary, token) = manager
            .register(register_req("A@B.com", "123abc!"), "care.local")
            .await
            .unwrap();
        assert_eq!(summary.email, "a@b.com");
        assert!(!summary.confirmed);

        let account = manager.find_by_session_token(&token).await.unwrap();
        assert_eq!(account.id, summary.id);
        assert_eq!(account.sessions.len(), 1);
        assert_eq!(mailer.kinds(), vec![MailKind::Confirmation]);
    }

    #[tokio::test]
    async fn register_rejects_bad_email_and_short_password() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let err = manager
            .register(register_req("not-an-email", "123abc!"), "care.local")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));

        // 长度在修剪之后再检查
        let err = manager
            .register(register_req("a@b.com", "  123  "), "care.local")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));
    }

    #[tokio::test]
    async fn register_hashes_trimmed_password() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        manager
            .register(register_req("a@b.com", "  123abc!  "), "care.local")
            .await
            .unwrap();
        // 登录校验的是存储哈希对应的修剪后密码
        assert!(manager.login("a@b.com", "123abc!").await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let err = manager
            .register(register_req(" A@B.COM ", "other-pass"), "care.local")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::DuplicateEmail));

        // 第一个账户不受影响
        let accounts = manager.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert!(manager.login("a@b.com", "123abc!").await.is_ok());
    }

    #[tokio::test]
    async fn login_mints_additional_session_and_updates_last_login() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (summary, first) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let before = manager.get_account(&summary.id).await.unwrap().last_login;

        let (_, second) = manager.login("a@b.com", "123abc!").await.unwrap();
        let account = manager.get_account(&summary.id).await.unwrap();
        assert_eq!(account.sessions.len(), 2);
        assert!(account.last_login >= before);

        // 两个会话各自可用
        assert!(manager.find_by_session_token(&first).await.is_ok());
        assert!(manager.find_by_session_token(&second).await.is_ok());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();

        let wrong_password = manager.login("a@b.com", "wrong-pass").await.unwrap_err();
        let unknown_email = manager.login("ghost@b.com", "123abc!").await.unwrap_err();
        assert!(matches!(wrong_password, AccountError::InvalidCredentials));
        assert!(matches!(unknown_email, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn logout_revokes_only_the_presented_token() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (_, first) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        next_second().await;
        let (_, second) = manager.login("a@b.com", "123abc!").await.unwrap();

        let mut account = manager.find_by_session_token(&first).await.unwrap();
        manager.logout(&mut account, &first).await.unwrap();

        assert!(manager.find_by_session_token(&first).await.is_err());
        assert!(manager.find_by_session_token(&second).await.is_ok());
    }

    #[tokio::test]
    async fn revoked_token_fails_despite_valid_signature() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (_, token) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let mut account = manager.find_by_session_token(&token).await.unwrap();
        manager.logout(&mut account, &token).await.unwrap();

        // 签名依旧有效，但令牌已不在会话集合中
        assert!(manager.tokens.verify_session(&token).is_ok());
        let err = manager.find_by_session_token(&token).await.unwrap_err();
        assert!(matches!(err, AccountError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn confirm_email_sets_flag_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (summary, _) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let token = manager
            .tokens
            .sign_action(&summary.id, ActionKind::ConfirmEmail, None, 3600)
            .unwrap();

        let confirmed = manager.confirm_email(&token).await.unwrap();
        assert!(confirmed.confirmed);

        // 重复确认仍然成功
        let again = manager.confirm_email(&token).await.unwrap();
        assert!(again.confirmed);
    }

    #[tokio::test]
    async fn confirm_email_accepts_the_dispatched_link_token() {
        let dir = TempDir::new().unwrap();
        let (manager, mailer) = manager(&dir);

        let (summary, _) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let mail = mailer.last().unwrap();
        let token = token_from_body(&mail.body, "/api/accounts/activation/");

        manager.confirm_email(&token).await.unwrap();
        assert!(manager.get_account(&summary.id).await.unwrap().confirmed);
    }

    #[tokio::test]
    async fn confirm_email_rejects_wrong_kind_and_garbage() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (summary, _) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let wrong_kind = manager
            .tokens
            .sign_action(
                &summary.id,
                ActionKind::ChangePasswordForgotten,
                Some("a@b.com"),
                3600,
            )
            .unwrap();

        let err = manager.confirm_email(&wrong_kind).await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidOrExpiredToken));
        let err = manager.confirm_email("garbage").await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidOrExpiredToken));
        assert!(!manager.get_account(&summary.id).await.unwrap().confirmed);
    }

    #[tokio::test]
    async fn resend_confirmation_skips_confirmed_accounts() {
        let dir = TempDir::new().unwrap();
        let (manager, mailer) = manager(&dir);

        let (summary, _) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let account = manager.get_account(&summary.id).await.unwrap();

        assert!(manager
            .resend_confirmation(&account, "care.local")
            .await
            .unwrap());
        assert_eq!(
            mailer.kinds(),
            vec![MailKind::Confirmation, MailKind::Confirmation]
        );

        let token = manager
            .tokens
            .sign_action(&summary.id, ActionKind::ConfirmEmail, None, 3600)
            .unwrap();
        manager.confirm_email(&token).await.unwrap();
        let account = manager.get_account(&summary.id).await.unwrap();

        assert!(!manager
            .resend_confirmation(&account, "care.local")
            .await
            .unwrap());
        // 已确认账户不再发信
        assert_eq!(mailer.kinds().len(), 2);
    }

    #[tokio::test]
    async fn update_requires_the_current_password() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (_, token) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let mut account = manager.find_by_session_token(&token).await.unwrap();

        let req = UpdateAccountRequest {
            display_name: Some("Someone".into()),
            ..Default::default()
        };
        let err = manager
            .update_account(&mut account, &token, req)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::WrongPassword));

        let req = UpdateAccountRequest {
            current_password: Some("wrong-pass".into()),
            display_name: Some("Someone".into()),
            ..Default::default()
        };
        let mut account = manager.find_by_session_token(&token).await.unwrap();
        let err = manager
            .update_account(&mut account, &token, req)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::WrongPassword));

        // 凭证未被改动
        assert!(manager.login("a@b.com", "123abc!").await.is_ok());
    }

    #[tokio::test]
    async fn update_profile_keeps_sessions_alive() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (_, token) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let mut account = manager.find_by_session_token(&token).await.unwrap();

        let req = UpdateAccountRequest {
            current_password: Some("123abc!".into()),
            display_name: Some("Dr. Eva".into()),
            workplace: Some("Clinic".into()),
            ..Default::default()
        };
        let outcome = manager
            .update_account(&mut account, &token, req)
            .await
            .unwrap();

        match outcome {
            UpdateOutcome::Profile(summary) => {
                assert_eq!(summary.display_name.as_deref(), Some("Dr. Eva"));
                assert_eq!(summary.workplace.as_deref(), Some("Clinic"));
            }
            UpdateOutcome::PasswordChanged => panic!("profile update must not change password"),
        }
        assert!(manager.find_by_session_token(&token).await.is_ok());
    }

    #[tokio::test]
    async fn update_password_revokes_presented_session_only() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (_, first) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        next_second().await;
        let (_, second) = manager.login("a@b.com", "123abc!").await.unwrap();
        let mut account = manager.find_by_session_token(&first).await.unwrap();

        let req = UpdateAccountRequest {
            current_password: Some("123abc!".into()),
            password: Some("  fresh-pass9  ".into()),
            ..Default::default()
        };
        let outcome = manager
            .update_account(&mut account, &first, req)
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::PasswordChanged));

        assert!(manager.find_by_session_token(&first).await.is_err());
        assert!(manager.find_by_session_token(&second).await.is_ok());

        // 新密码按修剪后的形式生效
        assert!(manager.login("a@b.com", "fresh-pass9").await.is_ok());
        assert!(manager.login("a@b.com", "123abc!").await.is_err());
    }

    #[tokio::test]
    async fn update_rejects_short_new_password() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (_, token) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let mut account = manager.find_by_session_token(&token).await.unwrap();

        let req = UpdateAccountRequest {
            current_password: Some("123abc!".into()),
            password: Some("short".into()),
            ..Default::default()
        };
        let err = manager
            .update_account(&mut account, &token, req)
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidPassword(_)));
        assert!(manager.login("a@b.com", "123abc!").await.is_ok());
    }

    #[tokio::test]
    async fn password_change_requests_send_the_right_links() {
        let dir = TempDir::new().unwrap();
        let (manager, mailer) = manager(&dir);

        let (summary, _) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let account = manager.get_account(&summary.id).await.unwrap();

        manager
            .request_password_change(&account, "care.local")
            .await
            .unwrap();
        let mail = mailer.last().unwrap();
        assert_eq!(mail.kind, MailKind::AuthChangePassword);
        assert!(mail
            .body
            .contains("http://care.local/api/accounts/auth-change-password/"));

        manager
            .request_password_reset("a@b.com", "care.local")
            .await
            .unwrap();
        let mail = mailer.last().unwrap();
        assert_eq!(mail.kind, MailKind::ForgottenChangePassword);
        assert!(mail
            .body
            .contains("http://care.local/api/accounts/change-password/"));
        assert!(mail.body.contains("?email=a%40b.com"));
    }

    #[tokio::test]
    async fn password_reset_request_reveals_unknown_email() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let err = manager
            .request_password_reset("ghost@b.com", "care.local")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::NotFound(_)));
    }

    #[tokio::test]
    async fn redeem_password_change_happy_path() {
        let dir = TempDir::new().unwrap();
        let (manager, mailer) = manager(&dir);

        let (summary, first) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        next_second().await;
        let (_, second) = manager.login("a@b.com", "123abc!").await.unwrap();
        let action = manager
            .tokens
            .sign_action(
                &summary.id,
                ActionKind::ChangePasswordAuthenticated,
                None,
                3600,
            )
            .unwrap();

        let mut account = manager.find_by_session_token(&first).await.unwrap();
        manager
            .redeem_password_change(
                &mut account,
                &first,
                &action,
                Some("123abc!"),
                Some("fresh-pass9"),
                "care.local",
            )
            .await
            .unwrap();

        assert!(manager.find_by_session_token(&first).await.is_err());
        assert!(manager.find_by_session_token(&second).await.is_ok());
        assert!(manager.login("a@b.com", "fresh-pass9").await.is_ok());
        assert_eq!(mailer.last().unwrap().kind, MailKind::ChangeSuccess);
    }

    #[tokio::test]
    async fn redeem_password_change_guards_proofs() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (summary, token) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let action = manager
            .tokens
            .sign_action(
                &summary.id,
                ActionKind::ChangePasswordAuthenticated,
                None,
                3600,
            )
            .unwrap();

        // 缺少当前密码
        let mut account = manager.find_by_session_token(&token).await.unwrap();
        let err = manager
            .redeem_password_change(&mut account, &token, &action, None, Some("fresh-pass9"), "h")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::WrongPassword));

        // 当前密码错误
        let mut account = manager.find_by_session_token(&token).await.unwrap();
        let err = manager
            .redeem_password_change(
                &mut account,
                &token,
                &action,
                Some("wrong-pass"),
                Some("fresh-pass9"),
                "h",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::WrongPassword));

        // 令牌属于其他账户
        let foreign = manager
            .tokens
            .sign_action(
                "someone-else",
                ActionKind::ChangePasswordAuthenticated,
                None,
                3600,
            )
            .unwrap();
        let mut account = manager.find_by_session_token(&token).await.unwrap();
        let err = manager
            .redeem_password_change(
                &mut account,
                &token,
                &foreign,
                Some("123abc!"),
                Some("fresh-pass9"),
                "h",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidOrExpiredToken));

        // 用途不符的令牌
        let wrong_kind = manager
            .tokens
            .sign_action(&summary.id, ActionKind::ConfirmEmail, None, 3600)
            .unwrap();
        let mut account = manager.find_by_session_token(&token).await.unwrap();
        let err = manager
            .redeem_password_change(
                &mut account,
                &token,
                &wrong_kind,
                Some("123abc!"),
                Some("fresh-pass9"),
                "h",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidOrExpiredToken));

        // 密码始终未被改动
        assert!(manager.login("a@b.com", "123abc!").await.is_ok());
    }

    #[tokio::test]
    async fn redeem_password_reset_happy_path_keeps_sessions() {
        let dir = TempDir::new().unwrap();
        let (manager, mailer) = manager(&dir);

        let (summary, token) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let action = manager
            .tokens
            .sign_action(
                &summary.id,
                ActionKind::ChangePasswordForgotten,
                Some("a@b.com"),
                3600,
            )
            .unwrap();

        manager
            .redeem_password_reset(&action, " A@B.com ", Some("fresh-pass9"), "care.local")
            .await
            .unwrap();

        // 既有会话不受影响
        assert!(manager.find_by_session_token(&token).await.is_ok());
        assert!(manager.login("a@b.com", "fresh-pass9").await.is_ok());
        assert_eq!(mailer.last().unwrap().kind, MailKind::ChangeSuccess);
    }

    #[tokio::test]
    async fn redeem_password_reset_cross_checks_the_email_claim() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (summary, _) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let action = manager
            .tokens
            .sign_action(
                &summary.id,
                ActionKind::ChangePasswordForgotten,
                Some("a@b.com"),
                3600,
            )
            .unwrap();

        // 查询参数邮箱与令牌声明不一致
        let err = manager
            .redeem_password_reset(&action, "other@b.com", Some("fresh-pass9"), "h")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidOrExpiredToken));

        // 查询参数邮箱格式不合法
        let err = manager
            .redeem_password_reset(&action, "not-an-email", Some("fresh-pass9"), "h")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Validation(_)));

        // 新密码过短
        let err = manager
            .redeem_password_reset(&action, "a@b.com", Some("tiny"), "h")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidPassword(_)));

        assert!(manager.login("a@b.com", "123abc!").await.is_ok());
    }

    #[tokio::test]
    async fn expired_action_token_leaves_password_unchanged() {
        let dir = TempDir::new().unwrap();
        let (manager, _) = manager(&dir);

        let (summary, _) = manager
            .register(register_req("a@b.com", "123abc!"), "care.local")
            .await
            .unwrap();
        let expired = manager
            .tokens
            .sign_action(
                &summary.id,
                ActionKind::ChangePasswordForgotten,
                Some("a@b.com"),
                -10,
            )
            .unwrap();

        let err = manager
            .redeem_password_reset(&expired, "a@b.com", Some("fresh-pass9"), "h")
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidOrExpiredToken));
        assert!(manager.login("a@b.com", "123abc!").await.is_ok());
        assert!(manager.login("a@b.com", "fresh-pass9").await.is_err());
    }
}
