//! 账户邮件：消息组装与投递抽象。
//!
//! lifecycle 只负责组装消息并交给注入的 `AccountMailer`；投递失败由本模块
//! 记录日志后吞掉，绝不影响外层的账户变更。本地开发与测试用 `LogMailer`。

use super::manager::AccountManager;
use super::models::Account;
use std::fmt;
use tracing::{info, warn};

/// 邮件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    /// 邮箱确认
    Confirmation,
    /// 已登录改密链接
    AuthChangePassword,
    /// 忘记密码改密链接
    ForgottenChangePassword,
    /// 改密成功通知
    ChangeSuccess,
}

impl fmt::Display for MailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MailKind::Confirmation => "confirmation",
            MailKind::AuthChangePassword => "auth-change-password",
            MailKind::ForgottenChangePassword => "forgotten-change-password",
            MailKind::ChangeSuccess => "change-success",
        };
        f.write_str(s)
    }
}

/// 组装完成的账户邮件
#[derive(Debug, Clone)]
pub struct AccountMail {
    pub kind: MailKind,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// 邮件投递抽象。实现方决定投递方式（SMTP、API 等）。
pub trait AccountMailer: Send + Sync {
    /// 投递一封邮件，失败返回错误
    fn send(&self, mail: &AccountMail) -> anyhow::Result<()>;
}

/// 本地开发用发送器：只写日志并返回 Ok
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

impl AccountMailer for LogMailer {
    fn send(&self, mail: &AccountMail) -> anyhow::Result<()> {
        info!(
            kind = %mail.kind,
            to = %mail.to,
            subject = %mail.subject,
            "account email send stub"
        );
        Ok(())
    }
}

/// 组装邮件正文与链接。确认与已登录改密链接把令牌作为路径段，
/// 忘记密码链接额外附带邮箱查询参数供服务端与令牌声明交叉校验。
pub(super) fn compose_mail(
    kind: MailKind,
    account: &Account,
    action_token: Option<&str>,
    hostname: &str,
) -> AccountMail {
    let token = action_token.unwrap_or("");
    let greeting = account.display_name.as_deref().unwrap_or(&account.email);
    let (subject, body) = match kind {
        MailKind::Confirmation => (
            "Confirm your account".to_string(),
            format!(
                "Hello {}!\n\nPlease confirm your email address by following this link:\n\
                 http://{}/api/accounts/activation/{}\n\n\
                 The link is valid for 24 hours.",
                greeting, hostname, token
            ),
        ),
        MailKind::AuthChangePassword => (
            "Change your password".to_string(),
            format!(
                "Hello {}!\n\nFollow this link to change your password:\n\
                 http://{}/api/accounts/auth-change-password/{}\n\n\
                 The link is valid for 2 hours. If you did not request this, you can ignore this email.",
                greeting, hostname, token
            ),
        ),
        MailKind::ForgottenChangePassword => (
            "Reset your password".to_string(),
            format!(
                "Hello {}!\n\nFollow this link to set a new password:\n\
                 http://{}/api/accounts/change-password/{}?email={}\n\n\
                 The link is valid for 2 hours. If you did not request this, you can ignore this email.",
                greeting,
                hostname,
                token,
                urlencoding::encode(&account.email)
            ),
        ),
        MailKind::ChangeSuccess => (
            "Your password was changed".to_string(),
            format!(
                "Hello {}!\n\nYour password was changed successfully.\n\
                 If this wasn't you, reset your password immediately.",
                greeting
            ),
        ),
    };

    AccountMail {
        kind,
        to: account.email.clone(),
        subject,
        body,
    }
}

impl AccountManager {
    /// 组装并发送账户邮件；失败仅记录日志
    pub(super) fn dispatch_mail(
        &self,
        kind: MailKind,
        account: &Account,
        action_token: Option<&str>,
        hostname: &str,
    ) {
        let mail = compose_mail(kind, account, action_token, hostname);
        if let Err(err) = self.mailer.send(&mail) {
            warn!(
                account_id = %account.id,
                kind = %mail.kind,
                error = %err,
                "failed to send account email"
            );
        }
    }
}
