//! 账户数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// 会话凭证条目，`access` 固定为 "auth"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntry {
    pub access: String,
    pub token: String,
}

/// 账户（存储模型，包含密码哈希）
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// 账户唯一 ID (UUID)
    pub id: String,
    /// 邮箱（唯一，存储为小写）
    pub email: String,
    /// bcrypt 哈希后的密码
    pub password_hash: String,
    /// 邮箱是否已确认
    #[serde(default)]
    pub confirmed: bool,
    /// 活跃会话列表，插入顺序即签发顺序
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
    /// 显示名称
    pub display_name: Option<String>,
    /// 头像 URL
    pub avatar: Option<String>,
    /// 工作单位
    pub workplace: Option<String>,
    /// 所在地
    pub location: Option<String>,
    /// 注册时间
    pub signup_date: Option<DateTime<Utc>>,
    /// 最近一次签发会话令牌的时间
    pub last_login: Option<DateTime<Utc>>,
    /// 更新时间
    pub updated_at: Option<DateTime<Utc>>,
}

/// 注册请求
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub workplace: Option<String>,
    pub location: Option<String>,
}

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// 账户更新请求。任何修改都必须附带当前密码。
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    /// 当前密码（校验在 lifecycle 中执行）
    pub current_password: Option<String>,
    /// 新密码（可选）
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub workplace: Option<String>,
    pub location: Option<String>,
}

/// 账户更新结果
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// 仅更新了资料字段
    Profile(AccountSummary),
    /// 密码已修改，本次请求携带的会话令牌已撤销
    PasswordChanged,
}

/// 操作令牌用途
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// 邮箱确认（有效期 1 天）
    ConfirmEmail,
    /// 已登录用户改密（有效期 2 小时）
    ChangePasswordAuthenticated,
    /// 忘记密码改密（有效期 2 小时，附带邮箱声明）
    ChangePasswordForgotten,
}

/// 会话令牌 claims。不含过期时间，失效依赖会话集合的成员检查。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// 账户 ID
    pub sub: String,
    /// 固定为 "auth"
    pub access: String,
    /// 签发时间戳 (Unix timestamp)
    pub iat: i64,
}

/// 操作令牌 claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionClaims {
    /// 账户 ID
    pub sub: String,
    /// 令牌用途
    pub kind: ActionKind,
    /// 邮箱声明（仅 change-password-forgotten）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// 过期时间戳 (Unix timestamp)
    pub exp: i64,
    /// 签发时间戳 (Unix timestamp)
    pub iat: i64,
}

/// 账户公开投影（不含密码哈希与会话令牌）
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub email: String,
    pub confirmed: bool,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub workplace: Option<String>,
    pub location: Option<String>,
    pub signup_date: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            confirmed: account.confirmed,
            display_name: account.display_name,
            avatar: account.avatar,
            workplace: account.workplace,
            location: account.location,
            signup_date: account.signup_date,
            last_login: account.last_login,
        }
    }
}
