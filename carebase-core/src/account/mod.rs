//! 账户认证与凭证生命周期模块

mod crypto;
mod lifecycle;
mod mailer;
mod manager;
mod models;
mod sessions;
mod tokens;

pub use mailer::{AccountMail, AccountMailer, LogMailer, MailKind};
pub use manager::AccountManager;
pub use models::{
    Account, AccountSummary, LoginRequest, RegisterRequest, SessionEntry, UpdateAccountRequest,
    UpdateOutcome,
};
