//! 签名令牌编解码：会话令牌与操作令牌使用相互独立的密钥

use super::models::{ActionClaims, ActionKind, SessionClaims};
use crate::error::{AccountError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

/// 会话令牌固定的 access 声明
pub(super) const SESSION_ACCESS: &str = "auth";

/// 令牌校验失败原因
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    }
}

/// 双密钥令牌编解码器。泄露操作令牌密钥不应危及会话，反之亦然。
#[derive(Debug, Clone)]
pub struct TokenCodec {
    /// 会话令牌签名密钥
    session_secret: String,
    /// 操作令牌签名密钥
    action_secret: String,
}

impl TokenCodec {
    pub fn new(session_secret: impl Into<String>, action_secret: impl Into<String>) -> Self {
        Self {
            session_secret: session_secret.into(),
            action_secret: action_secret.into(),
        }
    }

    /// 签发会话令牌。不带过期时间，失效由会话集合的成员检查决定。
    pub fn sign_session(&self, account_id: &str) -> Result<String> {
        let claims = SessionClaims {
            sub: account_id.to_string(),
            access: SESSION_ACCESS.to_string(),
            iat: Utc::now().timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.session_secret.as_bytes()),
        )
        .map_err(|e| AccountError::Other(format!("jwt encode failed: {}", e)))
    }

    /// 签发操作令牌：绑定账户、用途与过期时间，忘记密码用途附带邮箱声明
    pub fn sign_action(
        &self,
        account_id: &str,
        kind: ActionKind,
        email: Option<&str>,
        ttl_secs: i64,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = ActionClaims {
            sub: account_id.to_string(),
            kind,
            email: email.map(|e| e.to_string()),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.action_secret.as_bytes()),
        )
        .map_err(|e| AccountError::Other(format!("jwt encode failed: {}", e)))
    }

    /// 校验会话令牌签名并返回 claims。签名先于任何声明被检查。
    pub fn verify_session(&self, token: &str) -> std::result::Result<SessionClaims, TokenError> {
        let mut validation = Validation::default();
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.session_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| map_jwt_error(&e))?;

        if data.claims.access != SESSION_ACCESS {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }

    /// 校验操作令牌签名与过期时间并返回 claims。过期判定不留余量。
    pub fn verify_action(&self, token: &str) -> std::result::Result<ActionClaims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<ActionClaims>(
            token,
            &DecodingKey::from_secret(self.action_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| map_jwt_error(&e))?;
        Ok(data.claims)
    }
}
