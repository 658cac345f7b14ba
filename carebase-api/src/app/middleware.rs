use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request};
use axum::middleware::Next;
use axum::response::Response;
use carebase_core::Account;

use super::error::ApiError;
use super::state::AppState;

/// 会话令牌使用的请求/响应头
pub const AUTH_HEADER: &str = "x-auth";

/// 认证信息扩展，由 auth_middleware 填充
#[derive(Debug, Clone)]
pub struct CurrentAccount {
    pub account: Account,
    /// 本次请求携带的会话令牌
    pub token: String,
}

/// 不需要认证的端点（方法 + 路径）。
/// 注意 `GET /api/accounts/activation` 与 `GET /api/accounts/change-password`
/// 本身是认证端点，只有带令牌后缀的变体公开。
fn is_public(method: &Method, path: &str) -> bool {
    if *method == Method::GET {
        return path == "/health"
            || path
                .strip_prefix("/api/accounts/activation/")
                .map_or(false, |rest| !rest.is_empty());
    }
    if *method == Method::POST {
        return path == "/api/accounts"
            || path == "/api/accounts/login"
            || path == "/api/accounts/change-password";
    }
    if *method == Method::PATCH {
        return path
            .strip_prefix("/api/accounts/change-password/")
            .map_or(false, |rest| !rest.is_empty());
    }
    false
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();

    // 公开端点不需要认证
    if is_public(request.method(), &path) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .ok_or_else(ApiError::unauthorized)?;

    // 签名有效且令牌仍在账户会话列表中才放行
    let account = state
        .accounts
        .find_by_session_token(&token)
        .await
        .map_err(|_| ApiError::unauthorized())?;

    request
        .extensions_mut()
        .insert(CurrentAccount { account, token });
    Ok(next.run(request).await)
}
