//! 注册、登录与邮箱激活 API handlers

use axum::extract::{Host, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use carebase_core::{AccountSummary, LoginRequest, RegisterRequest};
use serde_json::{json, Value};

use super::super::error::ApiError;
use super::super::middleware::{CurrentAccount, AUTH_HEADER};
use super::super::state::AppState;

/// POST /api/accounts - 注册新账户，签发首个会话令牌并发送激活邮件
pub async fn register(
    State(state): State<AppState>,
    Host(host): Host,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, [(&'static str, String); 1], Json<AccountSummary>), ApiError> {
    if req.email.is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::bad_request("password is required"));
    }
    // 邮箱格式、密码长度与唯一性检查由 core 层执行
    let (summary, token) = state.accounts.register(req, &host).await?;
    Ok((StatusCode::OK, [(AUTH_HEADER, token)], Json(summary)))
}

/// POST /api/accounts/login - 校验凭证并签发新会话令牌
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<(StatusCode, [(&'static str, String); 1], Json<AccountSummary>), ApiError> {
    let (summary, token) = state.accounts.login(&req.email, &req.password).await?;
    Ok((StatusCode::OK, [(AUTH_HEADER, token)], Json(summary)))
}

/// GET /api/accounts/activation/:token - 通过邮件令牌确认邮箱
pub async fn confirm_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.accounts.confirm_email(&token).await?;
    Ok(Json(json!({ "message": "Email successfully confirmed" })))
}

/// GET /api/accounts/activation - 给当前账户重发激活邮件
pub async fn resend_confirmation(
    State(state): State<AppState>,
    Host(host): Host,
    Extension(current): Extension<CurrentAccount>,
) -> Result<Json<Value>, ApiError> {
    let sent = state
        .accounts
        .resend_confirmation(&current.account, &host)
        .await?;
    let message = if sent {
        "Activation Email was sent"
    } else {
        "Your account is already activated"
    };
    Ok(Json(json!({ "message": message })))
}

/// DELETE /api/accounts/logout - 撤销本次请求携带的会话令牌
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> Result<StatusCode, ApiError> {
    let mut account = current.account;
    state.accounts.logout(&mut account, &current.token).await?;
    Ok(StatusCode::OK)
}
