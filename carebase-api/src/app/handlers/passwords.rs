//! 改密流程 API handlers：请求链接与兑换令牌

use axum::extract::{Host, Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::super::error::ApiError;
use super::super::middleware::CurrentAccount;
use super::super::state::AppState;

/// 忘记密码请求体
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: Option<String>,
}

/// 兑换改密令牌的请求体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordBody {
    pub current_password: Option<String>,
    pub password: Option<String>,
}

/// 忘记密码兑换的查询参数，邮箱来自邮件链接
#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub email: Option<String>,
}

/// GET /api/accounts/change-password - 给当前账户发送改密链接
pub async fn request_password_change(
    State(state): State<AppState>,
    Host(host): Host,
    Extension(current): Extension<CurrentAccount>,
) -> Result<Json<Value>, ApiError> {
    state
        .accounts
        .request_password_change(&current.account, &host)
        .await?;
    Ok(Json(json!({
        "message": "change password request was sent to your email, check your inbox"
    })))
}

/// POST /api/accounts/change-password - 忘记密码，按邮箱发送改密链接
pub async fn request_password_reset(
    State(state): State<AppState>,
    Host(host): Host,
    Json(req): Json<ResetRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = req.email.as_deref().unwrap_or("");
    if email.is_empty() {
        return Err(ApiError::not_found("provide an email"));
    }
    state.accounts.request_password_reset(email, &host).await?;
    Ok(Json(json!({
        "message": "change password request was sent to your email, check your inbox"
    })))
}

/// PATCH /api/accounts/auth-change-password/:token - 已登录用户兑换改密令牌。
/// 需要当前密码证明，成功后撤销本次请求的会话令牌。
pub async fn redeem_password_change(
    State(state): State<AppState>,
    Host(host): Host,
    Path(token): Path<String>,
    Extension(current): Extension<CurrentAccount>,
    Json(body): Json<PasswordBody>,
) -> Result<Json<Value>, ApiError> {
    let mut account = current.account;
    state
        .accounts
        .redeem_password_change(
            &mut account,
            &current.token,
            &token,
            body.current_password.as_deref(),
            body.password.as_deref(),
            &host,
        )
        .await?;
    Ok(Json(
        json!({ "message": "password was changed and token was removed" }),
    ))
}

/// PATCH /api/accounts/change-password/:token - 忘记密码路径兑换改密令牌。
/// 邮箱取自查询参数并与令牌声明交叉校验。
pub async fn redeem_password_reset(
    State(state): State<AppState>,
    Host(host): Host,
    Path(token): Path<String>,
    Query(query): Query<ResetQuery>,
    Json(body): Json<PasswordBody>,
) -> Result<Json<Value>, ApiError> {
    let email = query.email.as_deref().unwrap_or("");
    state
        .accounts
        .redeem_password_reset(&token, email, body.password.as_deref(), &host)
        .await?;
    Ok(Json(json!({ "message": "password was changed" })))
}
