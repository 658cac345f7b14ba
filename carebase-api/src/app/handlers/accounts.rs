//! 账户资料 API handlers

use axum::extract::State;
use axum::{Extension, Json};
use carebase_core::{AccountSummary, UpdateAccountRequest, UpdateOutcome};
use serde_json::{json, Value};

use super::super::error::ApiError;
use super::super::middleware::CurrentAccount;
use super::super::state::AppState;

/// GET /api/accounts/me - 当前账户信息
pub async fn get_me(Extension(current): Extension<CurrentAccount>) -> Json<AccountSummary> {
    Json(AccountSummary::from(current.account))
}

/// PATCH /api/accounts/me - 更新资料或密码（必须提供当前密码）
pub async fn update_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut account = current.account;
    let outcome = state
        .accounts
        .update_account(&mut account, &current.token, req)
        .await?;
    match outcome {
        // 改密后本次请求的令牌已撤销，客户端需要重新登录
        UpdateOutcome::PasswordChanged => Ok(Json(json!({ "message": "token removed" }))),
        UpdateOutcome::Profile(summary) => Ok(Json(json!(summary))),
    }
}

/// GET /api/accounts - 列出全部账户的公开投影
pub async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountSummary>>, ApiError> {
    let accounts = state.accounts.list_accounts().await?;
    let summaries: Vec<AccountSummary> = accounts.into_iter().map(|a| a.into()).collect();
    Ok(Json(summaries))
}
