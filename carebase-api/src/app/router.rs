use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::handlers::{
    confirm_email, create_patient, delete_patient, get_me, get_patient, health, list_accounts,
    list_patients, login, logout, redeem_password_change, redeem_password_reset, register,
    request_password_change, request_password_reset, resend_confirmation, update_me,
    update_patient,
};
use super::middleware::{auth_middleware, AUTH_HEADER};
use super::state::AppState;

/// 根据配置的来源列表构建 CorsLayer。
/// `x-auth` 同时作为请求头与响应头使用，必须显式允许并暴露。
fn build_cors_layer(cors_origins: Vec<String>) -> CorsLayer {
    let auth_header = HeaderName::from_static(AUTH_HEADER);
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, auth_header.clone()])
        .expose_headers([auth_header])
        .allow_credentials(true);

    if cors_origins.is_empty() {
        // 未配置时允许所有来源（开发环境友好，但生产环境应配置 CB_CORS_ORIGINS）
        tracing::warn!(
            "CB_CORS_ORIGINS not configured, allowing all origins. \
             Set CB_CORS_ORIGINS in production for security."
        );
        base.allow_origin(AllowOrigin::any())
            .allow_credentials(false) // any() 不能与 credentials(true) 共用
    } else {
        // 指定来源列表
        let origins: Vec<HeaderValue> = cors_origins
            .into_iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        base.allow_origin(origins)
    }
}

/// Build the router with routes and middleware wired.
pub fn app_router(state: AppState, cors_origins: Vec<String>) -> Router {
    // 账户端点（注册、登录等公开变体由 auth_middleware 放行）
    let account_routes = Router::new()
        .route("/api/accounts", post(register).get(list_accounts))
        .route("/api/accounts/login", post(login))
        .route("/api/accounts/logout", delete(logout))
        .route("/api/accounts/me", get(get_me).patch(update_me))
        .route("/api/accounts/activation", get(resend_confirmation))
        .route("/api/accounts/activation/:token", get(confirm_email))
        .route(
            "/api/accounts/change-password",
            post(request_password_reset).get(request_password_change),
        )
        .route(
            "/api/accounts/change-password/:token",
            patch(redeem_password_reset),
        )
        .route(
            "/api/accounts/auth-change-password/:token",
            patch(redeem_password_change),
        );

    // 病历端点（全部需要认证）
    let patient_routes = Router::new()
        .route("/api/patients", post(create_patient).get(list_patients))
        .route(
            "/api/patients/:id",
            get(get_patient)
                .patch(update_patient)
                .delete(delete_patient),
        );

    Router::new()
        .route("/health", get(health))
        .merge(account_routes)
        .merge(patient_routes)
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}
