mod app;

use app::{app_router, AppState};
use carebase_core::{AccountManager, LogMailer, PatientStore};
use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
struct ApiConfig {
    bind: SocketAddr,
    data_dir: PathBuf,
    /// 会话令牌签名密钥
    session_secret: String,
    /// 邮件动作令牌签名密钥（必须独立于会话密钥）
    action_secret: String,
    /// CORS 允许的来源列表（空则允许所有）
    cors_origins: Vec<String>,
}

impl ApiConfig {
    fn from_env() -> Self {
        let bind = env::var("CB_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| "0.0.0.0:8080".parse().expect("valid default bind"));

        let data_dir = env::var("CB_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        // 会话密钥，用于签发登录会话令牌
        let session_secret = env::var("CB_SESSION_SECRET").unwrap_or_else(|_| {
            info!("CB_SESSION_SECRET not set; generating a random secret for this run");
            uuid::Uuid::new_v4().to_string()
        });

        // 动作密钥，用于邮箱确认与改密令牌（必须与会话密钥分开配置）
        let action_secret = env::var("CB_ACTION_SECRET").unwrap_or_else(|_| {
            info!("CB_ACTION_SECRET not set; generating a random secret for this run");
            uuid::Uuid::new_v4().to_string()
        });

        // CORS 允许的来源，逗号分隔；空或 "*" 表示允许所有
        let cors_origins = env::var("CB_CORS_ORIGINS")
            .ok()
            .map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed == "*" {
                    vec![]
                } else {
                    trimmed
                        .split(',')
                        .filter(|t| !t.trim().is_empty())
                        .map(|t| t.trim().to_string())
                        .collect()
                }
            })
            .unwrap_or_default();

        Self {
            bind,
            data_dir,
            session_secret,
            action_secret,
            cors_origins,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 优先读取 .env（若存在）
    let _ = dotenv();
    init_tracing();

    let config = ApiConfig::from_env();
    info!("starting API on {}", config.bind);

    let accounts = Arc::new(AccountManager::new(
        config.data_dir.clone(),
        config.session_secret.clone(),
        config.action_secret.clone(),
        Arc::new(LogMailer),
    ));
    accounts.ensure_dirs()?;

    let patients = Arc::new(PatientStore::new(config.data_dir.clone()));

    let state = AppState { accounts, patients };

    let app = app_router(state, config.cors_origins.clone());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
