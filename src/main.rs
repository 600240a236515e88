use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rainbow_qa::{routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志，生产环境输出 JSON
    let json_logs = config.is_production();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting Rainbow-QA service ({})...", config.environment);
    info!("Notification policy: {:?}", config.notification_policy);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let app_state = Arc::new(AppState::new(config).await?);
    let app = routes::app(app_state);

    info!("Starting server on http://{}", addr);
    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
