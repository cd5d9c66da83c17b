use bg_remover::{AppConfig, AppState, build_app, shutdown};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        format!("bg_remover={level},tower_http={level}").into()
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format.as_str() {
        "compact" => builder.compact().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() {
    // Load config
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config init failed: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    // 缺失的密钥/上游地址不阻止启动，请求期间以 500 报告
    if config.removal.service_token().is_none() {
        tracing::warn!("未配置服务令牌（removal.service_token / SERVICE_API_TOKEN），抠图接口将返回 500");
    }
    if config.removal.upstream_url().is_none() {
        tracing::warn!("未配置上游地址（removal.upstream_url / WITHOUTBG_API_URL），抠图接口将返回 500");
    }

    let state = match AppState::from_config(config.removal.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("上游 HTTP Client 初始化失败: {}", e);
            std::process::exit(1);
        }
    };
    let app = build_app(&config, state);

    let addr = config.server_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Removal API: http://{}{}", addr, config.removal_path());

    let grace = config.shutdown.timeout_duration();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(shutdown::graceful_signal(grace));

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
