use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use burnbox::{
    AppState, Connections,
    config::Config,
    database, logging,
    oauth::registry_from_config,
    router::{RateLimiters, create_router},
    shutdown::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    let config = Config::from_env().context("failed to load configuration")?;
    logging::init_tracing(config.log_format);

    let pool = database::connect(&config)
        .await
        .context("failed to connect to Postgres")?;
    database::migrate(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("database ready");

    let redis = redis::Client::open(config.redis_url.clone()).context("invalid Redis URL")?;
    let nats = async_nats::connect(&config.nats_url)
        .await
        .context("failed to connect to NATS")?;
    tracing::info!(url = %config.nats_url, "connected to NATS");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;
    let oauth = registry_from_config(&config, http);

    let conns = Connections {
        pool,
        redis: Arc::new(redis),
        nats,
    };

    let addr = config.server_addr();
    let limiters = RateLimiters::from_config(&config);
    let sweepers = limiters.spawn_sweepers();

    let state = AppState::new(config, &conns, oauth);
    let app = create_router(state, &limiters);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    // 按创建的相反顺序释放
    for sweeper in sweepers {
        sweeper.abort();
    }
    if let Err(e) = conns.nats.flush().await {
        tracing::warn!(error = %e, "failed to flush NATS connection");
    }
    conns.pool.close().await;
    tracing::info!("shutdown complete");

    Ok(())
}
