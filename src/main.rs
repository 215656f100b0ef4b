use anyhow::{Context, Result};
use pdfsummary::{
    api::{self, GatewaySettings},
    config, logging,
    processing::SummaryPipeline,
    rate_limit::RateLimiter,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let pipeline = SummaryPipeline::from_config(config)
        .context("failed to initialize summarization client")?;
    let limiter = RateLimiter::in_memory(config.rate_limit_max_requests, config.rate_limit_window);
    let app = api::create_router(Arc::new(pipeline), GatewaySettings::from(config), limiter);

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.server_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.server_port))?;
    tracing::info!("Server is running on port {}", config.server_port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server terminated unexpectedly")?;
    Ok(())
}
