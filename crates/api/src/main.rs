use anyhow::Context;

use fleetops_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    fleetops_observability::init_with(config.log_format);

    if config.uses_default_jwt_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let app = fleetops_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
