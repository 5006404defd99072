use ibc_api::constants::SERVICE_NAME;
use ibc_api::setup;
use ibc_core::IbcConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = IbcConfig::from_env()?;

    ibc_infra::init_telemetry(SERVICE_NAME, config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;
    tracing::info!("Configuration loaded and validated successfully");

    // Initialize the application (media library, fetcher, routes)
    let (_state, router) = setup::initialize_app(config.clone()).await?;

    // Start the server
    setup::server::start_server(&config, router).await?;

    Ok(())
}
