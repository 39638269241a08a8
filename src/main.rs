use std::sync::Arc;

use tracing::info;
use veilgate::{
    api::{build_router, start_api_server},
    dispatch::BatchDispatcher,
    observability::{init_logging, log_config_info},
    transform::VaultTransformClient,
    AppConfig, Result, APP_NAME, VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (optional - won't fail if missing).
    // This must happen before any config is read from environment.
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = AppConfig::from_env()?;
    init_logging(&config.observability)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting Veilgate transform bridge");
    log_config_info(&config);

    let client = VaultTransformClient::new(config.vault.clone())?;
    client.check_connectivity().await;

    let dispatcher = Arc::new(BatchDispatcher::new(Arc::new(client), config.dispatch.parallelism));
    let router = build_router(dispatcher);

    start_api_server(&config.server, router).await?;

    info!("Veilgate shutdown completed");
    Ok(())
}
