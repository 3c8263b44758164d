use anyhow::{Context, Result};
use intake_server::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment variables
    let config = ServerConfig::load().context("Failed to load configuration")?;

    // Run the server using the library's run function
    intake_server::run(config).await.context("Server error")?;

    Ok(())
}
