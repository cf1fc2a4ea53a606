//! Subcommand handlers.

use paperdigest_core::gateway::run_gateway;
use paperdigest_core::{DigestConfig, ResearchPipeline};
use std::sync::Arc;
use tracing::info;

/// Run the REST gateway until interrupted.
pub async fn serve(
    mut config: DigestConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let pipeline = Arc::new(ResearchPipeline::from_config(&config)?);
    let addr = config.server.bind_addr();

    tokio::select! {
        result = run_gateway(pipeline, &addr) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}

/// Run one pipeline pass and print the response as pretty JSON.
pub async fn search(config: DigestConfig, topic: &str, top_n: Option<u32>) -> anyhow::Result<()> {
    let pipeline = ResearchPipeline::from_config(&config)?;
    let response = pipeline.run(topic, top_n).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
