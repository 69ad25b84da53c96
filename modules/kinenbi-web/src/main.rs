use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::Gemini;
use kinenbi_common::Config;
use kinenbi_pipeline::Orchestrator;
use kinenbi_web::{app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kinenbi=info".parse()?))
        .init();

    // Missing credentials stop us here, before anything is served.
    let config = Config::from_env()?;
    config.log_redacted();

    let mut gemini = Gemini::new(&config.gemini_api_key, &config.gemini_model);
    if let Some(base_url) = &config.gemini_base_url {
        gemini = gemini.with_base_url(base_url);
    }

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(gemini),
        config.pipeline_settings(),
    ));
    let state = Arc::new(AppState { orchestrator });

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!(model = %config.gemini_model, "Kinenbi web server starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
