use std::sync::Arc;

use demo_mcp_server::{
    build_app,
    config::{Config, Transport},
    domain::build_registry,
    logging, stdio, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let registry = build_registry(config.duplicate_policy)?;
    info!(
        tools = registry.actions().len(),
        resources = registry.data_sources().len(),
        prompts = registry.templates().len(),
        "capability registry ready"
    );
    let state = AppState::new(Arc::new(registry));

    match config.transport {
        Transport::Stdio => {
            info!("server starting on stdio");
            stdio::serve_stdio(state).await?;
        }
        Transport::Http => {
            let bind_socket = config.bind_socket()?;
            let app = build_app(state);
            let listener = tokio::net::TcpListener::bind(bind_socket).await?;

            info!(
                bind_addr = %config.bind_addr,
                bind_port = config.bind_port,
                "server starting"
            );

            axum::serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}
