use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod routes;
mod services;
mod session;
pub mod models;

use services::report::{PlottersRasterizer, ReportAssembler};
use session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    // Build our application state
    let state = Arc::new(AppState::new(config));

    let app = routes::app(state.clone());

    // Run it
    let addr = state.config.bind_addr;
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    config: config::Config,
    session: Mutex<Session>,
    assembler: ReportAssembler,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        let rasterizer = PlottersRasterizer::new(config.chart_width, config.chart_height);
        Self {
            config,
            session: Mutex::new(Session::default()),
            assembler: ReportAssembler::new(Arc::new(rasterizer)),
        }
    }
}
