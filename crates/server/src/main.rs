//! Rota server binary

use rota_core::{Database, Engine};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rota_server::config::ServerConfig;
use rota_server::routes;
use rota_server::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Rota server");

    if let Err(e) = run().await {
        error!("Fatal: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load()?;
    let db_path = config.database_path()?;
    let db = Database::open(&db_path)?;
    info!(path = %db_path.display(), "Database open");

    let state = AppState::new(db, Engine::default());
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(addr = %config.bind, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}
