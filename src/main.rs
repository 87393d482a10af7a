#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use ecotrack::{
    config::{ServerSettings, database, load_config},
    core::{achievement, map::ChoroplethRenderer},
    errors::Result,
    web::{self, AppState},
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    let settings = ServerSettings::from_env();
    info!("Using configuration file {}", settings.config_path.display());

    // 3. Load the factor table, achievement catalog and map settings
    let app_config = load_config(&settings.config_path)
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(
        "Loaded emission factors version {}",
        app_config.factors.version
    );

    // 4. Initialize database
    let db = database::init_database(&settings.database_url)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the achievement catalog
    achievement::seed_achievements(&db, &app_config.achievements)
        .await
        .inspect_err(|e| error!("Failed to seed achievements: {}", e))?;

    // 6. Serve
    let renderer = Arc::new(ChoroplethRenderer::load(&app_config.map.boundaries_path));
    let state = AppState::new(Arc::new(db), Arc::new(app_config), renderer);
    let app = web::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", settings.bind_address, e))?;
    info!("Listening on http://{}", settings.bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
