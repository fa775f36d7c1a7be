use buspass::{
    api::{AppState, build_router},
    config::{admin::AdminKey, app, database},
    core::stage,
    errors::Result,
};
use dotenvy::dotenv;
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

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = app::load_default_config()
        .inspect_err(|e| error!("Failed to load application configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed fare stages from config.toml
    stage::seed_stages(&db, &app_config.stages)
        .await
        .inspect_err(|e| error!("Failed to seed stages: {}", e))?;

    // 6. Serve
    let bind_address = app_config.server.bind_address.clone();
    let state = AppState::new(db, app_config, AdminKey::from_env());
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Server listening");
    axum::serve(listener, router).await?;

    Ok(())
}
