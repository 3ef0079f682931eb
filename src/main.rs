#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use eventease::{
    config::{
        database::{DEFAULT_DATABASE_URL, create_connection, create_tables},
        settings::load_app_configuration,
    },
    core::vendor::{list_vendors, seed_vendor_catalog},
    errors::Result,
    store::sql::SqlStore,
};
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

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = load_app_configuration()?;

    // 4. Open the database and make sure the tables exist
    let database_url = app_config.database_url();
    if database_url == DEFAULT_DATABASE_URL {
        std::fs::create_dir_all("data")?;
    }
    let db = create_connection(database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed the vendor catalog from config
    let store = SqlStore::new(db);
    seed_vendor_catalog(&store, &app_config.vendors)
        .await
        .inspect_err(|e| error!("Failed to seed vendor catalog: {}", e))?;

    let catalog = list_vendors(&store).await?;
    info!(vendors = catalog.len(), "EventEase store ready");
    Ok(())
}
