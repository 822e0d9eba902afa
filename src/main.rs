use tracing::{error, info};

use sharebox::{BlobStore, Config, Database, FileService, SqlUserDirectory};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = sharebox::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        sharebox::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(&config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: &Config) -> sharebox::Result<()> {
    config.validate()?;

    let db = Database::open(&config.database.path).await?;
    let storage = BlobStore::new(&config.storage.path)?;
    let directory = SqlUserDirectory::new(db.clone());
    let service = FileService::from_config(&db, &storage, &directory, &config.storage);

    info!("sharebox - file storage and sharing");
    info!(
        database = %config.database.path,
        storage = %storage.base_path().display(),
        max_file_size = service.max_file_size(),
        schema_version = db.schema_version().await?,
        "ready"
    );
    Ok(())
}
