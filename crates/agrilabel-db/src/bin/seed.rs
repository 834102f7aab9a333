//! # Seed
//!
//! Prepares a database for a new installation: the default packagings,
//! pallet types, articles and recipient, plus the configured SSCC counter.
//!
//! ## Usage
//! ```bash
//! # Database and prefix from agrilabel.toml / environment
//! cargo run -p agrilabel-db --bin seed
//!
//! # Explicit database file and config file
//! cargo run -p agrilabel-db --bin seed -- --db ./agrilabel_dev.db --config ./agrilabel.toml
//!
//! # Overwrite master data that already exists
//! cargo run -p agrilabel-db --bin seed -- --force
//! ```
//!
//! An existing serial counter is never touched.

use agrilabel_core::Catalog;
use agrilabel_db::{AppConfig, Database, DbConfig};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--force" | "-f" => force = true,
            "--help" | "-h" => {
                println!("AgriLabel database seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file (default: from config)");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -f, --force           Overwrite existing master data");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    let config = AppConfig::load(config_path)?;
    init_tracing(&config);

    let db_path = db_path.unwrap_or_else(|| config.database.path.clone());
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    info!(path = %db_path.display(), "Seeding database");
    let db = Database::new(DbConfig::new(&db_path)).await?;

    if db.catalog().is_empty().await? || force {
        let catalog = Catalog::with_defaults();
        db.catalog().save_all(&catalog).await?;
        info!(
            articles = catalog.articles().count(),
            packagings = catalog.packagings().count(),
            pallet_types = catalog.pallet_types().count(),
            recipients = catalog.recipients().count(),
            "Default master data stored"
        );
    } else {
        warn!("Master data already present, skipping (use --force to overwrite)");
    }

    match db.shipments().serial_state().await? {
        Some(serial) => info!(
            prefix = %serial.company_prefix,
            next_serial = serial.next_serial,
            "Serial state already present"
        ),
        None => {
            let serial = config.initial_serial();
            db.shipments().save_serial_state(&serial).await?;
            info!(
                prefix = %serial.company_prefix,
                extension = serial.extension_digit,
                next_serial = serial.next_serial,
                "Serial state stored"
            );
        }
    }

    db.close().await;
    info!("Seed complete");
    Ok(())
}

/// RUST_LOG wins over the `[logging]` filter of the config file.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
