//! # agrilabel-db: Persistence Layer for AgriLabel
//!
//! SQLite storage for the catalog and the shipment ledger, the
//! `agrilabel.toml` configuration, and the [`LedgerService`] that
//! serializes ledger writes.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AgriLabel Data Flow                              │
//! │                                                                         │
//! │  UI command (finalize pallet, save DDT)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   agrilabel-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ LedgerService │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (service.rs)  │───►│ CatalogRepo   │    │  (embedded)  │  │   │
//! │  │   │ Mutex<Ledger> │    │ ShipmentRepo  │    │ 001_init.sql │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │   agrilabel-core        Database (pool.rs)                     │   │
//! │  │   ShipmentLedger        SqlitePool, WAL                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file from AppConfig (config.rs)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agrilabel_db::{AppConfig, Database, LedgerService};
//!
//! let config = AppConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let service = LedgerService::open(db, config.initial_serial(), config.input_policy()).await?;
//!
//! let unit = service.finalize_new_unit(&draft).await?;
//! println!("{}", unit.payload.human_readable);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::AppConfig;
pub use error::{ConfigError, ConfigResult, DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::LedgerService;

pub use repository::catalog::CatalogRepository;
pub use repository::shipment::ShipmentRepository;
