//! # Repository Module
//!
//! SQLite repositories for AgriLabel.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LedgerService / seed binary                                           │
//! │       │                                                                 │
//! │       ├── db.catalog()    → CatalogRepository                          │
//! │       │                     load, save_*, remove_*, save_all           │
//! │       │                                                                 │
//! │       └── db.shipments()  → ShipmentRepository                         │
//! │                             load_ledger, apply(ChangeSet)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories never decide anything: the ledger and the catalog in
//! agrilabel-core validate, the repositories only store the outcome.

pub mod catalog;
pub mod shipment;
