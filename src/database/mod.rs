//! Store module: the engine's single SQLite-backed source of truth.
//!
//! Organized as one connection wrapper (`connection`) plus one file per
//! table family, mirroring the schema laid out in the Store contract:
//! slot state, runs, deltas, items, local/cloud prices, price history,
//! the upload outbox, settings, and the tailer's persisted offset.

pub mod cloud_prices;
pub mod connection;
pub mod deltas;
pub mod items;
pub mod migrations;
pub mod models;
pub mod outbox;
pub mod price_history;
pub mod prices;
pub mod runs;
pub mod settings;
pub mod slot_state;
pub mod tailer_offset;

pub use connection::{migrate_legacy_store_if_present, Store, StoreStats};
pub use models::*;
pub use outbox::is_due as outbox_entry_is_due;
pub use tailer_offset::TailerOffset;
