// src/models/mod.rs

//! Domain models for the sync engine.
//!
//! This module contains all data structures used throughout the
//! application, organized by their primary purpose.

mod agency;
mod config;
mod remote;
mod snapshot;
mod title;

// Re-export all public types
pub use agency::{Agency, CfrReference};
pub use config::{ClientConfig, Config, StorageConfig, SyncConfig};
pub use remote::{AgencyCatalog, RemoteAgency, RemoteCfrReference, TitleCatalog, TitleSummary};
pub use snapshot::{ChangeRecord, EntityKind, HistoricalSnapshot};
pub use title::Title;
