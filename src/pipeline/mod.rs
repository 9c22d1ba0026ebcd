//! Pipeline stages for synchronization passes.
//!
//! - `sync`: orchestrates one full pass (catalogs → counts → diff → persist)
//! - `diff`: day-over-day change detection
//! - `fallback`: synthetic dataset generation when the upstream is unusable

pub mod diff;
pub mod fallback;
pub mod sync;

pub use diff::{ChangeDetector, calculate_changes};
pub use fallback::SyntheticDataset;
pub use sync::{SyncEngine, SyncReport};
