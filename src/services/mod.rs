//! Service layer for the sync engine.
//!
//! This module contains the business logic for:
//! - Remote document API access (`RemoteDataClient`)
//! - Word-count extraction (`wordcount`)
//! - Reference-weighted aggregation (`AggregationEngine`)

mod aggregate;
mod client;
pub mod wordcount;

pub use aggregate::{AggregateOutcome, AgencyRollup, AggregationEngine};
pub use client::RemoteDataClient;
