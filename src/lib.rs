//! Archive of SwissMetNet ten-minute station readings.
//!
//! Observations are decoded from the MeteoSwiss CSV feed, packed into
//! fixed-width binary records and kept in an ordered key-value store under
//! `"<station>-<epoch>"` keys. The export side scans the store back into CSV.

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod processors;
pub mod readers;
pub mod store;
pub mod utils;
pub mod writers;

pub use error::{ArchiveError, Result};
