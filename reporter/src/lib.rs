//! Serum Book Reporter - polls a market and logs the top of its book.
//!
//! The reporter resolves a market by address or registry name, loads its
//! metadata once and then fetches both sides of the book on every poll,
//! logging the best levels in token units.
//!
//! # Components
//!
//! - [`config`]: Reporter configuration
//! - [`service`]: Poll loop and report building
//! - [`stats`]: Poll counters

pub mod config;
pub mod service;
pub mod stats;

pub use config::{ConfigError, ReporterConfig};
pub use service::{BookReport, ReportService, ServiceError};
pub use stats::{ReportStats, ReportStatsSnapshot};
