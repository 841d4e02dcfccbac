//! Command-line runner for the ad events report.

pub mod commands;
pub mod logging;

pub use commands::{load_project, run, track, RunArgs, RunSummary, TrackArgs};
pub use logging::{init_logging, LoggingConfig};
