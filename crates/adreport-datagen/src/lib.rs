//! Deterministic ad event generation for adreport.
//!
//! Composable generators drive a per-day event simulation: users see
//! impressions for value props, click some of them and pay for some of
//! the clicks. Output depends only on the seed.

pub mod events;
pub mod gen;
pub mod generators;
pub mod write;

pub use events::{
    generate_day_seeds, AdEvent, DayEvents, DayGenerator, Payment, User, UserPool, VALUE_PROPS,
};
pub use gen::Gen;
pub use generators::*;
pub use write::{dataset_config, write_dataset, DatasetSummary};
