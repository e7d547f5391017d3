pub mod aggregator;
pub mod categories;
pub mod codec;
pub mod config;
pub mod cost;
pub mod error;
pub mod fs;
pub mod history;
pub mod paths;
pub mod report;
pub mod savings;
pub mod trend;

pub use error::{MetricsError, Result};
