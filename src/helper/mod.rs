pub mod aggregate;
pub mod annotation;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod master;
pub mod metadata;
pub mod metric;
pub mod plot;
pub mod report;
pub mod stats;

pub use error::{SetupError, StatsEngineError};
pub use logging::DiagnosticLog;
pub use metadata::MetadataIndex;
pub use metric::Metric;
