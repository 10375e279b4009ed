//! Conf module: configuration model, loading and validation.

pub mod error;
pub mod load;
pub mod model;

pub use error::ConfigError;
pub use model::{FilterConfig, OutputConfig, TraceConfig};
