//! Model: TraceConfig and related structs.

use serde::{Deserialize, Serialize};

use crate::filter::FilterMode;
use crate::parser::MAX_LINE_SIZE;
use crate::trace::align::DEFAULT_BLOCK_SIZES;
use crate::trace::TrackerOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Block sizes the alignment analyzer checks
    pub block_sizes: Vec<u64>,
    /// Lines longer than this are skipped
    pub max_line_size: usize,
    pub record_raw_lines: bool,
    /// Emit lifecycles still open at end of input instead of dropping them
    pub flush_on_eof: bool,
    pub compute_elapsed: bool,
    /// Only emit lifecycles at least this slow
    pub min_elapsed_ms: Option<f64>,
    pub output: OutputConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output file; stdout when unset
    pub path: Option<String>,
    pub pretty: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub pattern: Option<String>,
    pub case_sensitive: bool,
    pub mode: FilterMode,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            block_sizes: DEFAULT_BLOCK_SIZES.to_vec(),
            max_line_size: MAX_LINE_SIZE,
            record_raw_lines: true,
            flush_on_eof: false,
            compute_elapsed: true,
            min_elapsed_ms: None,
            output: OutputConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            pattern: None,
            case_sensitive: true,
            mode: FilterMode::Include,
        }
    }
}

impl TraceConfig {
    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            block_sizes: self.block_sizes.clone(),
            record_raw_lines: self.record_raw_lines,
            // The threshold needs elapsed time even if it is not printed
            compute_elapsed: self.compute_elapsed || self.min_elapsed_ms.is_some(),
        }
    }
}
