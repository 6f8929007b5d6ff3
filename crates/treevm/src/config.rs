use serde::{Deserialize, Serialize};

/// Options for one graph build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Emit a `treevm::trace` event for every value hop.
    pub trace: bool,
    /// Maximum nesting of synchronous deliveries before propagation fails.
    pub max_depth: usize,
    /// Maximum number of ticks `settle` may run.
    pub max_ticks: usize,
}

impl GraphConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 256;
    pub const DEFAULT_MAX_TICKS: usize = 100_000;

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            trace: false,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_ticks: Self::DEFAULT_MAX_TICKS,
        }
    }
}
