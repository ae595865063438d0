//! Machine configuration

use serde::{Deserialize, Serialize};

use crate::trace::TraceConfig;

/// Default limit on nested activations
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1600;

/// Machine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Maximum number of nested activations
    pub max_call_depth: usize,
    /// Collect [`ExecutionStats`](crate::ExecutionStats) counters
    pub collect_stats: bool,
    /// Instruction trace capture
    pub trace: TraceConfig,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            collect_stats: true,
            trace: TraceConfig::default(),
        }
    }
}

impl VmConfig {
    /// Configuration without counters or tracing
    pub fn minimal() -> Self {
        Self {
            collect_stats: false,
            ..Self::default()
        }
    }

    /// Configuration that keeps the last `ring_buffer_size` instructions
    pub fn traced(ring_buffer_size: usize) -> Self {
        Self {
            trace: TraceConfig {
                enabled: true,
                ring_buffer_size,
            },
            ..Self::default()
        }
    }

    /// Override the nesting limit
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VmConfig::default();
        assert_eq!(config.max_call_depth, 1600);
        assert!(config.collect_stats);
        assert!(!config.trace.enabled);
    }

    #[test]
    fn test_partial_json() {
        let config: VmConfig = serde_json::from_str(r#"{"max_call_depth": 10}"#).unwrap();
        assert_eq!(config.max_call_depth, 10);
        assert!(config.collect_stats);
        assert_eq!(config.trace.ring_buffer_size, 100);
    }
}
