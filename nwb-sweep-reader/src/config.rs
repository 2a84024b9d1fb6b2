//! Reader configuration types
//!
//! This module defines the small set of tunables the readers need. Dialect
//! rules themselves are fixed; only the epoch boundary heuristics used for raw
//! acquisition files can be adjusted.

use serde::{Deserialize, Serialize};

/// Configuration shared by all readers created through the factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Seconds of baseline kept before the stimulus onset (default: 1.0s)
    #[serde(default = "default_prestim_duration")]
    pub prestim_duration_s: f64,

    /// Minimum number of stimulus transitions that indicates a leading test
    /// pulse (default: 4)
    #[serde(default = "default_test_pulse_transitions")]
    pub test_pulse_transitions: usize,
}

fn default_prestim_duration() -> f64 {
    1.0
}

fn default_test_pulse_transitions() -> usize {
    4
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            prestim_duration_s: default_prestim_duration(),
            test_pulse_transitions: default_test_pulse_transitions(),
        }
    }
}

impl ReaderConfig {
    /// Create a new reader configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the baseline kept before stimulus onset
    pub fn with_prestim_duration(mut self, seconds: f64) -> Self {
        self.prestim_duration_s = seconds;
        self
    }

    /// Builder method: set the transition count that marks a test pulse
    pub fn with_test_pulse_transitions(mut self, transitions: usize) -> Self {
        self.test_pulse_transitions = transitions;
        self
    }
}
