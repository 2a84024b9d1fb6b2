//! Epoch boundary detection for raw acquisition sweeps
//!
//! Raw acquisition files do not record where the test pulse ends or where the
//! valid response stops, so the boundary is derived from waveform shape. The
//! readers depend only on the [`EpochDetector`] trait; [`StimulusEpochDetector`]
//! is the default implementation.

use crate::config::ReaderConfig;

/// Derives valid-data index ranges from waveforms
///
/// Errors are plain reasons; the reader attaches the sweep number.
pub trait EpochDetector: Send + Sync {
    /// Current-clamp rule: range from shortly before stimulus onset (after any
    /// test pulse) to the last valid response sample
    fn experiment_epoch(
        &self,
        stimulus: &[f64],
        response: &[f64],
        sampling_rate: f64,
    ) -> Result<(usize, usize), String>;

    /// Voltage-clamp rule: range from the first sample to the last valid
    /// response sample
    fn sweep_epoch(&self, response: &[f64]) -> Result<(usize, usize), String>;
}

/// Default detector based on stimulus transitions and response padding
#[derive(Debug, Clone)]
pub struct StimulusEpochDetector {
    prestim_duration_s: f64,
    test_pulse_transitions: usize,
}

impl StimulusEpochDetector {
    pub fn new(config: &ReaderConfig) -> Self {
        Self {
            prestim_duration_s: config.prestim_duration_s,
            test_pulse_transitions: config.test_pulse_transitions,
        }
    }
}

impl Default for StimulusEpochDetector {
    fn default() -> Self {
        Self::new(&ReaderConfig::default())
    }
}

/// Index of the last finite, non-zero sample
fn last_valid_index(samples: &[f64]) -> Option<usize> {
    samples.iter().rposition(|v| v.is_finite() && *v != 0.0)
}

impl EpochDetector for StimulusEpochDetector {
    fn experiment_epoch(
        &self,
        stimulus: &[f64],
        response: &[f64],
        sampling_rate: f64,
    ) -> Result<(usize, usize), String> {
        let transitions: Vec<usize> = stimulus
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1] != pair[0])
            .map(|(i, _)| i)
            .collect();

        if transitions.is_empty() {
            return Err("empty stimulus trace".to_string());
        }

        // Up and down of the test pulse come first when there is one
        let onset_transition = if transitions.len() >= self.test_pulse_transitions {
            2
        } else {
            0
        };
        let stim_start = transitions[onset_transition.min(transitions.len() - 1)] + 1;

        let prestim = (self.prestim_duration_s * sampling_rate).max(0.0) as usize;
        let start = stim_start.saturating_sub(prestim);

        let end = last_valid_index(response).ok_or_else(|| "no valid response samples".to_string())?;

        if start > end {
            return Err(format!(
                "experiment starts at {} after the last valid response sample {}",
                start, end
            ));
        }

        Ok((start, end))
    }

    fn sweep_epoch(&self, response: &[f64]) -> Result<(usize, usize), String> {
        let end = last_valid_index(response).ok_or_else(|| "no valid response samples".to_string())?;
        Ok((0, end))
    }
}
