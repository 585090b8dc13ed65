//! Engine configuration: enumerated numeric keys with bounds (§6).
//!
//! Plain `Serialize + Deserialize + Default` struct with a hand-rolled
//! validator, in the style of the teacher's `CognitiveConfig` -- loaded
//! from a JSON file at the binary edge, falling back to
//! [`EngineConfig::default`] when no file is given.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Minimum classifier confidence to accept a classification. `[0, 1]`.
    pub confidence_min: f64,
    /// Base half-life for dimension/emotion decay, in hours. `>= 0.1`.
    pub half_life_hours: f64,
    /// Window used by trend-reporting consumers, in hours. `>= 1`.
    pub trend_window_hours: f64,
    /// Bound on `recentStimuli`. `>= 10`.
    pub max_history: usize,
    /// Rumination ignition threshold on stimulus intensity. `[0, 1]`.
    pub rumination_threshold: f64,
    /// Maximum rumination stages before an entry expires. `[1, 10]`.
    pub rumination_max_stages: u32,
    /// How often the decay service ticks, in minutes. `>= 1`.
    pub decay_service_interval_minutes: u64,
    /// Per-advance multiplicative decay applied to rumination intensity. `(0, 1]`.
    pub rumination_decay_factor: f64,
    /// Scale applied to rumination intensity when re-applying effects. `[0, 1]`.
    pub rumination_effect_scale: f64,
    /// Base rumination-ignition probability, before [`Personality::rumination_probability`]
    /// scales it by neuroticism/openness. `[0, 1]`.
    pub rumination_probability: f64,
    /// Timeout for outbound classifier HTTP calls, in milliseconds.
    pub classifier_timeout_ms: u64,
    /// Staleness timeout for the persistence lock file, in seconds.
    pub lock_stale_after_seconds: u64,
    /// Cap on the number of sibling agents returned by a peek.
    pub peek_limit: usize,
    /// Optional path to a JSON file of user-supplied label -> delta
    /// mappings, merged over the static taxonomy.
    pub custom_mappings_path: Option<std::path::PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_min: 0.5,
            half_life_hours: 12.0,
            trend_window_hours: 24.0,
            max_history: 20,
            rumination_threshold: 0.6,
            rumination_max_stages: 5,
            decay_service_interval_minutes: 5,
            rumination_decay_factor: 0.8,
            rumination_effect_scale: 0.3,
            rumination_probability: 0.5,
            classifier_timeout_ms: 10_000,
            lock_stale_after_seconds: 10,
            peek_limit: 50,
            custom_mappings_path: None,
        }
    }
}

impl EngineConfig {
    /// Validate every bounded key, collecting every violation into a
    /// single `ConfigError` rather than failing on the first one -- a
    /// misconfigured deployment should see the whole list at once.
    pub fn validate(&self) -> Result<(), EngineError> {
        let mut problems = Vec::new();

        if !(0.0..=1.0).contains(&self.confidence_min) {
            problems.push(format!("confidence_min must be in [0,1], got {}", self.confidence_min));
        }
        if self.half_life_hours < 0.1 {
            problems.push(format!("half_life_hours must be >= 0.1, got {}", self.half_life_hours));
        }
        if self.trend_window_hours < 1.0 {
            problems.push(format!("trend_window_hours must be >= 1, got {}", self.trend_window_hours));
        }
        if self.max_history < 10 {
            problems.push(format!("max_history must be >= 10, got {}", self.max_history));
        }
        if !(0.0..=1.0).contains(&self.rumination_threshold) {
            problems.push(format!(
                "rumination_threshold must be in [0,1], got {}",
                self.rumination_threshold
            ));
        }
        if !(1..=10).contains(&self.rumination_max_stages) {
            problems.push(format!(
                "rumination_max_stages must be in [1,10], got {}",
                self.rumination_max_stages
            ));
        }
        if self.decay_service_interval_minutes < 1 {
            problems.push(format!(
                "decay_service_interval_minutes must be >= 1, got {}",
                self.decay_service_interval_minutes
            ));
        }
        if !(0.0..=1.0).contains(&self.rumination_decay_factor) || self.rumination_decay_factor <= 0.0 {
            problems.push(format!(
                "rumination_decay_factor must be in (0,1], got {}",
                self.rumination_decay_factor
            ));
        }
        if !(0.0..=1.0).contains(&self.rumination_effect_scale) {
            problems.push(format!(
                "rumination_effect_scale must be in [0,1], got {}",
                self.rumination_effect_scale
            ));
        }
        if !(0.0..=1.0).contains(&self.rumination_probability) {
            problems.push(format!(
                "rumination_probability must be in [0,1], got {}",
                self.rumination_probability
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(EngineError::config(problems.join("; ")))
        }
    }

    /// Load from a JSON file, falling back to defaults if `path` is `None`.
    /// Does not validate -- call [`EngineConfig::validate`] explicitly so
    /// the caller controls when a `ConfigError` surfaces.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, EngineError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let bytes = std::fs::read(path)
            .map_err(|e| EngineError::io(format!("reading config {}", path.display()), e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::config(format!("invalid config {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_values_collect_into_one_error() {
        let config = EngineConfig {
            confidence_min: 2.0,
            max_history: 1,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("confidence_min"));
        assert!(message.contains("max_history"));
    }

    #[test]
    fn missing_config_path_yields_defaults() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
