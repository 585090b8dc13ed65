//! Rumination: multi-stage decaying re-application of strong stimuli. §4.5.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::mapping::{EmotionDelta, Taxonomy};

/// A single active rumination entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuminationEntry {
    pub stimulus_id: Uuid,
    pub label: String,
    pub stage: u32,
    pub intensity: f64,
    pub last_stage_at: DateTime<Utc>,
}

/// The set of currently active rumination entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rumination {
    pub active: Vec<RuminationEntry>,
}

/// Below this intensity an entry is considered spent and dropped.
const MIN_INTENSITY: f64 = 0.05;

/// Deterministic ignition rule. §4.5:
/// - `probability <= 0` never ignites.
/// - `probability >= 1` ignites whenever `intensity > threshold`.
/// - Otherwise ignites iff `intensity > threshold + 0.3 * (1 - probability)`.
#[must_use]
pub fn should_ignite(intensity: f64, threshold: f64, probability: f64) -> bool {
    if probability <= 0.0 {
        return false;
    }
    if probability >= 1.0 {
        return intensity > threshold;
    }
    intensity > threshold + 0.3 * (1.0 - probability)
}

impl Rumination {
    /// Ignite a new entry for `stimulus_id` unless one is already active
    /// for it.
    pub fn ignite(&mut self, stimulus_id: Uuid, label: impl Into<String>, intensity: f64, now: DateTime<Utc>) {
        if self.active.iter().any(|e| e.stimulus_id == stimulus_id) {
            return;
        }
        let label = label.into();
        debug!(%stimulus_id, %label, intensity, "igniting rumination entry");
        self.active.push(RuminationEntry {
            stimulus_id,
            label,
            stage: 0,
            intensity,
            last_stage_at: now,
        });
    }

    /// Advance every active entry by one stage, multiplying intensity by
    /// `decay_factor` and dropping entries that have expired (`stage >=
    /// max_stages` or `intensity < 0.05`).
    pub fn advance(&mut self, decay_factor: f64, max_stages: u32, now: DateTime<Utc>) {
        for entry in &mut self.active {
            entry.stage += 1;
            entry.intensity *= decay_factor;
            entry.last_stage_at = now;
        }
        self.active
            .retain(|e| e.stage < max_stages && e.intensity >= MIN_INTENSITY);
    }

    /// For every active entry, resolve its label's mapping and the
    /// effective intensity (`entry.intensity * scale`) the caller should
    /// apply. Unknown labels are skipped -- they were no-ops when first
    /// applied too.
    #[must_use]
    pub fn effects<'a>(&self, taxonomy: &'a Taxonomy, scale: f64) -> Vec<(&'a EmotionDelta, f64)> {
        self.active
            .iter()
            .filter_map(|entry| {
                taxonomy
                    .resolve(&entry.label)
                    .map(|delta| (delta, entry.intensity * scale))
            })
            .collect()
    }
}
