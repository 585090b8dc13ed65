//! Personality model.
//!
//! Derives a resting [`Dimensions`] baseline and per-axis / per-emotion
//! decay half-lives from the five-trait OCEAN profile. These three
//! derivations (`baseline`, `decay_rates`, `emotion_decay_rates`) are pure
//! functions of `Personality` plus the configured base half-life -- no
//! hidden state, recomputed in full whenever a trait changes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::emotion::Dimensions;

/// The five OCEAN traits, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personality {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
        }
    }
}

/// Half-lives (hours) for the seven dimensional axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayRates {
    pub pleasure: f64,
    pub arousal: f64,
    pub dominance: f64,
    pub connection: f64,
    pub curiosity: f64,
    pub energy: f64,
    pub trust: f64,
}

impl DecayRates {
    #[must_use]
    pub fn get(&self, name: &str) -> f64 {
        match name {
            "pleasure" => self.pleasure,
            "arousal" => self.arousal,
            "dominance" => self.dominance,
            "connection" => self.connection,
            "curiosity" => self.curiosity,
            "energy" => self.energy,
            "trust" => self.trust,
            _ => {
                debug_assert!(false, "unknown dimension: {name}");
                12.0
            }
        }
    }
}

/// Half-lives (hours) for the six basic emotions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionDecayRates {
    pub happiness: f64,
    pub sadness: f64,
    pub anger: f64,
    pub fear: f64,
    pub disgust: f64,
    pub surprise: f64,
}

impl EmotionDecayRates {
    #[must_use]
    pub fn get(&self, name: &str) -> f64 {
        match name {
            "happiness" => self.happiness,
            "sadness" => self.sadness,
            "anger" => self.anger,
            "fear" => self.fear,
            "disgust" => self.disgust,
            "surprise" => self.surprise,
            _ => {
                debug_assert!(false, "unknown emotion: {name}");
                12.0
            }
        }
    }
}

impl Personality {
    /// Clamp a trait value into `[0, 1]`.
    #[must_use]
    pub fn clamp_trait(v: f64) -> f64 {
        v.clamp(0.0, 1.0)
    }

    /// Fresh copy with every trait clamped to `[0, 1]`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            openness: Self::clamp_trait(self.openness),
            conscientiousness: Self::clamp_trait(self.conscientiousness),
            extraversion: Self::clamp_trait(self.extraversion),
            agreeableness: Self::clamp_trait(self.agreeableness),
            neuroticism: Self::clamp_trait(self.neuroticism),
        }
    }

    /// Get a trait value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "openness" => Some(self.openness),
            "conscientiousness" => Some(self.conscientiousness),
            "extraversion" => Some(self.extraversion),
            "agreeableness" => Some(self.agreeableness),
            "neuroticism" => Some(self.neuroticism),
            _ => None,
        }
    }

    /// Return a copy with `name` set to clamped `value`. `None` if `name`
    /// isn't a recognized trait.
    #[must_use]
    pub fn with(&self, name: &str, value: f64) -> Option<Self> {
        let value = Self::clamp_trait(value);
        let mut out = *self;
        match name {
            "openness" => out.openness = value,
            "conscientiousness" => out.conscientiousness = value,
            "extraversion" => out.extraversion = value,
            "agreeableness" => out.agreeableness = value,
            "neuroticism" => out.neuroticism = value,
            _ => return None,
        }
        Some(out)
    }

    /// Derive the resting dimensional baseline. §4.2.
    #[must_use]
    pub fn baseline(&self) -> Dimensions {
        let o = self.openness;
        let c = self.conscientiousness;
        let e = self.extraversion;
        let a = self.agreeableness;
        let n = self.neuroticism;

        let raw = Dimensions {
            pleasure: 0.3 * (a - n),
            arousal: 0.3 * (e - 0.5) * 2.0,
            dominance: 0.3 * (c - 0.5) * 2.0,
            connection: 0.3 + 0.4 * a,
            curiosity: 0.3 + 0.4 * o,
            energy: 0.3 + 0.4 * e,
            trust: 0.3 + 0.4 * (a - 0.5 * n + 0.5),
        };
        raw.clamped()
    }

    /// Derive per-dimension decay half-lives from `half_life_hours`. §4.2.
    #[must_use]
    pub fn decay_rates(&self, half_life_hours: f64) -> DecayRates {
        let bipolar_factor = 1.0 + 0.5 * self.neuroticism;
        let unipolar_factor = 1.0 + 0.5 * self.conscientiousness;
        DecayRates {
            pleasure: half_life_hours / bipolar_factor,
            arousal: half_life_hours / bipolar_factor,
            dominance: half_life_hours / bipolar_factor,
            connection: half_life_hours * unipolar_factor,
            curiosity: half_life_hours * unipolar_factor,
            energy: half_life_hours * unipolar_factor,
            trust: half_life_hours * unipolar_factor,
        }
    }

    /// Derive per-basic-emotion decay half-lives from `half_life_hours`. §4.2.
    #[must_use]
    pub fn emotion_decay_rates(&self, half_life_hours: f64) -> EmotionDecayRates {
        let threat_factor = 1.0 / (1.0 + 0.5 * self.neuroticism);
        let happiness_factor = 1.0 + 0.3 * self.extraversion;
        EmotionDecayRates {
            happiness: half_life_hours * happiness_factor,
            sadness: half_life_hours,
            anger: half_life_hours * threat_factor,
            fear: half_life_hours * threat_factor,
            disgust: half_life_hours,
            surprise: half_life_hours,
        }
    }

    /// Derive the effective rumination-ignition probability from `base`
    /// (the configured baseline) by this personality's traits: higher
    /// neuroticism raises the chance of fixating on a strong stimulus,
    /// higher openness mildly offsets it (more cognitively flexible, less
    /// prone to dwelling). §4.5 names this probability "personality-
    /// derived"; this is that derivation.
    #[must_use]
    pub fn rumination_probability(&self, base: f64) -> f64 {
        let scaled = base * (1.0 + 0.5 * self.neuroticism) * (1.0 - 0.2 * self.openness);
        scaled.clamp(0.0, 1.0)
    }

    /// Recompute baseline + both decay tables in one call, logging which
    /// derivations were refreshed. Used by every mutation that touches
    /// personality so the three derived artifacts never drift apart.
    #[must_use]
    pub fn derive_all(&self, half_life_hours: f64) -> (Dimensions, DecayRates, EmotionDecayRates) {
        debug!("recomputing baseline and decay tables from personality");
        (
            self.baseline(),
            self.decay_rates(half_life_hours),
            self.emotion_decay_rates(half_life_hours),
        )
    }
}
