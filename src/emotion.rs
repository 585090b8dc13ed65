//! Emotion primitives.
//!
//! Pure, allocation-light, side-effect-free operations over the two core
//! value types: the seven-axis dimensional state and the six basic emotion
//! levels. Nothing in this module touches the clock, the filesystem, or
//! personality -- it is the bottom of the dependency graph.

use serde::{Deserialize, Serialize};

/// Bipolar dimensions range over `[-1, 1]`; unipolar ones over `[0, 1]`.
const BIPOLAR: [&str; 3] = ["pleasure", "arousal", "dominance"];
const UNIPOLAR: [&str; 4] = ["connection", "curiosity", "energy", "trust"];

/// Clamp a named dimension value into its declared range.
///
/// # Panics
///
/// In debug builds, panics on an unrecognized dimension name -- the set of
/// dimension names is closed and known at compile time, so an unknown name
/// reaching here is a programming error, not user input.
#[must_use]
pub fn clamp_dimension(name: &str, v: f64) -> f64 {
    if BIPOLAR.contains(&name) {
        v.clamp(-1.0, 1.0)
    } else if UNIPOLAR.contains(&name) {
        v.clamp(0.0, 1.0)
    } else {
        debug_assert!(false, "unknown dimension: {name}");
        v
    }
}

/// The seven named PAD-plus-extension dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub pleasure: f64,
    pub arousal: f64,
    pub dominance: f64,
    pub connection: f64,
    pub curiosity: f64,
    pub energy: f64,
    pub trust: f64,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            pleasure: 0.0,
            arousal: 0.0,
            dominance: 0.0,
            connection: 0.5,
            curiosity: 0.5,
            energy: 0.5,
            trust: 0.5,
        }
    }
}

impl Dimensions {
    /// Get a dimension by name.
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
                0.0
            }
        }
    }

    /// Return a copy with `name` set to `value` (unclamped -- callers that
    /// need the invariant should use [`Dimensions::apply_delta`] or
    /// [`Dimensions::clamped`]).
    #[must_use]
    pub fn with(&self, name: &str, value: f64) -> Self {
        let mut out = *self;
        match name {
            "pleasure" => out.pleasure = value,
            "arousal" => out.arousal = value,
            "dominance" => out.dominance = value,
            "connection" => out.connection = value,
            "curiosity" => out.curiosity = value,
            "energy" => out.energy = value,
            "trust" => out.trust = value,
            _ => debug_assert!(false, "unknown dimension: {name}"),
        }
        out
    }

    /// Fresh copy with every axis clamped to its declared range.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            pleasure: clamp_dimension("pleasure", self.pleasure),
            arousal: clamp_dimension("arousal", self.arousal),
            dominance: clamp_dimension("dominance", self.dominance),
            connection: clamp_dimension("connection", self.connection),
            curiosity: clamp_dimension("curiosity", self.curiosity),
            energy: clamp_dimension("energy", self.energy),
            trust: clamp_dimension("trust", self.trust),
        }
    }

    /// Apply a delta to a single dimension, returning a fresh, clamped copy.
    #[must_use]
    pub fn apply_delta(&self, name: &str, delta: f64) -> Self {
        let current = self.get(name);
        self.with(name, clamp_dimension(name, current + delta))
    }

    /// Iterate over `(name, value)` pairs in a stable order.
    #[must_use]
    pub fn iter(&self) -> [(&'static str, f64); 7] {
        [
            ("pleasure", self.pleasure),
            ("arousal", self.arousal),
            ("dominance", self.dominance),
            ("connection", self.connection),
            ("curiosity", self.curiosity),
            ("energy", self.energy),
            ("trust", self.trust),
        ]
    }
}

/// The six basic emotion levels, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BasicEmotions {
    pub happiness: f64,
    pub sadness: f64,
    pub anger: f64,
    pub fear: f64,
    pub disgust: f64,
    pub surprise: f64,
}

/// Names in alphabetical order, used for deterministic tie-breaking in
/// [`BasicEmotions::primary`].
const EMOTION_NAMES_ALPHA: [&str; 6] =
    ["anger", "disgust", "fear", "happiness", "sadness", "surprise"];

/// Values below this are treated as "not really feeling it" for the
/// purposes of primary-emotion selection.
const NEUTRALITY_THRESHOLD: f64 = 0.05;

impl BasicEmotions {
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
                0.0
            }
        }
    }

    #[must_use]
    pub fn with(&self, name: &str, value: f64) -> Self {
        let mut out = *self;
        match name {
            "happiness" => out.happiness = value,
            "sadness" => out.sadness = value,
            "anger" => out.anger = value,
            "fear" => out.fear = value,
            "disgust" => out.disgust = value,
            "surprise" => out.surprise = value,
            _ => debug_assert!(false, "unknown emotion: {name}"),
        }
        out
    }

    /// Fresh copy with every level clamped to `[0, 1]`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            happiness: self.happiness.clamp(0.0, 1.0),
            sadness: self.sadness.clamp(0.0, 1.0),
            anger: self.anger.clamp(0.0, 1.0),
            fear: self.fear.clamp(0.0, 1.0),
            disgust: self.disgust.clamp(0.0, 1.0),
            surprise: self.surprise.clamp(0.0, 1.0),
        }
    }

    /// Apply a delta to a single basic emotion, returning a fresh, clamped
    /// copy.
    #[must_use]
    pub fn apply_delta(&self, name: &str, delta: f64) -> Self {
        let current = self.get(name);
        self.with(name, (current + delta).clamp(0.0, 1.0))
    }

    /// The basic emotion with the highest value, or `"neutral"` if none
    /// clears [`NEUTRALITY_THRESHOLD`]. Ties are broken alphabetically
    /// ascending so the result is deterministic across platforms.
    #[must_use]
    pub fn primary(&self) -> &'static str {
        let mut best_name = "neutral";
        let mut best_value = NEUTRALITY_THRESHOLD;
        for name in EMOTION_NAMES_ALPHA {
            let value = self.get(name);
            if value > best_value {
                best_value = value;
                best_name = name;
            }
        }
        best_name
    }

    /// RMS of the six levels, clamped to `[0, 1]`.
    #[must_use]
    pub fn overall_intensity(&self) -> f64 {
        let values = [
            self.happiness,
            self.sadness,
            self.anger,
            self.fear,
            self.disgust,
            self.surprise,
        ];
        let sum_sq: f64 = values.iter().map(|v| v * v).sum();
        let rms = (sum_sq / values.len() as f64).sqrt();
        rms.clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn iter(&self) -> [(&'static str, f64); 6] {
        [
            ("happiness", self.happiness),
            ("sadness", self.sadness),
            ("anger", self.anger),
            ("fear", self.fear),
            ("disgust", self.disgust),
            ("surprise", self.surprise),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_dimension_bipolar_and_unipolar() {
        assert!((clamp_dimension("pleasure", 2.0) - 1.0).abs() < f64::EPSILON);
        assert!((clamp_dimension("pleasure", -2.0) - -1.0).abs() < f64::EPSILON);
        assert!((clamp_dimension("trust", 2.0) - 1.0).abs() < f64::EPSILON);
        assert!((clamp_dimension("trust", -2.0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dimensions_apply_delta_clamps() {
        let d = Dimensions::default();
        let d2 = d.apply_delta("pleasure", 5.0);
        assert!((d2.pleasure - 1.0).abs() < f64::EPSILON);
        // original untouched
        assert!((d.pleasure - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn primary_emotion_neutral_on_zeros() {
        let e = BasicEmotions::default();
        assert_eq!(e.primary(), "neutral");
    }

    #[test]
    fn primary_emotion_ties_break_alphabetically() {
        let e = BasicEmotions {
            happiness: 0.5,
            anger: 0.5,
            ..Default::default()
        };
        assert_eq!(e.primary(), "anger");
    }

    #[test]
    fn primary_emotion_picks_argmax() {
        let e = BasicEmotions {
            fear: 0.9,
            anger: 0.3,
            ..Default::default()
        };
        assert_eq!(e.primary(), "fear");
    }

    #[test]
    fn overall_intensity_is_rms() {
        let e = BasicEmotions {
            happiness: 1.0,
            ..Default::default()
        };
        let expected = (1.0f64 / 6.0).sqrt();
        assert!((e.overall_intensity() - expected).abs() < 1e-9);
    }

    #[test]
    fn apply_delta_is_pure() {
        let e = BasicEmotions::default();
        let e2 = e.apply_delta("anger", 0.3);
        assert!((e.anger - 0.0).abs() < f64::EPSILON);
        assert!((e2.anger - 0.3).abs() < f64::EPSILON);
    }
}
