//! Mapping table: emotion label -> dimension/emotion deltas.
//!
//! A static dictionary covering the canonical labels plus aliases (§4.3),
//! built once behind a [`std::sync::LazyLock`] in the style of the
//! teacher's const-configuration tables, with an overlay of user-supplied
//! custom mappings consulted first.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::emotion::{BasicEmotions, Dimensions};
use crate::error::EngineError;

const DIMENSION_NAMES: [&str; 7] = [
    "pleasure",
    "arousal",
    "dominance",
    "connection",
    "curiosity",
    "energy",
    "trust",
];

const EMOTION_NAMES: [&str; 6] = [
    "happiness",
    "sadness",
    "anger",
    "fear",
    "disgust",
    "surprise",
];

/// Deltas applied to dimensions and basic emotions by a single label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionDelta {
    pub dimensions: HashMap<String, f64>,
    pub emotions: HashMap<String, f64>,
}

impl EmotionDelta {
    fn new(dimensions: &[(&str, f64)], emotions: &[(&str, f64)]) -> Self {
        Self {
            dimensions: dimensions.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
            emotions: emotions.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
        }
    }

    /// Apply this delta's dimension and emotion deltas at `intensity`,
    /// returning fresh, clamped values.
    #[must_use]
    pub fn apply(&self, dims: &Dimensions, emotions: &BasicEmotions, intensity: f64) -> (Dimensions, BasicEmotions) {
        let mut out_dims = *dims;
        for (name, delta) in &self.dimensions {
            out_dims = out_dims.apply_delta(name, delta * intensity);
        }
        let mut out_emotions = *emotions;
        for (name, delta) in &self.emotions {
            out_emotions = out_emotions.apply_delta(name, delta * intensity);
        }
        (out_dims.clamped(), out_emotions.clamped())
    }

    /// Drop any dimension/emotion keys that aren't part of the closed
    /// vocabulary, logging each drop. Used when validating user-supplied
    /// custom mappings.
    fn validated(mut self, label: &str) -> Self {
        self.dimensions.retain(|k, _| {
            let keep = DIMENSION_NAMES.contains(&k.as_str());
            if !keep {
                warn!(label, dimension = %k, "dropping unknown dimension in custom mapping");
            }
            keep
        });
        self.emotions.retain(|k, _| {
            let keep = EMOTION_NAMES.contains(&k.as_str());
            if !keep {
                warn!(label, emotion = %k, "dropping unknown emotion in custom mapping");
            }
            keep
        });
        self
    }
}

/// Canonical label -> aliases, so the static table only needs to be
/// written once per concept.
fn aliases() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("happy", &["joy", "joyful", "glad", "cheerful"]),
        ("sad", &["sadness", "unhappy", "down", "blue"]),
        ("angry", &["anger", "mad", "irate", "furious"]),
        ("fearful", &["afraid", "scared", "fear", "frightened"]),
        ("curious", &["inquisitive", "intrigued"]),
        ("connected", &["bonded", "close"]),
        ("trusting", &["trustful"]),
        ("disgusted", &["disgust", "repulsed", "grossed_out"]),
        ("surprised", &["surprise", "astonished", "shocked"]),
        ("confused", &["puzzled", "perplexed"]),
        ("frustrated", &["frustration", "annoyed", "exasperated"]),
        ("anxious", &["anxiety", "worried", "nervous", "apprehensive"]),
        ("bored", &["boredom", "uninterested"]),
        ("fatigued", &["tired", "exhausted", "weary"]),
        ("relieved", &["relief"]),
        ("energized", &["energised", "invigorated"]),
        ("focused", &["concentrated", "engaged"]),
        ("excited", &["excitement", "thrilled", "enthusiastic"]),
        ("calm", &["calmness", "relaxed", "peaceful"]),
        ("lonely", &["loneliness", "isolated"]),
        ("neutral", &["none", "flat"]),
    ]
}

/// Build the canonical label -> delta table.
fn canonical_table() -> HashMap<&'static str, EmotionDelta> {
    let mut m = HashMap::new();

    m.insert(
        "happy",
        EmotionDelta::new(&[("pleasure", 0.35), ("energy", 0.1)], &[("happiness", 0.4)]),
    );
    m.insert(
        "sad",
        EmotionDelta::new(&[("pleasure", -0.3), ("arousal", -0.2)], &[("sadness", 0.4)]),
    );
    m.insert(
        "angry",
        EmotionDelta::new(
            &[("pleasure", -0.3), ("arousal", 0.35), ("dominance", 0.15)],
            &[("anger", 0.45)],
        ),
    );
    m.insert(
        "fearful",
        EmotionDelta::new(
            &[("pleasure", -0.25), ("arousal", 0.4), ("dominance", -0.2)],
            &[("fear", 0.45)],
        ),
    );
    m.insert(
        "curious",
        EmotionDelta::new(&[("curiosity", 0.35), ("arousal", 0.1)], &[("surprise", 0.1)]),
    );
    m.insert(
        "connected",
        EmotionDelta::new(&[("connection", 0.35), ("trust", 0.15)], &[("happiness", 0.1)]),
    );
    m.insert(
        "trusting",
        EmotionDelta::new(&[("trust", 0.4)], &[]),
    );
    m.insert(
        "disgusted",
        EmotionDelta::new(&[("pleasure", -0.3), ("dominance", 0.1)], &[("disgust", 0.45)]),
    );
    m.insert(
        "surprised",
        EmotionDelta::new(&[("arousal", 0.3)], &[("surprise", 0.45)]),
    );
    m.insert(
        "confused",
        EmotionDelta::new(&[("dominance", -0.2), ("curiosity", 0.1)], &[("surprise", 0.2), ("fear", 0.1)]),
    );
    m.insert(
        "frustrated",
        EmotionDelta::new(
            &[("pleasure", -0.2), ("arousal", 0.2), ("dominance", -0.15)],
            &[("anger", 0.3)],
        ),
    );
    m.insert(
        "anxious",
        EmotionDelta::new(
            &[("pleasure", -0.15), ("arousal", 0.3), ("dominance", -0.25)],
            &[("fear", 0.35)],
        ),
    );
    m.insert(
        "bored",
        EmotionDelta::new(&[("arousal", -0.3), ("energy", -0.2), ("curiosity", -0.1)], &[]),
    );
    m.insert(
        "fatigued",
        EmotionDelta::new(&[("energy", -0.35), ("arousal", -0.2)], &[]),
    );
    m.insert(
        "relieved",
        EmotionDelta::new(&[("pleasure", 0.25), ("arousal", -0.2), ("dominance", 0.1)], &[("happiness", 0.1)]),
    );
    m.insert(
        "energized",
        EmotionDelta::new(&[("energy", 0.35), ("arousal", 0.2)], &[("happiness", 0.1)]),
    );
    m.insert(
        "focused",
        EmotionDelta::new(&[("dominance", 0.2), ("arousal", 0.1)], &[]),
    );
    m.insert(
        "excited",
        EmotionDelta::new(&[("arousal", 0.35), ("pleasure", 0.2), ("energy", 0.15)], &[("happiness", 0.2), ("surprise", 0.1)]),
    );
    m.insert(
        "calm",
        EmotionDelta::new(&[("arousal", -0.3), ("pleasure", 0.1)], &[]),
    );
    m.insert(
        "lonely",
        EmotionDelta::new(&[("connection", -0.3), ("pleasure", -0.15)], &[("sadness", 0.25)]),
    );
    m.insert("neutral", EmotionDelta::default());

    m
}

/// Label -> canonical label lookup, resolving aliases built once.
fn build_alias_index() -> HashMap<String, &'static str> {
    let mut index = HashMap::new();
    for (canonical, alts) in aliases() {
        index.insert((*canonical).to_string(), *canonical);
        for alt in *alts {
            index.insert((*alt).to_string(), *canonical);
        }
    }
    index
}

static STATIC_TABLE: LazyLock<HashMap<&'static str, EmotionDelta>> = LazyLock::new(canonical_table);
static ALIAS_INDEX: LazyLock<HashMap<String, &'static str>> = LazyLock::new(build_alias_index);

/// A label -> delta taxonomy, static table plus an optional custom overlay.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    custom: HashMap<String, EmotionDelta>,
}

impl Taxonomy {
    /// The static table with no custom overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a taxonomy with user-supplied mappings merged over the static
    /// table. Unknown dimension/emotion names inside each entry are
    /// silently dropped (logged at `warn!`); keys are lowercased.
    #[must_use]
    pub fn with_custom(custom: HashMap<String, EmotionDelta>) -> Self {
        let custom = custom
            .into_iter()
            .map(|(label, delta)| {
                let label = label.to_lowercase();
                let delta = delta.validated(&label);
                (label, delta)
            })
            .collect();
        Self { custom }
    }

    /// Resolve a label (case-insensitive, alias-aware) to its delta.
    /// `None` for anything not found in either table.
    #[must_use]
    pub fn resolve(&self, label: &str) -> Option<&EmotionDelta> {
        let lower = label.to_lowercase();
        if let Some(delta) = self.custom.get(&lower) {
            return Some(delta);
        }
        let canonical = ALIAS_INDEX.get(&lower).copied().unwrap_or(lower.as_str());
        // custom table may also use canonical spelling
        if let Some(delta) = self.custom.get(canonical) {
            return Some(delta);
        }
        STATIC_TABLE.get(canonical)
    }

    /// All known labels (canonical + custom), for enumeration by the
    /// dashboard/CLI. Read-only; does not mutate the taxonomy.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        STATIC_TABLE
            .keys()
            .copied()
            .chain(self.custom.keys().map(String::as_str))
    }
}

/// Load a custom label -> delta overlay from a JSON file, shaped as
/// `{"label": {"dimensions": {...}, "emotions": {...}}, ...}`.
pub fn load_custom(path: &Path) -> Result<HashMap<String, EmotionDelta>, EngineError> {
    let bytes = std::fs::read(path).map_err(|e| EngineError::io(format!("reading custom mappings {}", path.display()), e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| EngineError::config(format!("invalid custom mappings {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_raises_pleasure_and_happiness() {
        let t = Taxonomy::new();
        let d = t.resolve("happy").unwrap();
        assert!(d.dimensions["pleasure"] > 0.0);
        assert!(d.emotions["happiness"] > 0.0);
    }

    #[test]
    fn joy_alias_resolves_to_happy() {
        let t = Taxonomy::new();
        assert_eq!(t.resolve("joy"), t.resolve("happy"));
        assert_eq!(t.resolve("JOY"), t.resolve("happy"));
    }

    #[test]
    fn angry_lowers_pleasure_raises_arousal_and_anger() {
        let t = Taxonomy::new();
        let d = t.resolve("angry").unwrap();
        assert!(d.dimensions["pleasure"] < 0.0);
        assert!(d.dimensions["arousal"] > 0.0);
        assert!(d.emotions["anger"] > 0.0);
    }

    #[test]
    fn sad_lowers_pleasure_and_arousal() {
        let t = Taxonomy::new();
        let d = t.resolve("sad").unwrap();
        assert!(d.dimensions["pleasure"] < 0.0);
        assert!(d.dimensions["arousal"] < 0.0);
        assert!(d.emotions["sadness"] > 0.0);
    }

    #[test]
    fn fearful_lowers_pleasure_raises_arousal_and_fear() {
        let t = Taxonomy::new();
        let d = t.resolve("fearful").unwrap();
        assert!(d.dimensions["pleasure"] < 0.0);
        assert!(d.dimensions["arousal"] > 0.0);
        assert!(d.emotions["fear"] > 0.0);
    }

    #[test]
    fn curious_raises_curiosity() {
        let t = Taxonomy::new();
        assert!(t.resolve("curious").unwrap().dimensions["curiosity"] > 0.0);
    }

    #[test]
    fn connected_raises_connection() {
        let t = Taxonomy::new();
        assert!(t.resolve("connected").unwrap().dimensions["connection"] > 0.0);
    }

    #[test]
    fn neutral_has_no_deltas() {
        let t = Taxonomy::new();
        let d = t.resolve("neutral").unwrap();
        assert!(d.dimensions.is_empty());
        assert!(d.emotions.is_empty());
    }

    #[test]
    fn unknown_label_resolves_to_none() {
        let t = Taxonomy::new();
        assert!(t.resolve("zorbulated").is_none());
    }

    #[test]
    fn custom_mapping_overrides_static_and_drops_unknown_keys() {
        let mut custom = HashMap::new();
        let mut overridden = EmotionDelta::default();
        overridden.dimensions.insert("pleasure".into(), 0.99);
        overridden.dimensions.insert("not_a_real_axis".into(), 1.0);
        custom.insert("HAPPY".to_string(), overridden);

        let t = Taxonomy::with_custom(custom);
        let d = t.resolve("happy").unwrap();
        assert!((d.dimensions["pleasure"] - 0.99).abs() < f64::EPSILON);
        assert!(!d.dimensions.contains_key("not_a_real_axis"));
    }

    #[test]
    fn load_custom_reads_label_delta_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{"battle_cry": {"dimensions": {"dominance": 0.5}, "emotions": {"anger": 0.2}}}"#,
        )
        .unwrap();

        let custom = load_custom(&path).unwrap();
        let delta = &custom["battle_cry"];
        assert!((delta.dimensions["dominance"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn apply_scales_by_intensity_and_clamps() {
        let t = Taxonomy::new();
        let d = t.resolve("happy").unwrap();
        let (dims, emotions) = d.apply(&Dimensions::default(), &BasicEmotions::default(), 0.0);
        assert!((dims.pleasure - 0.0).abs() < 1e-9);
        assert!((emotions.happiness - 0.0).abs() < 1e-9);
    }
}
