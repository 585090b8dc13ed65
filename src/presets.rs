//! Personality presets: a static, read-only catalogue of named OCEAN
//! profiles (§6).

use std::sync::LazyLock;

use crate::personality::Personality;

/// A single named personality preset.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub rationale: &'static str,
    pub personality: Personality,
}

fn build_catalogue() -> Vec<Preset> {
    vec![
        Preset {
            id: "balanced",
            display_name: "Balanced",
            description: "No trait dominates; the agent starts at the origin.",
            rationale: "Useful as a neutral starting point for new deployments.",
            personality: Personality {
                openness: 0.5,
                conscientiousness: 0.5,
                extraversion: 0.5,
                agreeableness: 0.5,
                neuroticism: 0.5,
            },
        },
        Preset {
            id: "mandela",
            display_name: "Mandela",
            description: "Warm, steady, forgiving under pressure.",
            rationale: "High agreeableness and low neuroticism give a positive pleasure baseline and slow emotional swings, matching a calm, reconciliatory temperament.",
            personality: Personality {
                openness: 0.65,
                conscientiousness: 0.6,
                extraversion: 0.55,
                agreeableness: 0.85,
                neuroticism: 0.15,
            },
        },
        Preset {
            id: "stoic",
            display_name: "Stoic",
            description: "Unflappable, low arousal, high self-regulation.",
            rationale: "Low neuroticism and high conscientiousness keep bipolar swings short and the self-regulation goal active by default.",
            personality: Personality {
                openness: 0.4,
                conscientiousness: 0.8,
                extraversion: 0.3,
                agreeableness: 0.5,
                neuroticism: 0.1,
            },
        },
        Preset {
            id: "explorer",
            display_name: "Explorer",
            description: "Curious, energetic, drawn to novelty.",
            rationale: "High openness and extraversion activate both the exploration and novelty_seeking goals, amplifying curiosity/excitement stimuli.",
            personality: Personality {
                openness: 0.85,
                conscientiousness: 0.4,
                extraversion: 0.75,
                agreeableness: 0.55,
                neuroticism: 0.35,
            },
        },
        Preset {
            id: "guardian",
            display_name: "Guardian",
            description: "Protective, dutiful, mildly anxious under threat.",
            rationale: "High conscientiousness and agreeableness with moderate neuroticism activate task_completion and social_harmony while leaving threat responses slightly amplified.",
            personality: Personality {
                openness: 0.45,
                conscientiousness: 0.75,
                extraversion: 0.4,
                agreeableness: 0.7,
                neuroticism: 0.5,
            },
        },
    ]
}

static CATALOGUE: LazyLock<Vec<Preset>> = LazyLock::new(build_catalogue);

/// Read-only view over the static preset catalogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresetCatalogue;

impl PresetCatalogue {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'static Preset> {
        CATALOGUE.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn all(&self) -> &'static [Preset] {
        &CATALOGUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandela_preset_has_positive_pleasure_baseline() {
        let catalogue = PresetCatalogue;
        let preset = catalogue.get("mandela").unwrap();
        assert!(preset.personality.baseline().pleasure > 0.0);
    }

    #[test]
    fn unknown_preset_id_is_none() {
        let catalogue = PresetCatalogue;
        assert!(catalogue.get("does-not-exist").is_none());
    }

    #[test]
    fn every_preset_has_a_unique_id() {
        let catalogue = PresetCatalogue;
        let mut ids: Vec<_> = catalogue.all().iter().map(|p| p.id).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }
}
