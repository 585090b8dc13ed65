//! Goal modulation.
//!
//! Infers implicit behavioral goals from an agent's personality (threshold
//! `0.6` on the driving trait) and amplifies a label's intensity when the
//! incoming emotion threatens or achieves one of those goals. §4.4.

use serde::{Deserialize, Serialize};

use crate::personality::Personality;

/// An inferred, active goal with its label sets and current strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub name: &'static str,
    pub strength: f64,
    pub threat: &'static [&'static str],
    pub achieve: &'static [&'static str],
}

const TASK_COMPLETION_THREAT: [&str; 4] = ["frustrated", "anxious", "confused", "fatigued"];
const TASK_COMPLETION_ACHIEVE: [&str; 4] = ["happy", "relieved", "energized", "focused"];
const EXPLORATION_THREAT: [&str; 2] = ["bored", "frustrated"];
const EXPLORATION_ACHIEVE: [&str; 3] = ["curious", "excited", "surprised"];
const SOCIAL_HARMONY_THREAT: [&str; 3] = ["angry", "disgusted", "lonely"];
const SOCIAL_HARMONY_ACHIEVE: [&str; 4] = ["connected", "trusting", "happy", "calm"];
const SELF_REGULATION_THREAT: [&str; 2] = ["angry", "anxious"];
const SELF_REGULATION_ACHIEVE: [&str; 3] = ["calm", "focused", "relieved"];
const NOVELTY_SEEKING_THREAT: [&str; 2] = ["bored", "fatigued"];
const NOVELTY_SEEKING_ACHIEVE: [&str; 4] = ["excited", "curious", "surprised", "energized"];

/// Normalized distance past `threshold`, clipped to `[0, 1]`.
fn strength_past(value: f64, threshold: f64, span: f64) -> f64 {
    ((value - threshold) / span).clamp(0.0, 1.0)
}

/// Infer every goal that clears its activation threshold for `p`.
#[must_use]
pub fn infer_goals(p: &Personality) -> Vec<Goal> {
    let mut goals = Vec::new();

    if p.conscientiousness > 0.6 {
        goals.push(Goal {
            name: "task_completion",
            strength: strength_past(p.conscientiousness, 0.6, 0.4),
            threat: &TASK_COMPLETION_THREAT,
            achieve: &TASK_COMPLETION_ACHIEVE,
        });
    }

    if p.openness > 0.6 {
        goals.push(Goal {
            name: "exploration",
            strength: strength_past(p.openness, 0.6, 0.4),
            threat: &EXPLORATION_THREAT,
            achieve: &EXPLORATION_ACHIEVE,
        });
    }

    if p.agreeableness > 0.6 {
        goals.push(Goal {
            name: "social_harmony",
            strength: strength_past(p.agreeableness, 0.6, 0.4),
            threat: &SOCIAL_HARMONY_THREAT,
            achieve: &SOCIAL_HARMONY_ACHIEVE,
        });
    }

    if p.conscientiousness > 0.6 && p.neuroticism < 0.4 {
        let c_strength = strength_past(p.conscientiousness, 0.6, 0.4);
        let n_strength = strength_past(0.4 - p.neuroticism, 0.0, 0.4);
        goals.push(Goal {
            name: "self_regulation",
            strength: c_strength.min(n_strength),
            threat: &SELF_REGULATION_THREAT,
            achieve: &SELF_REGULATION_ACHIEVE,
        });
    }

    if p.openness > 0.7 && p.extraversion > 0.6 {
        let o_strength = strength_past(p.openness, 0.7, 0.3);
        let e_strength = strength_past(p.extraversion, 0.6, 0.4);
        goals.push(Goal {
            name: "novelty_seeking",
            strength: o_strength.min(e_strength),
            threat: &NOVELTY_SEEKING_THREAT,
            achieve: &NOVELTY_SEEKING_ACHIEVE,
        });
    }

    goals
}

/// Multiplier starts at `1.0`, accumulates `+0.3*strength` per threatening
/// goal and `+0.2*strength` per achieving goal whose label set contains
/// `label`; effective intensity is `min(1.0, intensity * multiplier)`.
#[must_use]
pub fn modulate_intensity(goals: &[Goal], label: &str, intensity: f64) -> f64 {
    let lower = label.to_lowercase();
    let mut multiplier = 1.0;
    for goal in goals {
        if goal.threat.contains(&lower.as_str()) {
            multiplier += 0.3 * goal.strength;
        }
        if goal.achieve.contains(&lower.as_str()) {
            multiplier += 0.2 * goal.strength;
        }
    }
    (intensity * multiplier).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_trait_personality_has_no_goals() {
        let p = Personality {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
        };
        assert!(infer_goals(&p).is_empty());
    }

    #[test]
    fn high_conscientiousness_activates_task_completion() {
        let p = Personality {
            conscientiousness: 0.9,
            neuroticism: 0.5,
            ..Personality::default()
        };
        let goals = infer_goals(&p);
        assert!(goals.iter().any(|g| g.name == "task_completion"));
    }

    #[test]
    fn conjunctive_goal_uses_min_strength() {
        let p = Personality {
            conscientiousness: 0.62, // barely past 0.6
            neuroticism: 0.0,        // far past 0.4 threshold on the other side
            ..Personality::default()
        };
        let goals = infer_goals(&p);
        let self_reg = goals.iter().find(|g| g.name == "self_regulation").unwrap();
        let c_strength = strength_past(0.62, 0.6, 0.4);
        assert!((self_reg.strength - c_strength).abs() < 1e-9);
    }

    #[test]
    fn goal_amplification_raises_effective_intensity_for_threat_label() {
        let p = Personality {
            conscientiousness: 0.9,
            neuroticism: 0.2,
            ..Personality::default()
        };
        let goals = infer_goals(&p);
        let modulated = modulate_intensity(&goals, "frustrated", 0.5);
        assert!(modulated > 0.5);
    }

    #[test]
    fn modulation_is_capped_at_one() {
        let goals = vec![Goal {
            name: "task_completion",
            strength: 1.0,
            threat: &TASK_COMPLETION_THREAT,
            achieve: &TASK_COMPLETION_ACHIEVE,
        }];
        let modulated = modulate_intensity(&goals, "frustrated", 0.95);
        assert!(modulated <= 1.0);
    }

    #[test]
    fn unmatched_label_is_unmodulated() {
        let p = Personality {
            conscientiousness: 0.9,
            ..Personality::default()
        };
        let goals = infer_goals(&p);
        let modulated = modulate_intensity(&goals, "curious", 0.5);
        assert!((modulated - 0.5).abs() < 1e-9);
    }
}
