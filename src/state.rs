//! State manager: orchestrates decay -> stimulus -> rumination advance,
//! enforces the invariants of §3, and bumps metadata. §4.6.
//!
//! Every operation here is a pure transformation: it takes `&EngineState`
//! and returns a fresh `EngineState`. Nothing is mutated in place --
//! mirrors the teacher's "object spread becomes explicit new-value
//! contracts" rearchitecture (spec Design Notes).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::emotion::{BasicEmotions, Dimensions};
use crate::error::EngineError;
use crate::goals;
use crate::mapping::Taxonomy;
use crate::personality::{DecayRates, EmotionDecayRates, Personality};
use crate::presets::PresetCatalogue;
use crate::rumination::Rumination;
use crate::stimulus::{RecentStimuli, Stimulus};

pub const CURRENT_VERSION: u32 = 2;

/// A role a stimulus bucket is tracked under (§3 per-role buckets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
}

/// `{latest, history}` bucket for a single user or agent id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerRoleBucket {
    pub latest: Option<Stimulus>,
    pub history: Vec<Stimulus>,
}

impl PerRoleBucket {
    fn record(&mut self, stimulus: Stimulus, max_history: usize) {
        self.latest = Some(stimulus.clone());
        self.history.insert(0, stimulus);
        self.history.truncate(max_history.max(1));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub total_updates: u64,
    pub created_at: DateTime<Utc>,
    /// Reference instant for decay computation. Distinct from
    /// `EngineState::last_updated` (which only moves at persistence) so
    /// repeated `apply_decay` calls compose correctly (semigroup law, §8).
    pub last_decay_at: DateTime<Utc>,
}

/// The full, persisted engine state. §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub version: u32,
    pub last_updated: DateTime<Utc>,
    pub personality: Personality,
    pub dimensions: Dimensions,
    pub baseline: Dimensions,
    pub decay_rates: DecayRates,
    pub emotion_decay_rates: EmotionDecayRates,
    pub basic_emotions: BasicEmotions,
    pub recent_stimuli: RecentStimuli,
    pub rumination: Rumination,
    pub users: HashMap<String, PerRoleBucket>,
    pub agents: HashMap<String, PerRoleBucket>,
    pub meta: Meta,
}

impl EngineState {
    /// A freshly initialised state at `now`, built from a neutral
    /// personality.
    #[must_use]
    pub fn default_at(now: DateTime<Utc>, half_life_hours: f64) -> Self {
        let personality = Personality::default();
        let (baseline, decay_rates, emotion_decay_rates) = personality.derive_all(half_life_hours);
        Self {
            version: CURRENT_VERSION,
            last_updated: now,
            personality,
            dimensions: baseline,
            baseline,
            decay_rates,
            emotion_decay_rates,
            basic_emotions: BasicEmotions::default(),
            recent_stimuli: RecentStimuli::new(),
            rumination: Rumination::default(),
            users: HashMap::new(),
            agents: HashMap::new(),
            meta: Meta {
                total_updates: 0,
                created_at: now,
                last_decay_at: now,
            },
        }
    }
}

/// Read-only view served to the dashboard/CLI/MCP glue. §6 Observation API.
/// Serialize-only: this is an outbound render, never read back in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub dimensions: Dimensions,
    pub basic_emotions: BasicEmotions,
    pub personality: Personality,
    pub primary_emotion: &'static str,
    pub overall_intensity: f64,
    pub recent_stimuli: Vec<Stimulus>,
    pub rumination: Rumination,
    pub baseline: Dimensions,
    pub meta: Meta,
    pub last_updated: DateTime<Utc>,
}

/// Build the observation snapshot from `state` as-is (no decay applied).
#[must_use]
pub fn observe(state: &EngineState) -> Snapshot {
    Snapshot {
        dimensions: state.dimensions,
        basic_emotions: state.basic_emotions,
        personality: state.personality,
        primary_emotion: state.basic_emotions.primary(),
        overall_intensity: state.basic_emotions.overall_intensity(),
        recent_stimuli: state.recent_stimuli.recent(10),
        rumination: state.rumination.clone(),
        baseline: state.baseline,
        meta: state.meta.clone(),
        last_updated: state.last_updated,
    }
}

/// Build an observation snapshot previewing decay at `now`, without
/// persisting it. Readers apply decay against a snapshot; they don't
/// persist unless the consumer explicitly requests it (§6).
#[must_use]
pub fn observe_at(state: &EngineState, now: DateTime<Utc>) -> Snapshot {
    observe(&apply_decay(state, now))
}

/// `Δ = (value - target) * (1 - 2^(-elapsed/halflife))`, returning the new
/// value `target + (value - target) * 2^(-elapsed/halflife)`.
fn decay_towards(value: f64, target: f64, elapsed_hours: f64, half_life_hours: f64) -> f64 {
    if half_life_hours <= 0.0 {
        return target;
    }
    let factor = 2f64.powf(-elapsed_hours / half_life_hours);
    target + (value - target) * factor
}

/// Move every dimension toward `baseline` and every basic emotion toward
/// zero, by elapsed wall-clock time since `meta.last_decay_at`. §4.6 item 2.
#[must_use]
pub fn apply_decay(state: &EngineState, now: DateTime<Utc>) -> EngineState {
    let elapsed_hours = (now - state.meta.last_decay_at).num_milliseconds() as f64 / 3_600_000.0;
    let elapsed_hours = elapsed_hours.max(0.0);

    let mut dims = state.dimensions;
    for (name, value) in state.dimensions.iter() {
        let target = state.baseline.get(name);
        let half_life = state.decay_rates.get(name);
        dims = dims.with(name, decay_towards(value, target, elapsed_hours, half_life));
    }
    let dims = dims.clamped();

    let mut emotions = state.basic_emotions;
    for (name, value) in state.basic_emotions.iter() {
        let half_life = state.emotion_decay_rates.get(name);
        emotions = emotions.with(name, decay_towards(value, 0.0, elapsed_hours, half_life));
    }
    let emotions = emotions.clamped();

    debug!(elapsed_hours, "applied decay");

    let mut out = state.clone();
    out.dimensions = dims;
    out.basic_emotions = emotions;
    out.meta.last_decay_at = now;
    out
}

/// Apply a classified stimulus: resolve its label, goal-modulate its
/// intensity, apply dimension+emotion deltas, maybe ignite rumination, and
/// record it in history. §4.6 item 3.
#[must_use]
pub fn apply_stimulus(
    state: &EngineState,
    taxonomy: &Taxonomy,
    label: &str,
    intensity: f64,
    reason: &str,
    confidence: f64,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> EngineState {
    let intensity = intensity.clamp(0.0, 1.0);
    let active_goals = goals::infer_goals(&state.personality);
    let effective_intensity = goals::modulate_intensity(&active_goals, label, intensity);

    let (dims, emotions) = match taxonomy.resolve(label) {
        Some(delta) => delta.apply(&state.dimensions, &state.basic_emotions, effective_intensity),
        None => (state.dimensions, state.basic_emotions),
    };

    let stimulus = Stimulus::new(label, intensity, reason, confidence, now);

    let mut rumination = state.rumination.clone();
    let ignition_probability = state.personality.rumination_probability(config.rumination_probability);
    if crate::rumination::should_ignite(effective_intensity, config.rumination_threshold, ignition_probability) {
        rumination.ignite(stimulus.id, label, effective_intensity, now);
    }

    let mut recent_stimuli = state.recent_stimuli.clone();
    recent_stimuli.push(stimulus, config.max_history);

    info!(
        label,
        intensity,
        effective_intensity,
        goals = active_goals.len(),
        "applied stimulus"
    );

    let mut out = state.clone();
    out.dimensions = dims;
    out.basic_emotions = emotions;
    out.rumination = rumination;
    out.recent_stimuli = recent_stimuli;
    out.meta.total_updates += 1;
    out
}

/// Record a stimulus into a per-actor bucket (§3 per-role buckets), used by
/// the dashboard and cross-agent peek. This is a supplementary bookkeeping
/// operation alongside `apply_stimulus`, not a replacement for it --
/// `apply_stimulus`'s signature in §4.6 carries no actor id, so bucket
/// recording is modeled as a distinct call the caller makes when it knows
/// which user/agent the stimulus came from.
#[must_use]
pub fn record_actor_stimulus(
    state: &EngineState,
    role: Role,
    id: &str,
    stimulus: Stimulus,
    config: &EngineConfig,
) -> EngineState {
    let mut out = state.clone();
    let buckets = match role {
        Role::User => &mut out.users,
        Role::Agent => &mut out.agents,
    };
    buckets
        .entry(id.to_string())
        .or_default()
        .record(stimulus, config.max_history);
    out
}

/// One rumination advance step plus effect re-application. §4.6 item 4.
#[must_use]
pub fn advance_rumination(state: &EngineState, taxonomy: &Taxonomy, config: &EngineConfig, now: DateTime<Utc>) -> EngineState {
    let mut rumination = state.rumination.clone();
    rumination.advance(config.rumination_decay_factor, config.rumination_max_stages, now);

    let effects = rumination.effects(taxonomy, config.rumination_effect_scale);
    let mut dims = state.dimensions;
    let mut emotions = state.basic_emotions;
    for (delta, effective_intensity) in effects {
        let (new_dims, new_emotions) = delta.apply(&dims, &emotions, effective_intensity);
        dims = new_dims;
        emotions = new_emotions;
    }

    let mut out = state.clone();
    out.rumination = rumination;
    out.dimensions = dims;
    out.basic_emotions = emotions;
    out
}

/// Clamp, store, and recompute baseline + both decay tables. §4.6 item 5.
pub fn set_personality_trait(
    state: &EngineState,
    trait_name: &str,
    value: f64,
    config: &EngineConfig,
) -> Result<EngineState, EngineError> {
    let updated = state
        .personality
        .with(trait_name, value)
        .ok_or_else(|| EngineError::validation(format!("unknown personality trait: {trait_name}")))?;

    let (baseline, decay_rates, emotion_decay_rates) = updated.derive_all(config.half_life_hours);

    let mut out = state.clone();
    out.personality = updated;
    out.baseline = baseline;
    out.decay_rates = decay_rates;
    out.emotion_decay_rates = emotion_decay_rates;
    Ok(out)
}

/// Apply a named personality preset, recomputing baseline + decay tables
/// and incrementing `totalUpdates`. §6.
pub fn apply_preset(
    state: &EngineState,
    id: &str,
    catalogue: &PresetCatalogue,
    config: &EngineConfig,
) -> Result<EngineState, EngineError> {
    let preset = catalogue
        .get(id)
        .ok_or_else(|| EngineError::config(format!("unknown personality preset: {id}")))?;

    let (baseline, decay_rates, emotion_decay_rates) = preset.personality.derive_all(config.half_life_hours);

    let mut out = state.clone();
    out.personality = preset.personality;
    out.baseline = baseline;
    out.decay_rates = decay_rates;
    out.emotion_decay_rates = emotion_decay_rates;
    out.meta.total_updates += 1;
    Ok(out)
}

/// Reset dimensions/emotions/rumination/stimuli to defaults, retaining
/// personality, baseline, and `meta.created_at`. §4.6 item 6.
#[must_use]
pub fn reset(state: &EngineState, now: DateTime<Utc>) -> EngineState {
    let mut out = state.clone();
    out.dimensions = state.baseline;
    out.basic_emotions = BasicEmotions::default();
    out.rumination = Rumination::default();
    out.recent_stimuli = RecentStimuli::new();
    out.meta.total_updates += 1;
    out.meta.last_decay_at = now;
    out
}

/// Fresh random stimulus id helper, re-exported for callers building
/// actor-bucket entries outside of `apply_stimulus`.
#[must_use]
pub fn new_stimulus_id() -> Uuid {
    Uuid::new_v4()
}
