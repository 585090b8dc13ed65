//! Cross-agent peek: a read-only glance at sibling agents' most recent
//! stimulus, by directory convention. §4.8.
//!
//! Layout: `<agents_root>/<id>/agent/emotion-engine.json` for every sibling
//! `id`. Reading never mutates a sibling's state -- this is a passive
//! observation, grounded the same way [`crate::persistence::load`] recovers
//! from a missing or malformed file rather than erroring.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::state::EngineState;
use crate::stimulus::Stimulus;

/// A sibling agent's most recently recorded stimulus, as seen from outside.
/// Serialize-only: this is an outbound render, never read back in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeekEntry {
    pub id: String,
    pub latest: Option<Stimulus>,
}

/// Resolve the stimulus a peek should report for a sibling's state: the
/// bucket keyed by the sibling's own `id` in its `agents` map, falling
/// back to whichever agent bucket sorts first by key if no bucket is
/// keyed by `id`.
fn latest_for(state: &EngineState, id: &str) -> Option<Stimulus> {
    if let Some(bucket) = state.agents.get(id) {
        return bucket.latest.clone();
    }
    state
        .agents
        .iter()
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .and_then(|(_, bucket)| bucket.latest.clone())
}

/// The relative path, within a sibling's directory, to its state file.
fn sibling_state_path(agents_root: &Path, id: &str) -> std::path::PathBuf {
    agents_root.join(id).join("agent").join("emotion-engine.json")
}

/// List every sibling under `agents_root` (excluding `current_id`), read
/// each one's state file, and return up to `limit` entries sorted by id.
/// Siblings with a missing or unreadable state file are skipped rather
/// than surfaced as an error -- a sibling mid-boot or mid-crash should not
/// break the caller's peek.
#[must_use]
pub fn peek_siblings(agents_root: &Path, current_id: &str, limit: usize) -> Vec<PeekEntry> {
    let entries = match fs::read_dir(agents_root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %agents_root.display(), error = %e, "agents root not readable, no siblings to peek");
            return Vec::new();
        }
    };

    let mut peeked: Vec<PeekEntry> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let id = entry.file_name().to_string_lossy().into_owned();
            if id == current_id {
                return None;
            }
            let state_path = sibling_state_path(agents_root, &id);
            let bytes = fs::read(&state_path).ok()?;
            let state: EngineState = serde_json::from_slice(&bytes).ok()?;
            let latest = latest_for(&state, &id);
            Some(PeekEntry { id, latest })
        })
        .collect();

    peeked.sort_by(|a, b| a.id.cmp(&b.id));
    peeked.truncate(limit.max(1));
    peeked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::fs;
    use tempfile::tempdir;

    fn write_sibling(agents_root: &Path, id: &str, half_life_hours: f64, updated_at: DateTime<Utc>) {
        let dir = agents_root.join(id).join("agent");
        fs::create_dir_all(&dir).unwrap();
        let mut state = EngineState::default_at(updated_at, half_life_hours);
        state.last_updated = updated_at;
        let json = serde_json::to_vec_pretty(&state).unwrap();
        fs::write(dir.join("emotion-engine.json"), json).unwrap();
    }

    fn write_sibling_with_agent_bucket(
        agents_root: &Path,
        id: &str,
        half_life_hours: f64,
        now: DateTime<Utc>,
        agent_key: &str,
        stimulus: Stimulus,
    ) {
        let dir = agents_root.join(id).join("agent");
        fs::create_dir_all(&dir).unwrap();
        let mut state = EngineState::default_at(now, half_life_hours);
        state.last_updated = now;
        let bucket = crate::state::PerRoleBucket {
            latest: Some(stimulus.clone()),
            history: vec![stimulus],
        };
        state.agents.insert(agent_key.to_string(), bucket);
        let json = serde_json::to_vec_pretty(&state).unwrap();
        fs::write(dir.join("emotion-engine.json"), json).unwrap();
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn peek_excludes_self_and_sorts_by_id() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        write_sibling(root, "self", 12.0, now());
        write_sibling(root, "sibling-b", 12.0, now());
        write_sibling(root, "sibling-a", 12.0, now());

        let peeked = peek_siblings(root, "self", 10);
        assert_eq!(peeked.len(), 2);
        assert_eq!(peeked[0].id, "sibling-a");
        assert_eq!(peeked[1].id, "sibling-b");
    }

    #[test]
    fn peek_respects_limit() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for i in 0..5 {
            write_sibling(root, &format!("sibling-{i}"), 12.0, now());
        }
        let peeked = peek_siblings(root, "self", 2);
        assert_eq!(peeked.len(), 2);
    }

    #[test]
    fn missing_agents_root_returns_empty() {
        let peeked = peek_siblings(Path::new("/nonexistent/agents/root"), "self", 10);
        assert!(peeked.is_empty());
    }

    #[test]
    fn malformed_sibling_state_is_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let sibling_dir = root.join("broken").join("agent");
        fs::create_dir_all(&sibling_dir).unwrap();
        fs::write(sibling_dir.join("emotion-engine.json"), b"not json").unwrap();

        write_sibling(root, "healthy", 12.0, now());

        let peeked = peek_siblings(root, "self", 10);
        assert_eq!(peeked.len(), 1);
        assert_eq!(peeked[0].id, "healthy");
    }

    #[test]
    fn latest_prefers_bucket_keyed_by_sibling_own_id() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let stim = Stimulus::new("joy", 0.7, "said thanks", 0.9, now());
        write_sibling_with_agent_bucket(root, "sibling-a", 12.0, now(), "sibling-a", stim.clone());

        let peeked = peek_siblings(root, "self", 10);
        assert_eq!(peeked.len(), 1);
        assert_eq!(peeked[0].latest.as_ref().unwrap().label, "joy");
    }

    #[test]
    fn latest_falls_back_to_first_agent_bucket_when_id_keyed_absent() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let stim = Stimulus::new("curious", 0.5, "asked a question", 0.8, now());
        write_sibling_with_agent_bucket(root, "sibling-a", 12.0, now(), "someone-else", stim.clone());

        let peeked = peek_siblings(root, "self", 10);
        assert_eq!(peeked.len(), 1);
        assert_eq!(peeked[0].latest.as_ref().unwrap().label, "curious");
    }

    #[test]
    fn no_agent_buckets_yields_none() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_sibling(root, "sibling-a", 12.0, now());

        let peeked = peek_siblings(root, "self", 10);
        assert_eq!(peeked.len(), 1);
        assert!(peeked[0].latest.is_none());
    }
}
