//! Disk persistence: atomic write, a stale-aware lock file, and the v1 ->
//! v2 schema migration. Grounded in the teacher's file-based crash log
//! (`fs::create_dir_all` + `File::create` + pretty JSON), adapted from a
//! write-once log into a read-modify-write store.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::state::EngineState;

/// How long a lock file may sit before it's considered abandoned by a
/// crashed process and stolen.
fn lock_path(state_path: &Path) -> PathBuf {
    let mut lock = state_path.as_os_str().to_owned();
    lock.push(".lock");
    PathBuf::from(lock)
}

/// An acquired advisory lock on `state_path`'s `.lock` sibling. Released by
/// dropping it.
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock, retrying once after stealing a stale lock file.
    /// A lock older than `stale_after` is assumed to belong to a crashed
    /// process and is removed before the retry.
    pub fn acquire(state_path: &Path, stale_after: Duration) -> Result<Self, EngineError> {
        let path = lock_path(state_path);
        match Self::try_create(&path) {
            Ok(()) => return Ok(Self { path }),
            Err(first_err) => {
                if Self::is_stale(&path, stale_after) {
                    warn!(path = %path.display(), "stealing stale lock file");
                    let _ = fs::remove_file(&path);
                    Self::try_create(&path).map_err(|e| {
                        EngineError::io(format!("acquiring lock {}", path.display()), e)
                    })?;
                    return Ok(Self { path });
                }
                return Err(EngineError::io(
                    format!("state {} is locked by another process", state_path.display()),
                    first_err,
                ));
            }
        }
    }

    fn try_create(path: &Path) -> std::io::Result<()> {
        let mut file = File::options().create_new(true).write(true).open(path)?;
        write!(file, "{}", std::process::id())
    }

    fn is_stale(path: &Path, stale_after: Duration) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > stale_after)
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Write `state` to `path` atomically: serialize to a sibling `.tmp` file,
/// `fsync`, then `rename` over the destination. A reader never observes a
/// partially written file.
fn write_atomic(path: &Path, state: &EngineState) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(format!("creating {}", parent.display()), e))?;
        }
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let json = serde_json::to_string_pretty(state)
        .map_err(|e| EngineError::schema(format!("serializing state: {e}")))?;

    let mut file = File::create(&tmp_path).map_err(|e| EngineError::io(format!("creating {}", tmp_path.display()), e))?;
    file.write_all(json.as_bytes())
        .map_err(|e| EngineError::io(format!("writing {}", tmp_path.display()), e))?;
    file.sync_all()
        .map_err(|e| EngineError::io(format!("syncing {}", tmp_path.display()), e))?;

    fs::rename(&tmp_path, path).map_err(|e| EngineError::io(format!("renaming {}", tmp_path.display()), e))?;
    Ok(())
}

/// Convert a single v1 stimulus's string `intensity` (`low|medium|high`) to
/// its v2 numeric equivalent (`0.3|0.6|0.9`). Fields other than `intensity`
/// pass through unchanged; a non-string or already-numeric `intensity` is
/// left as-is.
fn migrate_stimulus_intensity(stimulus: &Value) -> Value {
    let mut out = stimulus.clone();
    if let Some(obj) = out.as_object_mut() {
        if let Some(Value::String(level)) = obj.get("intensity").cloned() {
            let numeric = match level.as_str() {
                "low" => 0.3,
                "medium" => 0.6,
                "high" => 0.9,
                _ => 0.0,
            };
            obj.insert("intensity".to_string(), Value::from(numeric));
        }
    }
    out
}

/// Migrate a single v1 `users[u]`/`agents[a]` bucket: carries `latest` and
/// `history` over, converting every stimulus's intensity string along the
/// way.
fn migrate_bucket(bucket: &Value) -> Value {
    let latest = bucket
        .get("latest")
        .filter(|v| !v.is_null())
        .map(migrate_stimulus_intensity)
        .unwrap_or(Value::Null);
    let history: Vec<Value> = bucket
        .get("history")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(migrate_stimulus_intensity).collect())
        .unwrap_or_default();

    serde_json::json!({ "latest": latest, "history": history })
}

/// Migrate a raw v1 document to the current v2 shape, per §4.7: rebuild a
/// fresh v2 default state (v1's numeric dimension/personality vocabulary
/// isn't carried forward -- only the bucketed history is worth preserving),
/// then copy each `users[u]`/`agents[a]` bucket over, converting every
/// stimulus's string `intensity` to its v2 numeric equivalent.
fn migrate_v1_to_v2(doc: &Value, now: chrono::DateTime<Utc>, half_life_hours: f64) -> Result<Value, EngineError> {
    if !doc.is_object() {
        return Err(EngineError::schema("v1 document root is not an object"));
    }

    let rebuilt = serde_json::to_value(EngineState::default_at(now, half_life_hours))
        .map_err(|e| EngineError::schema(format!("building v2 default during migration: {e}")))?;
    let mut rebuilt = rebuilt;
    let rebuilt_obj = rebuilt
        .as_object_mut()
        .ok_or_else(|| EngineError::schema("rebuilt v2 default is not an object"))?;

    for bucket_key in ["users", "agents"] {
        let Some(Value::Object(v1_buckets)) = doc.get(bucket_key) else {
            continue;
        };
        let mut migrated = serde_json::Map::new();
        for (actor_id, bucket) in v1_buckets {
            migrated.insert(actor_id.clone(), migrate_bucket(bucket));
        }
        rebuilt_obj.insert(bucket_key.to_string(), Value::Object(migrated));
    }

    Ok(rebuilt)
}

/// Load state from `path`. A v1 document is migrated in memory (the file
/// on disk is left untouched until the next [`save`]). A missing file, an
/// unreadable file, or a malformed document all recover to a fresh default
/// state rather than propagating a [`EngineError::Schema`] -- §4.6 item 1.
#[must_use]
pub fn load(path: &Path, half_life_hours: f64) -> EngineState {
    let now = Utc::now();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no existing state, starting fresh");
            return EngineState::default_at(now, half_life_hours);
        }
    };

    let doc: Value = match serde_json::from_slice(&bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file is not valid JSON, starting fresh");
            return EngineState::default_at(now, half_life_hours);
        }
    };

    let version = doc.get("version").and_then(Value::as_u64).unwrap_or(1);
    let doc = if version < 2 {
        match migrate_v1_to_v2(&doc, now, half_life_hours) {
            Ok(migrated) => migrated,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed migrating v1 state, starting fresh");
                return EngineState::default_at(now, half_life_hours);
            }
        }
    } else {
        doc
    };

    match serde_json::from_value(doc) {
        Ok(state) => state,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file has unreadable schema, starting fresh");
            EngineState::default_at(now, half_life_hours)
        }
    }
}

/// Persist `state` to `path`, bumping `lastUpdated` to `now` first. Returns
/// the saved state (with `lastUpdated` updated) so callers keep a single
/// source of truth. Acquires [`FileLock`] for the duration of the write.
pub fn save(path: &Path, state: &EngineState, stale_after: Duration) -> Result<EngineState, EngineError> {
    let _lock = FileLock::acquire(path, stale_after)?;
    let mut out = state.clone();
    out.last_updated = Utc::now();
    write_atomic(path, &out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emotion-engine.json");
        let state = EngineState::default_at(Utc::now(), 12.0);

        let saved = save(&path, &state, Duration::from_secs(10)).unwrap();
        let loaded = load(&path, 12.0);

        assert_eq!(loaded.personality, saved.personality);
        assert_eq!(loaded.dimensions, saved.dimensions);
        assert_eq!(loaded.version, 2);
    }

    #[test]
    fn missing_file_loads_default_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        let state = load(&path, 12.0);
        assert_eq!(state.version, 2);
        assert!(state.recent_stimuli.is_empty());
    }

    #[test]
    fn malformed_json_recovers_to_default_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emotion-engine.json");
        fs::write(&path, b"{ not json").unwrap();
        let state = load(&path, 12.0);
        assert_eq!(state.version, 2);
    }

    #[test]
    fn v1_document_rebuilds_as_v2_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emotion-engine.json");
        let v1 = serde_json::json!({
            "version": 1,
            "lastUpdated": "2025-01-01T00:00:00Z",
            "personality": {
                "openness": 0.9, "conscientiousness": 0.9, "extraversion": 0.9,
                "agreeableness": 0.9, "neuroticism": 0.9
            },
            "dimensions": { "pleasure": 0.8, "arousal": 0.0, "dominance": 0.0 },
        });
        fs::write(&path, serde_json::to_vec(&v1).unwrap()).unwrap();

        let state = load(&path, 12.0);
        assert_eq!(state.version, 2);
        // rebuilt as a fresh v2 default, not patched from v1's numeric state
        assert_eq!(state.personality, crate::personality::Personality::default());
        assert!((state.dimensions.pleasure - 0.0).abs() < 1e-9);
        assert!((state.dimensions.connection - 0.5).abs() < 1e-9);
        assert!((state.dimensions.trust - 0.5).abs() < 1e-9);
        assert!(state.recent_stimuli.is_empty());
    }

    #[test]
    fn v1_bucket_intensities_are_converted_to_numeric() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emotion-engine.json");
        let v1 = serde_json::json!({
            "version": 1,
            "lastUpdated": "2025-01-01T00:00:00Z",
            "users": {
                "alice": {
                    "latest": {
                        "id": "11111111-1111-1111-1111-111111111111",
                        "timestamp": "2025-01-01T00:00:00Z",
                        "label": "happy",
                        "intensity": "high",
                        "reason": "said thanks",
                        "confidence": 0.9
                    },
                    "history": [
                        {
                            "id": "11111111-1111-1111-1111-111111111111",
                            "timestamp": "2025-01-01T00:00:00Z",
                            "label": "happy",
                            "intensity": "high",
                            "reason": "said thanks",
                            "confidence": 0.9
                        },
                        {
                            "id": "22222222-2222-2222-2222-222222222222",
                            "timestamp": "2024-12-31T00:00:00Z",
                            "label": "sad",
                            "intensity": "low",
                            "reason": "seemed bored",
                            "confidence": 0.5
                        }
                    ]
                }
            },
            "agents": {
                "bob": {
                    "latest": {
                        "id": "33333333-3333-3333-3333-333333333333",
                        "timestamp": "2025-01-01T00:00:00Z",
                        "label": "curious",
                        "intensity": "medium",
                        "reason": "asked a question",
                        "confidence": 0.7
                    },
                    "history": []
                }
            }
        });
        fs::write(&path, serde_json::to_vec(&v1).unwrap()).unwrap();

        let state = load(&path, 12.0);
        assert_eq!(state.version, 2);

        let alice = state.users.get("alice").expect("alice bucket carried over");
        assert!((alice.latest.as_ref().unwrap().intensity - 0.9).abs() < 1e-9);
        assert!((alice.history[0].intensity - 0.9).abs() < 1e-9);
        assert!((alice.history[1].intensity - 0.3).abs() < 1e-9);

        let bob = state.agents.get("bob").expect("bob bucket carried over");
        assert!((bob.latest.as_ref().unwrap().intensity - 0.6).abs() < 1e-9);
    }

    #[test]
    fn lock_prevents_concurrent_acquire() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emotion-engine.json");
        let _held = FileLock::acquire(&path, Duration::from_secs(60)).unwrap();
        assert!(FileLock::acquire(&path, Duration::from_secs(60)).is_err());
    }

    #[test]
    fn stale_lock_is_stolen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emotion-engine.json");
        let lock_file = lock_path(&path);
        fs::write(&lock_file, b"12345").unwrap();

        // force the lock file's mtime into the past
        let past = std::time::SystemTime::now() - Duration::from_secs(3600);
        let _ = filetime_set(&lock_file, past);

        let acquired = FileLock::acquire(&path, Duration::from_secs(10));
        assert!(acquired.is_ok());
    }

    fn filetime_set(path: &Path, time: std::time::SystemTime) -> std::io::Result<()> {
        let file = File::options().write(true).open(path)?;
        file.set_modified(time)
    }
}
