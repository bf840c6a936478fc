//! JSON file session store
//!
//! Keeps every session record in one JSON object keyed by session id. Saves
//! rewrite the whole file through a sibling temp file so a crash mid-write
//! leaves the previous contents intact.

use anyhow::{Context, Result};
use etude_core::{SessionRecord, SessionStore};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored sessions; a missing file means none yet
    pub fn load_all(&self) -> Result<BTreeMap<String, SessionRecord>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents)
            .with_context(|| format!("Malformed session file {}", self.path.display()))
    }

    pub fn load(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.load_all()?.remove(session_id))
    }

    fn write_all(&self, records: &BTreeMap<String, SessionRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    fn save_or_update_session(&mut self, record: &SessionRecord) -> Result<()> {
        let mut records = self.load_all()?;
        records.insert(record.session_id.clone(), record.clone());
        self.write_all(&records)?;
        tracing::debug!(
            "Stored session {} in {} ({} total)",
            record.session_id,
            self.path.display(),
            records.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etude_core::clock::ManualClock;
    use etude_core::{DifficultyLevel, EngineConfig, PracticeEngine};
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn scratch_path(name: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir()
            .join(format!("etude-store-{}-{}", std::process::id(), n))
            .join(name)
    }

    fn record_from_engine() -> SessionRecord {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut config = EngineConfig::default();
        config.generator.seed = Some(5);
        let mut engine = PracticeEngine::with_clock(config, clock.clone()).unwrap();
        engine.start_session(DifficultyLevel::SingleNote);
        let pattern = engine.get_next_pattern();
        clock.advance(400.0);
        engine.validate_note(Some(pattern.midi_notes()[0]), 400.0);
        engine.session_record().unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let store = JsonFileStore::new(scratch_path("sessions.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch_path("sessions.json");
        let mut store = JsonFileStore::new(&path);
        let record = record_from_engine();
        store.save_or_update_session(&record).unwrap();

        let loaded = store.load(&record.session_id).unwrap().unwrap();
        assert_eq!(loaded.session_id, record.session_id);
        assert_eq!(loaded.summary.total_attempts, 1);
        assert_eq!(loaded.notes.correct_notes, 1);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_update_replaces_same_session() {
        let path = scratch_path("sessions.json");
        let mut store = JsonFileStore::new(&path);
        let mut record = record_from_engine();
        store.save_or_update_session(&record).unwrap();

        record.adaptive = false;
        record.saved_at_ms += 1000.0;
        store.save_or_update_session(&record).unwrap();

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[&record.session_id].adaptive);

        let mut other = record.clone();
        other.session_id = "session-other".to_string();
        store.save_or_update_session(&other).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 2);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = scratch_path("broken.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let mut store = JsonFileStore::new(&path);
        assert!(store.load_all().is_err());
        assert!(store.save_or_update_session(&record_from_engine()).is_err());
        // The bad file is left for the user to inspect
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
