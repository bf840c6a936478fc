//! Persistence boundary
//!
//! The engine hands a [`SessionRecord`] to a [`SessionStore`] after each
//! recorded attempt. Stores may fail; the engine logs and carries on, and the
//! next save naturally retries with fresher data.

use crate::analytics::{NoteMetric, PatternMetric, SessionSummary};
use crate::error::EngineError;
use crate::types::difficulty::DifficultyLevel;
use crate::validator::SessionTally;
use anyhow::Result;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Everything a store needs to save or update one session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionRecord {
    pub session_id: String,
    pub started_at_ms: f64,
    pub saved_at_ms: f64,
    pub difficulty: DifficultyLevel,
    pub adaptive: bool,
    pub summary: SessionSummary,
    pub notes: SessionTally,
    pub note_metrics: Vec<NoteMetric>,
    pub pattern_metrics: Vec<PatternMetric>,
}

pub trait SessionStore {
    /// Insert the record, or replace the one with the same session id
    fn save_or_update_session(&mut self, record: &SessionRecord) -> Result<()>;
}

/// In-memory store; clones share the same records
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Rc<RefCell<BTreeMap<String, SessionRecord>>>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every save fails, for exercising error paths
    pub fn failing() -> Self {
        MemoryStore {
            failing: true,
            ..Self::default()
        }
    }

    pub fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.records.borrow().get(session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemoryStore {
    fn save_or_update_session(&mut self, record: &SessionRecord) -> Result<()> {
        if self.failing {
            return Err(EngineError::Persistence(format!(
                "memory store rejected session {}",
                record.session_id
            ))
            .into());
        }
        self.records
            .borrow_mut()
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }
}
