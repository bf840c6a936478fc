//! WASM bindings for etude-core
//!
//! Exposes a [`WasmEngine`] that a browser host drives: pattern navigation,
//! note validation, and `on_idle` to be called from `requestIdleCallback`
//! (or a short `setTimeout` where that is unavailable) with the remaining
//! idle budget.

use crate::analytics::AnalyticsSnapshot;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::engine::PracticeEngine;
use crate::types::difficulty::DifficultyLevel;
use crate::types::midi_event::MidiEvent;
use crate::types::note::midi_from_f64;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = now)]
    fn performance_now() -> f64;
}

/// Monotonic `performance.now()` clock
struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> f64 {
        performance_now()
    }
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

fn js_error(message: impl ToString) -> JsValue {
    JsValue::from_str(&message.to_string())
}

#[wasm_bindgen]
pub struct WasmEngine {
    engine: PracticeEngine,
}

#[wasm_bindgen]
impl WasmEngine {
    /// Create an engine from an optional JSON configuration document
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmEngine, JsValue> {
        let config = match config_json {
            Some(json) => EngineConfig::from_json_str(&json).map_err(js_error)?,
            None => EngineConfig::default(),
        };
        let engine = PracticeEngine::with_clock(config, Rc::new(JsClock)).map_err(js_error)?;
        Ok(WasmEngine { engine })
    }

    pub fn start_session(&mut self, difficulty: &str) -> Result<(), JsValue> {
        let level: DifficultyLevel = difficulty.parse().map_err(js_error)?;
        self.engine.start_session(level);
        Ok(())
    }

    pub fn next_pattern(&mut self) -> JsValue {
        to_js(&self.engine.get_next_pattern())
    }

    /// Notation payload of the active pattern, if any
    pub fn current_notation(&self) -> Option<String> {
        self.engine
            .current_pattern()
            .map(|p| p.notation().to_string())
    }

    /// Validate a note number from JavaScript; NaN or out-of-range input is
    /// reported as incorrect
    pub fn validate_note(&mut self, midi_note: f64, timestamp_ms: f64) -> JsValue {
        to_js(&self.engine.validate_note(midi_from_f64(midi_note), timestamp_ms))
    }

    /// Feed a raw MIDI message (e.g. from Web MIDI `onmidimessage`)
    pub fn handle_midi_message(&mut self, data: &[u8], timestamp_ms: f64) -> JsValue {
        match MidiEvent::from_bytes(data, timestamp_ms) {
            Some(event) => to_js(&self.engine.handle_midi(event)),
            None => JsValue::NULL,
        }
    }

    pub fn retry_pattern(&mut self) -> JsValue {
        to_js(&self.engine.retry_pattern())
    }

    pub fn set_difficulty(&mut self, difficulty: &str) -> Result<(), JsValue> {
        let level: DifficultyLevel = difficulty.parse().map_err(js_error)?;
        self.engine.set_difficulty(level);
        Ok(())
    }

    pub fn set_adaptive(&mut self, enabled: bool) {
        self.engine.set_adaptive(enabled);
    }

    pub fn reset_session(&mut self) {
        self.engine.reset_session();
    }

    /// Run background work for up to `budget_ms`; returns whether more is pending
    pub fn on_idle(&mut self, budget_ms: f64) -> bool {
        self.engine.run_idle(budget_ms);
        self.engine.has_pending_work()
    }

    pub fn session_summary(&self) -> JsValue {
        to_js(&self.engine.session_summary())
    }

    pub fn queue_stats(&self) -> JsValue {
        to_js(&self.engine.queue_stats())
    }

    pub fn pattern_progress(&self, pattern_id: &str) -> JsValue {
        to_js(&self.engine.pattern_progress(pattern_id))
    }

    pub fn session_record(&self) -> JsValue {
        to_js(&self.engine.session_record())
    }

    pub fn apply_config(&mut self, config_json: &str) -> Result<(), JsValue> {
        let config = EngineConfig::from_json_str(config_json).map_err(js_error)?;
        self.engine.apply_config(config).map_err(js_error)
    }

    pub fn export_analytics(&self) -> Result<String, JsValue> {
        self.engine.export_analytics().to_json().map_err(js_error)
    }

    pub fn import_analytics(&mut self, json: &str) -> Result<(), JsValue> {
        let snapshot = AnalyticsSnapshot::from_json(json).map_err(js_error)?;
        self.engine.import_analytics(snapshot).map_err(js_error)
    }
}
