//! Engine registry: fixed mapping from engine id to engine handle.

use crate::asr::{AsrEngine, SharedEngine};
use crate::error::{SessionError, SessionResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// The set of engines known to the session, keyed by id.
///
/// Built once at startup and handed to the coordinator; after that the set
/// never changes. Lookups have no side effects.
#[derive(Default)]
pub struct EngineRegistry {
    engines: HashMap<String, SharedEngine>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an engine under its own id, replacing any previous engine
    /// registered with the same id.
    pub fn register(&mut self, engine: Box<dyn AsrEngine>) {
        let id = engine.id().to_string();
        info!("📋 registered engine '{}'", id);
        self.engines.insert(id, Arc::new(Mutex::new(engine)));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.engines.contains_key(id)
    }

    /// Resolve an id to its engine handle
    pub fn lookup(&self, id: &str) -> SessionResult<SharedEngine> {
        self.engines
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::EngineNotFound(id.to_string()))
    }

    /// All registered ids, sorted for stable display
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.engines.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
