//! Engine Lifecycle
//!
//! Owns the currently active engine and the last successfully loaded model
//! path, and performs the switch/init/shutdown protocol.

use crate::asr::{EngineRegistry, RecognitionBackend, SharedEngine};
use crate::error::{SessionError, SessionResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

struct ActiveEngine {
    id: String,
    engine: SharedEngine,
}

/// Manages which engine is active and rebuilds engine state on a switch.
///
/// Not internally synchronized; the session coordinator serializes every
/// call behind its own mutex.
pub struct EngineManager {
    registry: EngineRegistry,
    backend: Box<dyn RecognitionBackend>,
    active: Option<ActiveEngine>,
    loaded_model: Option<PathBuf>,
}

impl EngineManager {
    pub fn new(registry: EngineRegistry, backend: Box<dyn RecognitionBackend>) -> Self {
        Self {
            registry,
            backend,
            active: None,
            loaded_model: None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.id.as_str())
    }

    pub fn active_engine(&self) -> Option<SharedEngine> {
        self.active.as_ref().map(|a| a.engine.clone())
    }

    pub fn loaded_model(&self) -> Option<&Path> {
        self.loaded_model.as_deref()
    }

    /// Switch to the engine registered under `id`.
    ///
    /// The caller has already stopped and joined the capture loop, so no
    /// frames can reach the outgoing engine. Order: tear down the old
    /// engine, initialize the new one, re-apply the last loaded model, mark
    /// it active, reset the backend. A failure at init or model load leaves
    /// no engine active, so later operations are rejected instead of
    /// driving a half-built engine.
    pub fn switch_to(&mut self, id: &str) -> SessionResult<()> {
        let next = self.registry.lookup(id)?;

        self.teardown_active();

        {
            let mut engine = next.lock()?;

            if let Err(e) = engine.init() {
                warn!("engine '{}' init failed: {}", id, e);
                return Err(SessionError::EngineInitFailed(id.to_string()));
            }

            if let Some(model) = self.loaded_model.clone() {
                if let Err(e) = engine.load_model(&model) {
                    warn!(
                        "engine '{}' rejected model {}: {}",
                        id,
                        model.display(),
                        e
                    );
                    return Err(SessionError::ModelLoadFailed(e.to_string()));
                }
                info!("📦 re-applied model {} to '{}'", model.display(), id);
            }
        }

        self.active = Some(ActiveEngine {
            id: id.to_string(),
            engine: next,
        });

        // Residual decoder state from the previous engine must not bleed
        // into this one.
        // TODO: check with the backend whether this reset is still needed
        // now that activation re-initializes the decoder anyway.
        self.backend.full_reset();

        info!("🔄 active engine is now '{}'", id);
        Ok(())
    }

    /// Stop and shut down the active engine, if any. The old engine is
    /// abandoned whether or not its teardown succeeds.
    fn teardown_active(&mut self) {
        if let Some(prev) = self.active.take() {
            match prev.engine.lock() {
                Ok(mut engine) => {
                    engine.stop();
                    engine.shutdown();
                    info!("engine '{}' shut down", prev.id);
                }
                Err(e) => {
                    warn!("skipping shutdown of '{}': {}", prev.id, e);
                }
            }
        }
    }

    /// Load a model through the active engine, or directly through the
    /// backend when no engine is active. The path is recorded only on
    /// success so a later switch knows which model to re-apply.
    pub fn load_model(&mut self, path: &Path) -> SessionResult<()> {
        if let Some(active) = &self.active {
            let mut engine = active.engine.lock()?;
            engine
                .load_model(path)
                .map_err(|e| SessionError::ModelLoadFailed(e.to_string()))?;
        } else {
            self.backend
                .load_model(path)
                .map_err(|e| SessionError::ModelLoadFailed(e.to_string()))?;
        }

        self.loaded_model = Some(path.to_path_buf());
        info!("📦 model loaded: {}", path.display());
        Ok(())
    }
}
