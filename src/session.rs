//! Session Coordinator
//!
//! The façade the bridging layer drives: switch engine, start/stop
//! recognition, load models, query session state.

use crate::capture::{AudioSource, CaptureLoop};
use crate::error::{SessionError, SessionResult};
use crate::lifecycle::EngineManager;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Answers whether microphone permission is currently granted.
/// Requesting permission from the user is the embedder's concern.
pub type PermissionCheck = Box<dyn Fn() -> bool + Send>;

/// Opens a fresh audio source for each capture session.
pub type SourceFactory = Box<dyn FnMut() -> anyhow::Result<Box<dyn AudioSource>> + Send>;

/// Snapshot of the session, safe to hand to a bridging layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub active_engine_id: Option<String>,
    pub loaded_model_path: Option<PathBuf>,
    pub capture_running: bool,
    pub recognizing: bool,
}

struct Inner {
    engines: EngineManager,
    capture: CaptureLoop,
    permission: PermissionCheck,
    sources: SourceFactory,
    recognizing: bool,
}

/// Single entry point for recognition sessions.
///
/// One mutex serializes every mutating operation, so the multi-step switch
/// protocol can never interleave with a concurrent start or stop. The
/// capture worker is the only other thread in play and touches nothing here
/// except the shared engine handle.
pub struct SessionCoordinator {
    inner: Mutex<Inner>,
}

impl SessionCoordinator {
    pub fn new(engines: EngineManager, permission: PermissionCheck, sources: SourceFactory) -> Self {
        Self {
            inner: Mutex::new(Inner {
                engines,
                capture: CaptureLoop::new(),
                permission,
                sources,
                recognizing: false,
            }),
        }
    }

    /// Switch to the engine registered under `id`.
    ///
    /// An unregistered id is rejected before any teardown, so an invalid
    /// target cannot disturb a working session.
    pub fn switch_engine(&self, id: &str) -> SessionResult<()> {
        let mut inner = self.inner.lock()?;

        if !inner.engines.contains(id) {
            return Err(SessionError::EngineNotFound(id.to_string()));
        }

        // The worker must be fully joined before the outgoing engine is
        // torn down.
        inner.capture.stop();
        inner.recognizing = false;

        inner.engines.switch_to(id)
    }

    /// Start recognition on the active engine.
    ///
    /// `id` must name the active engine; a stale caller racing a switch is
    /// rejected with `EngineMismatch`. Starting while recognition already
    /// runs is a no-op. For external-audio engines the capture loop is
    /// started first; if the engine then fails to start, the capture loop
    /// is torn down again so no orphaned worker survives the failure.
    pub fn start_recognition(&self, id: &str) -> SessionResult<()> {
        let mut inner = self.inner.lock()?;

        let active_id = match inner.engines.active_id() {
            Some(active) => active.to_string(),
            None => return Err(SessionError::NoEngine),
        };
        if active_id != id {
            return Err(SessionError::EngineMismatch {
                requested: id.to_string(),
                active: active_id,
            });
        }
        if inner.recognizing {
            debug!("recognition already running on '{}'", id);
            return Ok(());
        }

        let engine = inner.engines.active_engine().ok_or(SessionError::NoEngine)?;

        let needs_audio = engine.lock()?.needs_external_audio();
        if needs_audio {
            if !(inner.permission)() {
                return Err(SessionError::PermissionDenied);
            }
            let source = (inner.sources)()
                .map_err(|e| SessionError::AudioInitFailed(e.to_string()))?;
            inner.capture.start(source, engine.clone())?;
        }

        let started = match engine.lock() {
            Ok(mut engine) => engine.start(),
            Err(e) => Err(anyhow::anyhow!("engine lock poisoned: {}", e)),
        };
        if let Err(e) = started {
            warn!("engine '{}' failed to start: {}", id, e);
            inner.capture.stop();
            return Err(SessionError::StartFailed(id.to_string()));
        }

        inner.recognizing = true;
        info!("🎤 recognition started on '{}'", id);
        Ok(())
    }

    /// Stop recognition and capture. Best-effort teardown: safe to call
    /// from any state, including after a previous failure, and never fails.
    pub fn stop_recognition(&self, id: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            warn!("stop_recognition: coordinator lock poisoned");
            return;
        };

        inner.capture.stop();

        if let Some(engine) = inner.engines.active_engine() {
            if let Ok(mut engine) = engine.lock() {
                engine.stop();
            }
        }

        match inner.engines.active_id() {
            Some(active) if active != id => {
                debug!("stop requested for '{}' while '{}' is active", id, active);
            }
            _ => {}
        }

        if inner.recognizing {
            info!("🛑 recognition stopped");
        }
        inner.recognizing = false;
    }

    /// Load a model on the active engine, or directly on the backend when
    /// no engine is active.
    pub fn load_model(&self, path: &Path) -> SessionResult<()> {
        let mut inner = self.inner.lock()?;
        inner.engines.load_model(path)
    }

    /// Current session state
    pub fn state(&self) -> SessionResult<SessionState> {
        let inner = self.inner.lock()?;
        Ok(SessionState {
            active_engine_id: inner.engines.active_id().map(str::to_string),
            loaded_model_path: inner.engines.loaded_model().map(Path::to_path_buf),
            capture_running: inner.capture.is_running(),
            recognizing: inner.recognizing,
        })
    }
}
