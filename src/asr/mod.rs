//! ASR (Automatic Speech Recognition) Module
//!
//! Contracts for pluggable recognition engines:
//! - External-audio engines cannot read the microphone themselves and are
//!   fed PCM frames by the capture loop.
//! - Self-driving engines manage their own capture internally.

pub mod registry;

// Re-export main types
pub use registry::EngineRegistry;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};

/// An engine handle shared between the coordinator and the capture worker.
pub type SharedEngine = Arc<Mutex<Box<dyn AsrEngine>>>;

/// Trait for ASR engines
///
/// All calls are synchronous and blocking from the caller's perspective.
/// Transcripts are delivered out of band through a [`TranscriptSink`] the
/// engine holds; no trait method ever blocks on the sink's consumer.
pub trait AsrEngine: Send {
    /// Unique engine id (e.g. "vosk-en")
    fn id(&self) -> &str;

    /// True if the engine depends on pushed PCM frames
    fn needs_external_audio(&self) -> bool;

    /// Initialize the engine, acquiring its native resources
    fn init(&mut self) -> Result<()>;

    /// Load a model (if applicable)
    fn load_model(&mut self, path: &Path) -> Result<()>;

    /// Begin recognition
    fn start(&mut self) -> Result<()>;

    /// Stop recognition
    fn stop(&mut self);

    /// Release all native resources; the engine may be re-initialized later
    fn shutdown(&mut self);

    /// Feed one frame of 16 kHz mono i16 samples.
    /// Default implementation discards the frame (self-driving engines).
    fn push_audio(&mut self, _frame: &[i16]) {}
}

impl fmt::Debug for dyn AsrEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsrEngine").field("id", &self.id()).finish()
    }
}

/// Kind of a transcript notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptKind {
    Partial,
    Final,
}

impl fmt::Display for TranscriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptKind::Partial => write!(f, "partial"),
            TranscriptKind::Final => write!(f, "final"),
        }
    }
}

/// Recognized text delivered by an engine while recognition is active
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub engine: String,
    pub kind: TranscriptKind,
    pub text: String,
}

/// Sending half of the transcript channel, cloned into each engine
pub type TranscriptSink = mpsc::Sender<TranscriptEvent>;

/// Create the transcript channel. The receiver belongs to the bridging
/// layer; engines hold clones of the sink and send at arbitrary times.
pub fn transcript_channel() -> (TranscriptSink, mpsc::Receiver<TranscriptEvent>) {
    mpsc::channel()
}

/// Progression of the opaque recognition backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Uninitialized,
    Initialized,
    ModelLoaded,
    Recognizing,
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendState::Uninitialized => "uninitialized",
            BackendState::Initialized => "initialized",
            BackendState::ModelLoaded => "model_loaded",
            BackendState::Recognizing => "recognizing",
        };
        write!(f, "{}", name)
    }
}

/// Narrow view of the recognition backend shared by the engines.
///
/// `full_reset` purges residual decoder state and is issued after every
/// successful engine activation. `load_model` is the direct load path used
/// when no engine is active yet.
pub trait RecognitionBackend: Send {
    fn load_model(&mut self, path: &Path) -> Result<()>;

    fn full_reset(&mut self);
}

/// Backend for embedders whose engines own their decoder outright: direct
/// model loads succeed without touching anything and reset is a no-op.
pub struct NullBackend;

impl RecognitionBackend for NullBackend {
    fn load_model(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn full_reset(&mut self) {}
}
