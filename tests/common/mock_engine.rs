//! Mock engines and backend for integration tests
//!
//! Every lifecycle call is appended to a shared journal so tests can assert
//! call counts and ordering across engines.

use anyhow::Result;
use speechtrainer::asr::{
    AsrEngine, RecognitionBackend, TranscriptEvent, TranscriptKind, TranscriptSink,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared, ordered record of lifecycle calls
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    /// Index of the first occurrence of `entry`
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == entry)
    }
}

/// Engine with configurable failures that journals every call
pub struct ScriptedEngine {
    id: String,
    external_audio: bool,
    fail_init: bool,
    fail_start: bool,
    fail_load: bool,
    journal: Journal,
    frames: Arc<Mutex<Vec<Vec<i16>>>>,
    sink: Option<TranscriptSink>,
}

impl ScriptedEngine {
    pub fn new(id: &str, journal: &Journal) -> Self {
        Self {
            id: id.to_string(),
            external_audio: true,
            fail_init: false,
            fail_start: false,
            fail_load: false,
            journal: journal.clone(),
            frames: Arc::new(Mutex::new(Vec::new())),
            sink: None,
        }
    }

    pub fn self_driving(mut self) -> Self {
        self.external_audio = false;
        self
    }

    pub fn fail_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn fail_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Emit a "ready" transcript when recognition starts
    pub fn with_sink(mut self, sink: TranscriptSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Handle to the frames this engine has received
    pub fn frames_handle(&self) -> Arc<Mutex<Vec<Vec<i16>>>> {
        self.frames.clone()
    }
}

impl AsrEngine for ScriptedEngine {
    fn id(&self) -> &str {
        &self.id
    }

    fn needs_external_audio(&self) -> bool {
        self.external_audio
    }

    fn init(&mut self) -> Result<()> {
        self.journal.record(format!("{}.init", self.id));
        if self.fail_init {
            anyhow::bail!("scripted init failure");
        }
        Ok(())
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        self.journal
            .record(format!("{}.load:{}", self.id, path.display()));
        if self.fail_load {
            anyhow::bail!("scripted model rejection");
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.journal.record(format!("{}.start", self.id));
        if self.fail_start {
            anyhow::bail!("scripted start failure");
        }
        if let Some(sink) = &self.sink {
            let _ = sink.send(TranscriptEvent {
                engine: self.id.clone(),
                kind: TranscriptKind::Final,
                text: "ready".to_string(),
            });
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.journal.record(format!("{}.stop", self.id));
    }

    fn shutdown(&mut self) {
        self.journal.record(format!("{}.shutdown", self.id));
    }

    fn push_audio(&mut self, frame: &[i16]) {
        self.frames.lock().unwrap().push(frame.to_vec());
    }
}

/// Backend that journals direct loads and resets
pub struct RecordingBackend {
    journal: Journal,
    fail_load: bool,
}

impl RecordingBackend {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_load: false,
        }
    }

    pub fn failing_loads(mut self) -> Self {
        self.fail_load = true;
        self
    }
}

impl RecognitionBackend for RecordingBackend {
    fn load_model(&mut self, path: &Path) -> Result<()> {
        self.journal.record(format!("backend.load:{}", path.display()));
        if self.fail_load {
            anyhow::bail!("scripted backend load failure");
        }
        Ok(())
    }

    fn full_reset(&mut self) {
        self.journal.record("backend.reset");
    }
}
