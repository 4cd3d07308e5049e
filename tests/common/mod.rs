pub mod mock_audio;
pub mod mock_engine;

use mock_audio::{scripted_mic, MicProbe};
use speechtrainer::asr::{AsrEngine, EngineRegistry};
use speechtrainer::lifecycle::EngineManager;
use speechtrainer::session::{SessionCoordinator, SourceFactory};

pub use mock_engine::{Journal, RecordingBackend, ScriptedEngine};

/// Build a coordinator over scripted engines, a scripted microphone, and a
/// recording backend sharing `journal`.
pub fn world(
    engines: Vec<Box<dyn AsrEngine>>,
    journal: &Journal,
    permission_granted: bool,
) -> (SessionCoordinator, MicProbe) {
    let (factory, probe) = scripted_mic(8);
    let coordinator = build(
        engines,
        Box::new(RecordingBackend::new(journal.clone())),
        permission_granted,
        factory,
    );
    (coordinator, probe)
}

/// Same as [`world`] but with explicit backend and source factory
pub fn build(
    engines: Vec<Box<dyn AsrEngine>>,
    backend: Box<dyn speechtrainer::asr::RecognitionBackend>,
    permission_granted: bool,
    sources: SourceFactory,
) -> SessionCoordinator {
    let mut registry = EngineRegistry::new();
    for engine in engines {
        registry.register(engine);
    }

    let manager = EngineManager::new(registry, backend);

    SessionCoordinator::new(manager, Box::new(move || permission_granted), sources)
}
