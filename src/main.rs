//! SpeechTrainer - recognition session CLI
//!
//! Wires a registry, coordinator, and microphone source together and prints
//! transcript events until interrupted. Stands in for the UI bridging layer.

use anyhow::Result;
use clap::Parser;
use speechtrainer::asr::{
    transcript_channel, AsrEngine, BackendState, EngineRegistry, NullBackend, TranscriptEvent,
    TranscriptKind, TranscriptSink,
};
use speechtrainer::audio::MicSource;
use speechtrainer::capture::{AudioSource, SAMPLE_RATE};
use speechtrainer::config::Config;
use speechtrainer::lifecycle::EngineManager;
use speechtrainer::session::SessionCoordinator;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Audio input device index
    #[arg(short, long)]
    device: Option<usize>,

    /// Engine id to activate
    #[arg(short, long)]
    engine: Option<String>,
}

/// Metering engine for end-to-end smoke runs: consumes pushed frames and
/// reports the input level as transcript events. Follows the backend state
/// machine so out-of-order lifecycle calls fail loudly.
struct LevelEngine {
    id: String,
    sink: TranscriptSink,
    state: BackendState,
    model: Option<PathBuf>,
    window: Vec<i16>,
    total_samples: u64,
}

impl LevelEngine {
    fn new(id: &str, sink: TranscriptSink) -> Self {
        Self {
            id: id.to_string(),
            sink,
            state: BackendState::Uninitialized,
            model: None,
            window: Vec::new(),
            total_samples: 0,
        }
    }

    fn emit(&self, kind: TranscriptKind, text: String) {
        let _ = self.sink.send(TranscriptEvent {
            engine: self.id.clone(),
            kind,
            text,
        });
    }
}

impl AsrEngine for LevelEngine {
    fn id(&self) -> &str {
        &self.id
    }

    fn needs_external_audio(&self) -> bool {
        true
    }

    fn init(&mut self) -> Result<()> {
        if self.state != BackendState::Uninitialized {
            anyhow::bail!("init called in state {}", self.state);
        }
        self.state = BackendState::Initialized;
        Ok(())
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        if self.state == BackendState::Uninitialized || self.state == BackendState::Recognizing {
            anyhow::bail!("load_model called in state {}", self.state);
        }
        self.model = Some(path.to_path_buf());
        self.state = BackendState::ModelLoaded;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.state == BackendState::Uninitialized || self.state == BackendState::Recognizing {
            anyhow::bail!("start called in state {}", self.state);
        }
        self.window.clear();
        self.total_samples = 0;
        self.state = BackendState::Recognizing;
        Ok(())
    }

    fn stop(&mut self) {
        if self.state != BackendState::Recognizing {
            return;
        }
        let seconds = self.total_samples as f64 / SAMPLE_RATE as f64;
        self.emit(
            TranscriptKind::Final,
            format!("captured {:.1}s of audio", seconds),
        );
        self.state = if self.model.is_some() {
            BackendState::ModelLoaded
        } else {
            BackendState::Initialized
        };
    }

    fn shutdown(&mut self) {
        self.window.clear();
        self.model = None;
        self.state = BackendState::Uninitialized;
    }

    fn push_audio(&mut self, frame: &[i16]) {
        if self.state != BackendState::Recognizing {
            return;
        }

        self.total_samples += frame.len() as u64;
        self.window.extend_from_slice(frame);

        // Report once per second of audio
        if self.window.len() >= SAMPLE_RATE as usize {
            let sum: f64 = self
                .window
                .iter()
                .map(|&s| (s as f64) * (s as f64))
                .sum();
            let rms = (sum / self.window.len() as f64).sqrt();
            let db = if rms > 0.0 {
                20.0 * (rms / i16::MAX as f64).log10()
            } else {
                -96.0
            };
            self.emit(TranscriptKind::Partial, format!("input level {:.1} dBFS", db));
            self.window.clear();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load()?;

    // Setup logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🗣️ SpeechTrainer v{} starting...", env!("CARGO_PKG_VERSION"));

    let engine_id = args.engine.unwrap_or(config.asr_engine);
    let device = args.device.or(config.audio_device);

    let (sink, events) = transcript_channel();

    let mut registry = EngineRegistry::new();
    registry.register(Box::new(LevelEngine::new("loopback", sink.clone())));
    info!("available engines: {:?}", registry.ids());

    let manager = EngineManager::new(registry, Box::new(NullBackend));
    let coordinator = SessionCoordinator::new(
        manager,
        // Desktop builds read the microphone directly; permission dialogs
        // belong to the embedding platform.
        Box::new(|| true),
        Box::new(move || {
            MicSource::open(device).map(|s| Box::new(s) as Box<dyn AudioSource>)
        }),
    );

    coordinator.switch_engine(&engine_id)?;

    if !config.model_path.is_empty() {
        if let Err(e) = coordinator.load_model(Path::new(&config.model_path)) {
            warn!("model load failed, continuing without a model: {}", e);
        }
    }

    coordinator.start_recognition(&engine_id)?;

    tokio::task::spawn_blocking(move || {
        while let Ok(evt) = events.recv() {
            info!("📝 [{}] {}: {}", evt.engine, evt.kind, evt.text);
        }
    });

    info!("✅ Session running - press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    coordinator.stop_recognition(&engine_id);
    info!("👋 Session stopped");
    Ok(())
}
