//! Capture Loop
//!
//! A single background worker that reads PCM frames from an audio source
//! and forwards them to the active engine while a run flag is set.

use crate::asr::SharedEngine;
use crate::error::{SessionError, SessionResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Fixed capture format: 16 kHz mono signed 16-bit.
pub const SAMPLE_RATE: u32 = 16_000;
pub const CHANNELS: u16 = 1;

/// Samples per read cycle
pub const FRAME_SAMPLES: usize = 1024;

/// A microphone-like source of PCM frames.
///
/// `read` fills `frame` and returns the number of samples written. Zero or
/// negative return values mean nothing was delivered this cycle and the
/// caller retries on the next iteration. `read` must return within a
/// bounded time so the loop can observe its stop flag.
pub trait AudioSource: Send {
    fn start(&mut self) -> anyhow::Result<()>;

    fn read(&mut self, frame: &mut [i16]) -> isize;

    fn stop(&mut self);
}

/// Owns the capture worker thread. At most one worker exists at a time.
pub struct CaptureLoop {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Start the worker, taking ownership of `source` for the session.
    ///
    /// Starting while a worker is already running is a no-op that resolves
    /// successfully, so the engine never gains a duplicate audio producer.
    pub fn start(
        &mut self,
        mut source: Box<dyn AudioSource>,
        engine: SharedEngine,
    ) -> SessionResult<()> {
        if self.worker.is_some() {
            debug!("capture loop already running");
            return Ok(());
        }

        source
            .start()
            .map_err(|e| SessionError::AudioInitFailed(e.to_string()))?;

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let worker = thread::Builder::new()
            .name("capture-loop".to_string())
            .spawn(move || {
                // One frame buffer, reused for every read cycle.
                let mut frame = vec![0i16; FRAME_SAMPLES];

                while running.load(Ordering::SeqCst) {
                    let n = source.read(&mut frame);
                    if n <= 0 {
                        // Transient underrun or device hiccup, retry.
                        continue;
                    }
                    let n = (n as usize).min(frame.len());

                    match engine.lock() {
                        Ok(mut engine) => engine.push_audio(&frame[..n]),
                        Err(e) => {
                            warn!("capture loop: engine lock poisoned: {}", e);
                            break;
                        }
                    }
                }

                source.stop();
                debug!("capture worker exited");
            });

        match worker {
            Ok(handle) => {
                self.worker = Some(handle);
                info!("🎙️ capture loop started");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(SessionError::AudioInitFailed(e.to_string()))
            }
        }
    }

    /// Clear the run flag and join the worker, then release the source.
    ///
    /// The join is bounded by one read cycle of the source. Idempotent:
    /// stopping when nothing is running is a no-op.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("capture worker panicked");
            }
            info!("🛑 capture loop stopped");
        }
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
