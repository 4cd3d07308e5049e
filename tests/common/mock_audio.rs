//! Mock audio sources for integration tests

use speechtrainer::capture::AudioSource;
use speechtrainer::session::SourceFactory;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Counters shared by every source a factory hands out
#[derive(Clone)]
pub struct MicProbe {
    opened: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

impl MicProbe {
    /// Number of sources the factory has opened
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of sources currently started and not yet stopped
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct ScriptedMic {
    frames_left: usize,
    started: bool,
    stopped: bool,
    active: Arc<AtomicUsize>,
}

impl AudioSource for ScriptedMic {
    fn start(&mut self) -> anyhow::Result<()> {
        self.started = true;
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self, frame: &mut [i16]) -> isize {
        thread::sleep(Duration::from_millis(1));
        if self.frames_left == 0 {
            return 0;
        }
        self.frames_left -= 1;
        let n = frame.len().min(160);
        for slot in frame.iter_mut().take(n) {
            *slot = 7;
        }
        n as isize
    }

    fn stop(&mut self) {
        if self.started && !self.stopped {
            self.stopped = true;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ScriptedMic {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Factory producing sources that deliver `frames` non-empty reads and then
/// silence, plus a probe over every source it opens.
pub fn scripted_mic(frames: usize) -> (SourceFactory, MicProbe) {
    let probe = MicProbe {
        opened: Arc::new(AtomicUsize::new(0)),
        active: Arc::new(AtomicUsize::new(0)),
    };

    let factory_probe = probe.clone();
    let factory: SourceFactory = Box::new(move || {
        factory_probe.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedMic {
            frames_left: frames,
            started: false,
            stopped: false,
            active: factory_probe.active.clone(),
        }))
    });

    (factory, probe)
}

/// Factory whose opens always fail
pub fn failing_mic() -> SourceFactory {
    Box::new(|| anyhow::bail!("no input device"))
}
