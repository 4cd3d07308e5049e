//! Microphone audio source using cpal

use crate::capture::{AudioSource, CHANNELS, FRAME_SAMPLES, SAMPLE_RATE};
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ten seconds of backlog at 16 kHz
const SPILL_CAPACITY: usize = SAMPLE_RATE as usize * 10;

/// Upper bound on one read cycle; also bounds the capture loop's stop latency
const READ_WAIT: Duration = Duration::from_millis(100);

const STREAM_POLL: Duration = Duration::from_millis(20);

/// Bounded sample queue between the cpal callback and the capture loop.
///
/// When full, the oldest audio is dropped so the callback never blocks and
/// memory stays bounded while the reader is stalled.
struct SpillBuffer {
    queue: Mutex<VecDeque<i16>>,
    available: Condvar,
    capacity: usize,
}

impl SpillBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            capacity,
        }
    }

    fn push(&self, samples: &[i16]) {
        let Ok(mut queue) = self.queue.lock() else {
            return;
        };

        let samples = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        let overflow = (queue.len() + samples.len())
            .saturating_sub(self.capacity)
            .min(queue.len());
        if overflow > 0 {
            queue.drain(..overflow);
        }

        queue.extend(samples.iter().copied());
        self.available.notify_one();
    }

    /// Copy up to `out.len()` samples, waiting at most `timeout` for data.
    /// Returns the number of samples written; zero on timeout.
    fn pop(&self, out: &mut [i16], timeout: Duration) -> usize {
        let Ok(mut queue) = self.queue.lock() else {
            return 0;
        };

        if queue.is_empty() {
            match self.available.wait_timeout(queue, timeout) {
                Ok((guard, _)) => queue = guard,
                Err(_) => return 0,
            }
        }

        let n = out.len().min(queue.len());
        for (slot, sample) in out.iter_mut().zip(queue.drain(..n)) {
            *slot = sample;
        }
        n
    }
}

/// Microphone source delivering 16 kHz mono i16 frames.
///
/// cpal stream handles cannot cross threads, so the stream lives on a small
/// dedicated thread for its whole lifetime; this type only holds channels
/// and flags and is therefore safe to hand to the capture worker.
pub struct MicSource {
    buffer: Arc<SpillBuffer>,
    run: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
    stream_thread: Option<JoinHandle<()>>,
}

impl MicSource {
    /// Open the input device. Fails if the device cannot be opened at
    /// 16 kHz mono 16-bit PCM.
    pub fn open(device_index: Option<usize>) -> Result<Self> {
        let buffer = Arc::new(SpillBuffer::new(SPILL_CAPACITY));
        let run = Arc::new(AtomicBool::new(true));
        let playing = Arc::new(AtomicBool::new(false));

        let (ready_tx, ready_rx) = mpsc::channel::<Result<String>>();
        let thread_buffer = buffer.clone();
        let thread_run = run.clone();
        let thread_playing = playing.clone();

        let stream_thread = thread::Builder::new()
            .name("mic-stream".to_string())
            .spawn(move || {
                let stream = match build_stream(device_index, thread_buffer) {
                    Ok((stream, name)) => {
                        let _ = ready_tx.send(Ok(name));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let mut started = false;
                while thread_run.load(Ordering::SeqCst) {
                    if !started && thread_playing.load(Ordering::SeqCst) {
                        if let Err(e) = stream.play() {
                            warn!("failed to start input stream: {}", e);
                        }
                        started = true;
                    }
                    thread::sleep(STREAM_POLL);
                }

                drop(stream);
            })?;

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(name)) => {
                info!("🎤 input device ready: {}", name);
                Ok(Self {
                    buffer,
                    run,
                    playing,
                    stream_thread: Some(stream_thread),
                })
            }
            Ok(Err(e)) => {
                run.store(false, Ordering::SeqCst);
                let _ = stream_thread.join();
                Err(e)
            }
            Err(_) => {
                run.store(false, Ordering::SeqCst);
                let _ = stream_thread.join();
                Err(anyhow::anyhow!("timed out opening input device"))
            }
        }
    }
}

fn build_stream(
    device_index: Option<usize>,
    buffer: Arc<SpillBuffer>,
) -> Result<(cpal::Stream, String)> {
    let host = cpal::default_host();

    let device = if let Some(idx) = device_index {
        host.input_devices()?
            .nth(idx)
            .context("Device index out of range")?
    } else {
        host.default_input_device()
            .context("No default input device")?
    };

    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    debug!("using audio device: {}", name);

    let config = cpal::StreamConfig {
        channels: CHANNELS,
        sample_rate: cpal::SampleRate(SAMPLE_RATE),
        buffer_size: cpal::BufferSize::Fixed(FRAME_SAMPLES as u32),
    };

    let stream = device.build_input_stream(
        &config,
        move |data: &[i16], _: &cpal::InputCallbackInfo| {
            buffer.push(data);
        },
        |err| {
            warn!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok((stream, name))
}

impl AudioSource for MicSource {
    fn start(&mut self) -> Result<()> {
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self, frame: &mut [i16]) -> isize {
        self.buffer.pop(frame, READ_WAIT) as isize
    }

    fn stop(&mut self) {
        self.playing.store(false, Ordering::SeqCst);
        self.run.store(false, Ordering::SeqCst);
        if let Some(handle) = self.stream_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        self.stop();
    }
}
