//! [`SpeechArbiter`] – at most one playback at a time, single-slot buffer.
//!
//! There is no speech queue.  [`submit`][SpeechArbiter::submit] overwrites
//! whatever job is loaded but not yet playing, so of two quick submissions
//! only the second is ever heard.  A job that has started playing is never
//! interrupted.
//!
//! Two locks are involved and always taken in the same order: the playback
//! lock (held for the whole clip) and then, briefly, the slot lock.
//! Producers only ever touch the slot lock, so `submit` never waits on a
//! clip that is playing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rover_hal::AudioOutput;
use rover_types::{AudioHandle, RoverError};
use tracing::{debug, info, warn};

const WAIT_POLL: Duration = Duration::from_millis(10);

#[derive(Default)]
struct Slot {
    pending: Option<AudioHandle>,
    playing: bool,
}

pub struct SpeechArbiter {
    audio: Arc<dyn AudioOutput>,
    slot: Mutex<Slot>,
    playback: Mutex<()>,
    played: AtomicU64,
    failed: AtomicU64,
}

impl SpeechArbiter {
    pub fn new(audio: Arc<dyn AudioOutput>) -> Self {
        Self {
            audio,
            slot: Mutex::new(Slot::default()),
            playback: Mutex::new(()),
            played: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Load `audio` for the speech loop.  Returns the job it replaced, which
    /// will now never play.
    pub fn submit(&self, audio: AudioHandle) -> Option<AudioHandle> {
        let replaced = self.slot.lock().pending.replace(audio);
        if let Some(old) = &replaced {
            debug!(dropped = %old, "speech job overwritten before playback");
        }
        replaced
    }

    /// `true` while a job is waiting or playing.
    pub fn is_loaded(&self) -> bool {
        let slot = self.slot.lock();
        slot.pending.is_some() || slot.playing
    }

    /// Play the loaded job, if any, blocking until it ends.  Returns `true`
    /// when a job was taken from the slot.
    pub fn play_next(&self) -> bool {
        let _playback = self.playback.lock();
        let job = {
            let mut slot = self.slot.lock();
            let job = slot.pending.take();
            slot.playing = job.is_some();
            job
        };
        let Some(job) = job else {
            return false;
        };

        let result = self.audio.play_blocking(&job);
        self.slot.lock().playing = false;
        self.record(&job, result);
        true
    }

    /// Play `audio` right now on the calling thread, bypassing the slot.
    /// Waits for any clip already playing to end first.
    ///
    /// # Errors
    ///
    /// Returns the driver's [`RoverError::AudioFault`].
    pub fn speak_now(&self, audio: &AudioHandle) -> Result<(), RoverError> {
        let _playback = self.playback.lock();
        let result = self.audio.play_blocking(audio);
        self.record(audio, result.clone());
        result
    }

    /// Poll until nothing is loaded or `timeout` elapses.  Returns `true`
    /// when the arbiter went idle in time.
    pub fn wait_for_speech(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_loaded() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(WAIT_POLL);
        }
        true
    }

    pub fn played(&self) -> u64 {
        self.played.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Start the speech loop on a dedicated thread.
    pub fn spawn_loop(
        self: Arc<Self>,
        poll_interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, RoverError> {
        std::thread::Builder::new()
            .name("rover-speech".to_string())
            .spawn(move || {
                info!("speech loop started");
                while !shutdown.load(Ordering::Acquire) {
                    if !self.play_next() {
                        std::thread::sleep(poll_interval);
                    }
                }
                info!("speech loop stopped");
            })
            .map_err(|e| RoverError::Dispatch(format!("failed to spawn speech loop: {e}")))
    }

    fn record(&self, job: &AudioHandle, result: Result<(), RoverError>) {
        match result {
            Ok(()) => {
                self.played.fetch_add(1, Ordering::Relaxed);
                debug!(audio = %job, "playback finished");
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(audio = %job, error = %e, "playback failed");
            }
        }
    }
}
