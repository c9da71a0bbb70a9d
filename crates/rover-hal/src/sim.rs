//! In-process simulation driver for tests and hardware-less runs.
//!
//! [`SimDog`] implements [`Actuator`], [`AudioOutput`] and [`Sensors`] at
//! once.  It records every driver call as a [`HalCall`] and lets a test:
//!
//! - make a preset fail ([`SimDog::fail_preset`]),
//! - pause a preset mid-motion until released ([`SimDog::hold_preset`]),
//! - script touch and accelerometer readings, including read errors.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::{Actuator, HalCall, SimDog};
//!
//! let dog = SimDog::new();
//! dog.do_action("sit", 60).unwrap();
//! dog.wait_all_done().unwrap();
//!
//! assert_eq!(dog.presets(), vec!["sit".to_string()]);
//! assert!(matches!(dog.calls().last(), Some(HalCall::WaitAllDone)));
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rover_types::{AudioHandle, HeadPose, LedMode, LegFrame, RoverError, TouchState};
use tracing::debug;

use crate::actuator::{Actuator, BodyPart};
use crate::audio::AudioOutput;
use crate::sensor::Sensors;

/// Accelerometer reading reported when nothing is scripted: robot standing
/// still on the ground.
const DEFAULT_RESTING_ACCEL: i32 = 16_384;

// ────────────────────────────────────────────────────────────────────────────
// Recorded calls
// ────────────────────────────────────────────────────────────────────────────

/// One successful driver call, as recorded by [`SimDog`].
#[derive(Debug, Clone, PartialEq)]
pub enum HalCall {
    Action { preset: String, speed: u8 },
    Head {
        frames: usize,
        pitch_comp: f32,
        speed: u8,
        immediately: bool,
    },
    Legs { frames: usize, speed: u8 },
    WaitAllDone,
    Stop(BodyPart),
    Led { mode: LedMode, color: String },
    Play(AudioHandle),
}

// ────────────────────────────────────────────────────────────────────────────
// Hold gate
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct GateState {
    reached: bool,
    released: bool,
}

/// A one-shot latch that pauses a simulated preset mid-motion.
///
/// The driver thread that reaches the preset blocks until
/// [`release`][Self::release] is called; the test thread can wait for that
/// moment with [`wait_reached`][Self::wait_reached].
#[derive(Clone, Default)]
pub struct HoldGate {
    inner: Arc<(Mutex<GateState>, Condvar)>,
}

impl HoldGate {
    /// Wait until a driver thread is parked on this gate.  Returns `false` if
    /// `timeout` elapses first.
    pub fn wait_reached(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut state = lock.lock();
        while !state.reached {
            if cvar.wait_until(&mut state, deadline).timed_out() {
                return state.reached;
            }
        }
        true
    }

    /// Let the parked driver thread finish its motion.
    pub fn release(&self) {
        let (lock, cvar) = &*self.inner;
        lock.lock().released = true;
        cvar.notify_all();
    }

    fn park(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock();
        state.reached = true;
        cvar.notify_all();
        while !state.released {
            cvar.wait(&mut state);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimDog
// ────────────────────────────────────────────────────────────────────────────

/// A simulated robot dog that records commands and replays scripted sensor
/// data.  Every call succeeds unless a fault has been injected.
pub struct SimDog {
    log: Mutex<Vec<HalCall>>,
    failing: Mutex<HashSet<String>>,
    holds: Mutex<HashMap<String, HoldGate>>,
    motion_time: Mutex<Duration>,
    playback_time: Mutex<Duration>,
    fail_audio: Mutex<bool>,
    touch_script: Mutex<VecDeque<Result<TouchState, RoverError>>>,
    accel_script: Mutex<VecDeque<Result<i32, RoverError>>>,
    resting_accel: Mutex<i32>,
}

impl Default for SimDog {
    fn default() -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            holds: Mutex::new(HashMap::new()),
            motion_time: Mutex::new(Duration::ZERO),
            playback_time: Mutex::new(Duration::ZERO),
            fail_audio: Mutex::new(false),
            touch_script: Mutex::new(VecDeque::new()),
            accel_script: Mutex::new(VecDeque::new()),
            resting_accel: Mutex::new(DEFAULT_RESTING_ACCEL),
        }
    }
}

impl SimDog {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Fault injection and timing
    // -------------------------------------------------------------------------

    /// Make every future `do_action(preset, ..)` fail with an actuator fault.
    pub fn fail_preset(&self, preset: impl Into<String>) {
        self.failing.lock().insert(preset.into());
    }

    /// Remove every injected preset fault.
    pub fn clear_faults(&self) {
        self.failing.lock().clear();
    }

    /// Pause the next `do_action(preset, ..)` until the returned gate is
    /// released.  The call is recorded before the driver parks.
    pub fn hold_preset(&self, preset: impl Into<String>) -> HoldGate {
        let gate = HoldGate::default();
        self.holds.lock().insert(preset.into(), gate.clone());
        gate
    }

    /// Simulated duration of every motion preset.
    pub fn set_motion_time(&self, d: Duration) {
        *self.motion_time.lock() = d;
    }

    /// Simulated duration of every audio clip.
    pub fn set_playback_time(&self, d: Duration) {
        *self.playback_time.lock() = d;
    }

    pub fn fail_audio(&self, fail: bool) {
        *self.fail_audio.lock() = fail;
    }

    // -------------------------------------------------------------------------
    // Sensor scripting
    // -------------------------------------------------------------------------

    /// Queue a touch reading.  Unscripted reads return [`TouchState::Idle`].
    pub fn push_touch(&self, state: TouchState) {
        self.touch_script.lock().push_back(Ok(state));
    }

    /// Queue a failing touch read.
    pub fn push_touch_fault(&self) {
        self.touch_script.lock().push_back(Err(RoverError::SensorFault {
            sensor: "touch".to_string(),
            details: "i2c read timed out".to_string(),
        }));
    }

    /// Queue accelerometer readings.  Unscripted reads return the resting
    /// value.
    pub fn push_accel(&self, values: impl IntoIterator<Item = i32>) {
        self.accel_script.lock().extend(values.into_iter().map(Ok));
    }

    /// Queue a failing accelerometer read.
    pub fn push_accel_fault(&self) {
        self.accel_script.lock().push_back(Err(RoverError::SensorFault {
            sensor: "accelerometer".to_string(),
            details: "imu not responding".to_string(),
        }));
    }

    pub fn set_resting_accel(&self, value: i32) {
        *self.resting_accel.lock() = value;
    }

    /// `true` once every scripted sensor reading has been consumed.
    pub fn sensor_script_drained(&self) -> bool {
        self.touch_script.lock().is_empty() && self.accel_script.lock().is_empty()
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Snapshot of every recorded call, oldest first.
    pub fn calls(&self) -> Vec<HalCall> {
        self.log.lock().clone()
    }

    /// Names of the presets that were queued, oldest first.
    pub fn presets(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|c| match c {
                HalCall::Action { preset, .. } => Some(preset.clone()),
                _ => None,
            })
            .collect()
    }

    /// Audio clips that were played, oldest first.
    pub fn plays(&self) -> Vec<AudioHandle> {
        self.log
            .lock()
            .iter()
            .filter_map(|c| match c {
                HalCall::Play(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    fn record(&self, call: HalCall) {
        self.log.lock().push(call);
    }
}

impl Actuator for SimDog {
    fn do_action(&self, preset: &str, speed: u8) -> Result<(), RoverError> {
        if self.failing.lock().contains(preset) {
            debug!(preset, "sim: injected actuator fault");
            return Err(RoverError::ActuatorFault {
                component: "body".to_string(),
                details: format!("simulated fault in preset '{preset}'"),
            });
        }
        self.record(HalCall::Action {
            preset: preset.to_string(),
            speed,
        });

        let hold = self.holds.lock().remove(preset);
        if let Some(gate) = hold {
            gate.park();
        }
        let motion = *self.motion_time.lock();
        if !motion.is_zero() {
            std::thread::sleep(motion);
        }
        Ok(())
    }

    fn move_head(
        &self,
        frames: &[HeadPose],
        pitch_comp: f32,
        speed: u8,
        immediately: bool,
    ) -> Result<(), RoverError> {
        self.record(HalCall::Head {
            frames: frames.len(),
            pitch_comp,
            speed,
            immediately,
        });
        Ok(())
    }

    fn move_legs(&self, frames: &[LegFrame], speed: u8) -> Result<(), RoverError> {
        self.record(HalCall::Legs {
            frames: frames.len(),
            speed,
        });
        Ok(())
    }

    fn wait_all_done(&self) -> Result<(), RoverError> {
        self.record(HalCall::WaitAllDone);
        Ok(())
    }

    fn stop(&self, part: BodyPart) -> Result<(), RoverError> {
        self.record(HalCall::Stop(part));
        Ok(())
    }

    fn set_led(&self, mode: LedMode, color: &str) -> Result<(), RoverError> {
        self.record(HalCall::Led {
            mode,
            color: color.to_string(),
        });
        Ok(())
    }
}

impl AudioOutput for SimDog {
    fn play_blocking(&self, audio: &AudioHandle) -> Result<(), RoverError> {
        if *self.fail_audio.lock() {
            return Err(RoverError::AudioFault(format!(
                "simulated playback failure for {audio}"
            )));
        }
        debug!(%audio, "sim: playing clip");
        self.record(HalCall::Play(audio.clone()));
        let playback = *self.playback_time.lock();
        if !playback.is_zero() {
            std::thread::sleep(playback);
        }
        Ok(())
    }
}

impl Sensors for SimDog {
    fn read_touch(&self) -> Result<TouchState, RoverError> {
        self.touch_script
            .lock()
            .pop_front()
            .unwrap_or(Ok(TouchState::Idle))
    }

    fn read_accel_axis(&self) -> Result<i32, RoverError> {
        let scripted = self.accel_script.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(*self.resting_accel.lock()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn records_calls_in_order() {
        let dog = SimDog::new();
        dog.move_head(&[HeadPose::level()], -35.0, 80, true).unwrap();
        dog.do_action("sit", 60).unwrap();
        dog.wait_all_done().unwrap();

        let calls = dog.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], HalCall::Head { immediately: true, .. }));
        assert_eq!(
            calls[1],
            HalCall::Action {
                preset: "sit".to_string(),
                speed: 60
            }
        );
        assert_eq!(calls[2], HalCall::WaitAllDone);
    }

    #[test]
    fn failing_preset_is_not_recorded() {
        let dog = SimDog::new();
        dog.fail_preset("bark");
        assert!(matches!(
            dog.do_action("bark", 80),
            Err(RoverError::ActuatorFault { .. })
        ));
        assert!(dog.presets().is_empty());
        // Other presets are unaffected.
        dog.do_action("nod", 80).unwrap();
        assert_eq!(dog.presets(), vec!["nod".to_string()]);
    }

    #[test]
    fn hold_gate_pauses_until_released() {
        let dog = Arc::new(SimDog::new());
        let gate = dog.hold_preset("sit");

        let worker = {
            let dog = Arc::clone(&dog);
            thread::spawn(move || dog.do_action("sit", 60))
        };

        assert!(gate.wait_reached(Duration::from_secs(2)));
        assert!(!worker.is_finished());
        gate.release();
        assert!(worker.join().unwrap().is_ok());

        // The gate is one-shot.
        dog.do_action("sit", 60).unwrap();
        assert_eq!(dog.presets().len(), 2);
    }

    #[test]
    fn wait_reached_times_out_when_preset_never_runs() {
        let dog = SimDog::new();
        let gate = dog.hold_preset("howling");
        assert!(!gate.wait_reached(Duration::from_millis(20)));
    }

    #[test]
    fn touch_script_then_idle() {
        let dog = SimDog::new();
        dog.push_touch(TouchState::Left);
        dog.push_touch_fault();

        assert_eq!(dog.read_touch().unwrap(), TouchState::Left);
        assert!(dog.read_touch().is_err());
        assert_eq!(dog.read_touch().unwrap(), TouchState::Idle);
        assert!(dog.sensor_script_drained());
    }

    #[test]
    fn accel_script_then_resting_value() {
        let dog = SimDog::new();
        dog.set_resting_accel(100);
        dog.push_accel([1, 2]);
        assert_eq!(dog.read_accel_axis().unwrap(), 1);
        assert_eq!(dog.read_accel_axis().unwrap(), 2);
        assert_eq!(dog.read_accel_axis().unwrap(), 100);
    }

    #[test]
    fn audio_fault_injection() {
        let dog = SimDog::new();
        let clip = AudioHandle::new("hello.wav");
        dog.play_blocking(&clip).unwrap();
        dog.fail_audio(true);
        assert!(matches!(
            dog.play_blocking(&clip),
            Err(RoverError::AudioFault(_))
        ));
        assert_eq!(dog.plays(), vec![clip]);
    }
}
