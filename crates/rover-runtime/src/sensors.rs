//! Sensor interrupts: touch and lift/set-down detection.
//!
//! Two polling loops run independently of the drain loop.  When one fires
//! it pre-empts the command queue: everything not yet started is discarded
//! and a short response batch takes its place.  The item the drain loop is
//! currently running is never interrupted.
//!
//! | Event | Queue effect | Response |
//! |---|---|---|
//! | touch (any non-idle reading) | flush + enqueue | `touch` batch, LED change |
//! | set down after a lift | flush + enqueue | `set_down` batch |
//! | lifted and held | append | `lifted` batch |
//!
//! A failed sensor read is logged, the loop backs off for
//! `fault_backoff_ms`, and polling resumes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rover_hal::{Actuator, Sensors};
use rover_types::{RoverError, TouchState};
use tracing::{info, warn};

use crate::config::{InterruptResponses, SensorConfig};
use crate::queue::CommandQueue;

/// Longest single sleep in a polling loop, so shutdown is noticed quickly.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

// ────────────────────────────────────────────────────────────────────────────
// Motion edge detection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEdge {
    /// Picked up off the ground and held there.
    Lifted,
    /// Put back down after a lift.
    SetDown,
}

/// Two-threshold hysteresis detector over one accelerometer axis.
///
/// The magnitude of each sample is compared against `lift_threshold` and
/// `rest_threshold` (`rest < lift`).  A lift is reported only after
/// `hold_samples` consecutive samples above the lift threshold while
/// resting; a set-down is reported on the first sample below the rest
/// threshold while lifted.  Samples between the two thresholds never change
/// state, which keeps the detector from chattering at the boundary.
#[derive(Debug, Clone)]
pub struct MotionDetector {
    lift_threshold: i32,
    rest_threshold: i32,
    hold_samples: u32,
    lifted: bool,
    resting: bool,
    above: u32,
}

impl MotionDetector {
    pub fn new(lift_threshold: i32, rest_threshold: i32, hold_samples: u32) -> Self {
        Self {
            lift_threshold,
            rest_threshold,
            hold_samples: hold_samples.max(1),
            lifted: false,
            resting: true,
            above: 0,
        }
    }

    pub fn from_config(config: &SensorConfig) -> Self {
        Self::new(
            config.lift_threshold,
            config.rest_threshold,
            config.lift_hold_samples,
        )
    }

    pub fn is_lifted(&self) -> bool {
        self.lifted
    }

    /// Feed one raw sample.  Returns the edge it completes, if any.
    pub fn update(&mut self, raw: i32) -> Option<MotionEdge> {
        let magnitude = raw.saturating_abs();

        if self.resting {
            if magnitude > self.lift_threshold {
                self.above += 1;
                if self.above >= self.hold_samples {
                    self.above = 0;
                    self.resting = false;
                    self.lifted = true;
                    return Some(MotionEdge::Lifted);
                }
            } else {
                self.above = 0;
            }
            return None;
        }

        if self.lifted && magnitude < self.rest_threshold {
            self.lifted = false;
            self.resting = true;
            return Some(MotionEdge::SetDown);
        }
        None
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Router
// ────────────────────────────────────────────────────────────────────────────

/// Turns sensor events into queue pre-emption.
pub struct SensorInterruptRouter {
    queue: Arc<CommandQueue>,
    actuator: Arc<dyn Actuator>,
    sensors: Arc<dyn Sensors>,
    config: SensorConfig,
    responses: InterruptResponses,
    detector: Mutex<MotionDetector>,
    touches: AtomicU64,
    lifts: AtomicU64,
    set_downs: AtomicU64,
    sensor_faults: AtomicU64,
}

impl SensorInterruptRouter {
    pub fn new(
        queue: Arc<CommandQueue>,
        actuator: Arc<dyn Actuator>,
        sensors: Arc<dyn Sensors>,
        config: SensorConfig,
        responses: InterruptResponses,
    ) -> Self {
        Self {
            detector: Mutex::new(MotionDetector::from_config(&config)),
            queue,
            actuator,
            sensors,
            config,
            responses,
            touches: AtomicU64::new(0),
            lifts: AtomicU64::new(0),
            set_downs: AtomicU64::new(0),
            sensor_faults: AtomicU64::new(0),
        }
    }

    /// React to one touch reading.  Returns `true` when it triggered an
    /// interrupt (any non-idle state).
    pub fn handle_touch(&self, state: TouchState) -> bool {
        if state.is_idle() {
            return false;
        }
        if let Some(led) = &self.responses.touch_led
            && let Err(e) = self.actuator.set_led(led.mode, &led.color)
        {
            warn!(error = %e, "touch LED update failed");
        }
        let dropped = self.queue.preempt(self.responses.touch.iter().cloned());
        self.touches.fetch_add(1, Ordering::Relaxed);
        info!(?state, dropped, "touch interrupt");
        true
    }

    /// React to a motion edge.
    pub fn handle_motion(&self, edge: MotionEdge) {
        match edge {
            MotionEdge::SetDown => {
                let dropped = self.queue.preempt(self.responses.set_down.iter().cloned());
                self.set_downs.fetch_add(1, Ordering::Relaxed);
                info!(dropped, "set down, returning to stand");
            }
            MotionEdge::Lifted => {
                self.queue
                    .execute_actions(self.responses.lifted.iter().cloned());
                self.lifts.fetch_add(1, Ordering::Relaxed);
                info!("lifted");
            }
        }
    }

    /// Read the touch pad once and react.  Returns whether an interrupt
    /// fired.
    pub fn poll_touch(&self) -> Result<bool, RoverError> {
        let state = self.sensors.read_touch()?;
        Ok(self.handle_touch(state))
    }

    /// Read the accelerometer once and react.  Returns the edge, if any.
    pub fn poll_motion(&self) -> Result<Option<MotionEdge>, RoverError> {
        let raw = self.sensors.read_accel_axis()?;
        let edge = self.detector.lock().update(raw);
        if let Some(edge) = edge {
            self.handle_motion(edge);
        }
        Ok(edge)
    }

    pub fn touch_count(&self) -> u64 {
        self.touches.load(Ordering::Relaxed)
    }

    pub fn lift_count(&self) -> u64 {
        self.lifts.load(Ordering::Relaxed)
    }

    pub fn set_down_count(&self) -> u64 {
        self.set_downs.load(Ordering::Relaxed)
    }

    pub fn sensor_fault_count(&self) -> u64 {
        self.sensor_faults.load(Ordering::Relaxed)
    }

    pub fn spawn_touch_loop(
        self: Arc<Self>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, RoverError> {
        spawn_named("rover-touch", move || {
            info!("touch loop started");
            while !shutdown.load(Ordering::Acquire) {
                match self.poll_touch() {
                    Ok(true) => sleep_unless(&shutdown, self.config.touch_debounce()),
                    Ok(false) => {}
                    Err(e) => {
                        self.note_fault(&e);
                        sleep_unless(&shutdown, self.config.fault_backoff());
                        continue;
                    }
                }
                sleep_unless(&shutdown, self.config.touch_poll());
            }
            info!("touch loop stopped");
        })
    }

    pub fn spawn_motion_loop(
        self: Arc<Self>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, RoverError> {
        spawn_named("rover-motion", move || {
            info!("motion loop started");
            while !shutdown.load(Ordering::Acquire) {
                if let Err(e) = self.poll_motion() {
                    self.note_fault(&e);
                    sleep_unless(&shutdown, self.config.fault_backoff());
                    continue;
                }
                sleep_unless(&shutdown, self.config.motion_poll());
            }
            info!("motion loop stopped");
        })
    }

    fn note_fault(&self, e: &RoverError) {
        self.sensor_faults.fetch_add(1, Ordering::Relaxed);
        warn!(error = %e, "sensor read failed, backing off");
    }
}

fn spawn_named(
    name: &str,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>, RoverError> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|e| RoverError::Dispatch(format!("failed to spawn {name}: {e}")))
}

/// Sleep for `total`, waking early if `shutdown` is set.
pub(crate) fn sleep_unless(shutdown: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    loop {
        if shutdown.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_hal::{HalCall, SimDog};
    use rover_types::{LedMode, QueueMode};

    fn router() -> (Arc<SimDog>, Arc<CommandQueue>, SensorInterruptRouter) {
        let dog = Arc::new(SimDog::new());
        let queue = Arc::new(CommandQueue::new());
        let r = SensorInterruptRouter::new(
            queue.clone(),
            dog.clone(),
            dog.clone(),
            SensorConfig::default(),
            InterruptResponses::default(),
        );
        (dog, queue, r)
    }

    #[test]
    fn detector_needs_held_lift() {
        let mut d = MotionDetector::new(20_000, 17_000, 3);
        assert_eq!(d.update(25_000), None);
        assert_eq!(d.update(25_000), None);
        assert_eq!(d.update(16_000), None); // streak broken
        assert_eq!(d.update(25_000), None);
        assert_eq!(d.update(25_000), None);
        assert_eq!(d.update(-25_000), Some(MotionEdge::Lifted));
        assert!(d.is_lifted());
    }

    #[test]
    fn detector_hysteresis_suppresses_chatter() {
        let mut d = MotionDetector::new(20_000, 17_000, 1);
        assert_eq!(d.update(21_000), Some(MotionEdge::Lifted));
        // Between thresholds: no state change in either direction.
        for v in [19_000, 21_000, 18_000, 22_000] {
            assert_eq!(d.update(v), None);
        }
        assert_eq!(d.update(16_384), Some(MotionEdge::SetDown));
        assert_eq!(d.update(16_384), None);
        assert_eq!(d.update(18_000), None);
    }

    #[test]
    fn idle_touch_is_ignored() {
        let (dog, queue, r) = router();
        queue.execute_actions(["bark"]);
        assert!(!r.handle_touch(TouchState::Idle));
        assert_eq!(queue.pending_len(), 1);
        assert!(dog.calls().is_empty());
    }

    #[test]
    fn touch_preempts_pending_and_sets_led() {
        let (dog, queue, r) = router();
        queue.execute_actions(["sit", "bark"]);
        assert!(r.handle_touch(TouchState::Left));

        let snap = queue.snapshot();
        assert_eq!(snap.pending, vec!["head nod", "wag_tail"]);
        assert_eq!(snap.mode, QueueMode::RunningBatch);
        assert_eq!(
            dog.calls(),
            vec![HalCall::Led {
                mode: LedMode::Listen,
                color: "#8A2BE2".into()
            }]
        );
        assert_eq!(r.touch_count(), 1);
    }

    #[test]
    fn set_down_preempts_lift_appends() {
        let (_, queue, r) = router();
        queue.execute_actions(["dab"]);
        r.handle_motion(MotionEdge::Lifted);
        assert_eq!(queue.snapshot().pending, vec!["dab", "wag_tail", "bark"]);

        r.handle_motion(MotionEdge::SetDown);
        assert_eq!(queue.snapshot().pending, vec!["stand"]);
        assert_eq!((r.lift_count(), r.set_down_count()), (1, 1));
    }

    #[test]
    fn poll_motion_walks_through_lift_and_set_down() {
        let (dog, queue, r) = router();
        dog.push_accel([25_000, 25_000, 25_000, 16_000]);
        let edges: Vec<_> = (0..4).map(|_| r.poll_motion().unwrap()).collect();
        assert_eq!(
            edges,
            vec![None, None, Some(MotionEdge::Lifted), Some(MotionEdge::SetDown)]
        );
        assert_eq!(queue.snapshot().pending, vec!["stand"]);
    }

    #[test]
    fn touch_loop_survives_sensor_fault() {
        let dog = Arc::new(SimDog::new());
        let queue = Arc::new(CommandQueue::new());
        let config = SensorConfig {
            touch_poll_ms: 1,
            fault_backoff_ms: 1,
            touch_debounce_ms: 1,
            ..SensorConfig::default()
        };
        let r = Arc::new(SensorInterruptRouter::new(
            queue.clone(),
            dog.clone(),
            dog.clone(),
            config,
            InterruptResponses::default(),
        ));
        dog.push_touch_fault();
        dog.push_touch_fault();
        dog.push_touch(TouchState::Right);

        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = r.clone().spawn_touch_loop(shutdown.clone()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while r.touch_count() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        shutdown.store(true, Ordering::Release);
        handle.join().unwrap();

        assert_eq!(r.sensor_fault_count(), 2);
        assert_eq!(r.touch_count(), 1);
        assert_eq!(queue.snapshot().pending, vec!["head nod", "wag_tail"]);
    }

    #[test]
    fn motion_loop_survives_sensor_fault() {
        let dog = Arc::new(SimDog::new());
        let queue = Arc::new(CommandQueue::new());
        let config = SensorConfig {
            motion_poll_ms: 1,
            fault_backoff_ms: 1,
            ..SensorConfig::default()
        };
        let r = Arc::new(SensorInterruptRouter::new(
            queue.clone(),
            dog.clone(),
            dog.clone(),
            config,
            InterruptResponses::default(),
        ));
        dog.push_accel_fault();
        dog.push_accel_fault();
        dog.push_accel([25_000, 25_000, 25_000, 16_000]);

        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = r.clone().spawn_motion_loop(shutdown.clone()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while r.set_down_count() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        shutdown.store(true, Ordering::Release);
        handle.join().unwrap();

        assert_eq!(r.sensor_fault_count(), 2);
        assert_eq!((r.lift_count(), r.set_down_count()), (1, 1));
        assert_eq!(queue.snapshot().pending, vec!["stand"]);
    }

    #[test]
    fn sleep_unless_returns_early_on_shutdown() {
        let flag = AtomicBool::new(true);
        let started = Instant::now();
        sleep_unless(&flag, Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
