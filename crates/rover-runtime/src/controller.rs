//! [`RobotController`] – the single owned context for one robot.
//!
//! Holds the command queue, posture controller, executor, speech arbiter,
//! sensor router and ad hoc pool, plus the driver handles they share.
//! [`start`][RobotController::start] launches the background loops:
//!
//! | Thread | Work |
//! |---|---|
//! | `rover-drain` | pops the queue and runs one action at a time |
//! | `rover-speech` | plays the loaded speech job |
//! | `rover-touch` | polls the touch pad (if enabled) |
//! | `rover-motion` | polls the accelerometer (if enabled) |
//!
//! Ad hoc actions run on the `rover-adhoc` pool instead of the drain loop.
//!
//! [`shutdown`][RobotController::shutdown] stops and joins every loop, stops
//! the pool, and halts body, head and tail.  It also runs on drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rover_hal::{Actuator, AudioOutput, BodyPart, Sensors, SimDog};
use rover_kernel::{ActionCatalog, ActionExecutor, PostureController};
use rover_types::{ActionBatch, AudioHandle, ItemKind, LedMode, Posture, QueueMode, RoverError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adhoc::{AdHocPool, AdHocTask};
use crate::config::RuntimeConfig;
use crate::dispatcher::Dispatcher;
use crate::queue::{CommandQueue, QueueSnapshot};
use crate::sensors::SensorInterruptRouter;
use crate::speech::SpeechArbiter;

const WAIT_POLL: Duration = Duration::from_millis(10);

/// The three driver handles the controller needs.
#[derive(Clone)]
pub struct Drivers {
    pub actuator: Arc<dyn Actuator>,
    pub audio: Arc<dyn AudioOutput>,
    pub sensors: Arc<dyn Sensors>,
}

impl Drivers {
    /// Use one simulator for all three roles.
    pub fn sim(dog: Arc<SimDog>) -> Self {
        Self {
            actuator: dog.clone(),
            audio: dog.clone(),
            sensors: dog,
        }
    }
}

/// Serialisable snapshot returned by [`RobotController::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    #[serde(flatten)]
    pub queue: QueueSnapshot,
    pub posture: Posture,
    pub current_action: Option<String>,
    pub speech_loaded: bool,
    pub taken_at: DateTime<Utc>,
}

pub struct RobotController {
    config: RuntimeConfig,
    actuator: Arc<dyn Actuator>,
    queue: Arc<CommandQueue>,
    executor: Arc<ActionExecutor>,
    speech: Arc<SpeechArbiter>,
    router: Arc<SensorInterruptRouter>,
    dispatcher: Arc<Dispatcher>,
    adhoc: AdHocPool,
    shutdown: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl RobotController {
    /// Wire every component together.  No thread is started yet.
    ///
    /// # Errors
    ///
    /// - [`RoverError::Config`] – an interrupt response names an action the
    ///   catalog does not have.
    /// - [`RoverError::Dispatch`] – the ad hoc pool could not be created.
    pub fn new(
        drivers: Drivers,
        catalog: ActionCatalog,
        config: RuntimeConfig,
    ) -> Result<Self, RoverError> {
        if let Some(missing) = config
            .interrupts
            .action_names()
            .find(|name| !catalog.contains(name))
        {
            return Err(RoverError::Config(format!(
                "interrupt response uses unknown action '{missing}'"
            )));
        }

        let posture = Arc::new(PostureController::new(
            drivers.actuator.clone(),
            config.initial_posture,
        ));
        let executor = Arc::new(ActionExecutor::new(
            Arc::new(catalog),
            posture,
            drivers.actuator.clone(),
        ));
        let queue = Arc::new(CommandQueue::new());
        let speech = Arc::new(SpeechArbiter::new(drivers.audio));
        let router = Arc::new(SensorInterruptRouter::new(
            queue.clone(),
            drivers.actuator.clone(),
            drivers.sensors,
            config.sensors.clone(),
            config.interrupts.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            queue.clone(),
            executor.clone(),
            config.dispatch.poll_interval(),
        ));
        let adhoc = AdHocPool::new(
            executor.clone(),
            config.dispatch.adhoc_workers,
            config.dispatch.adhoc_min_interval(),
        )?;

        Ok(Self {
            config,
            actuator: drivers.actuator,
            queue,
            executor,
            speech,
            router,
            dispatcher,
            adhoc,
            shutdown: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    /// Launch the background loops.  A second call is a no-op.
    ///
    /// # Errors
    ///
    /// [`RoverError::Dispatch`] if a thread cannot be spawned, or if the
    /// controller has already been shut down.
    pub fn start(&self) -> Result<(), RoverError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(RoverError::Dispatch("controller has been shut down".to_string()));
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut workers = self.workers.lock();
        workers.push(self.dispatcher.clone().spawn(self.shutdown.clone())?);
        workers.push(
            self.speech
                .clone()
                .spawn_loop(self.config.speech.poll_interval(), self.shutdown.clone())?,
        );
        if self.config.sensors.touch_enabled {
            workers.push(self.router.clone().spawn_touch_loop(self.shutdown.clone())?);
        }
        if self.config.sensors.motion_enabled {
            workers.push(self.router.clone().spawn_motion_loop(self.shutdown.clone())?);
        }
        info!(threads = workers.len(), posture = %self.posture(), "controller started");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Append action names to the queue.  Returns how many were queued.
    pub fn execute_actions<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queue.execute_actions(names)
    }

    /// Route a parsed batch: action items go to the queue in order, speech
    /// items to the speech slot.
    pub fn perform(&self, batch: &ActionBatch) -> usize {
        let mut actions = Vec::new();
        for item in &batch.items {
            match item.kind {
                ItemKind::Action => actions.push(item.value.clone()),
                ItemKind::Speech => {
                    self.speak(AudioHandle::new(&item.value));
                }
            }
        }
        let queued = self.queue.execute_actions(actions);
        info!(batch = %batch.id, queued, "batch submitted");
        queued
    }

    /// Run one action on the ad hoc pool, outside the drain loop.
    pub fn execute_action(&self, name: &str) -> Result<AdHocTask, RoverError> {
        self.adhoc.submit(name)
    }

    /// Discard every queued action that has not started.
    pub fn flush(&self) -> usize {
        self.queue.flush()
    }

    pub fn set_mode(&self, mode: QueueMode) {
        self.queue.set_mode(mode);
    }

    // -------------------------------------------------------------------------
    // Speech and LEDs
    // -------------------------------------------------------------------------

    /// Load a clip for the speech loop, replacing any clip not yet playing.
    pub fn speak(&self, audio: AudioHandle) -> Option<AudioHandle> {
        self.speech.submit(audio)
    }

    /// Play a clip now, blocking the caller.
    pub fn speak_now(&self, audio: &AudioHandle) -> Result<(), RoverError> {
        self.speech.speak_now(audio)
    }

    /// Best-effort LED change; driver errors are logged only.
    pub fn set_led(&self, mode: LedMode, color: &str) {
        if let Err(e) = self.actuator.set_led(mode, color) {
            warn!(error = %e, ?mode, color, "LED update failed");
        }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            queue: self.queue.snapshot(),
            posture: self.posture(),
            current_action: self.executor.current_action(),
            speech_loaded: self.speech.is_loaded(),
            taken_at: Utc::now(),
        }
    }

    pub fn posture(&self) -> Posture {
        self.executor.posture().current()
    }

    pub fn catalog(&self) -> &ActionCatalog {
        self.executor.catalog()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn router(&self) -> &SensorInterruptRouter {
        &self.router
    }

    /// Poll until the queue has left [`QueueMode::RunningBatch`] and nothing
    /// is in flight.  Returns `false` on timeout.
    pub fn wait_for_actions(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.queue.is_idle() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(WAIT_POLL);
        }
        true
    }

    pub fn wait_for_speech(&self, timeout: Duration) -> bool {
        self.speech.wait_for_speech(timeout)
    }

    // -------------------------------------------------------------------------
    // Shutdown
    // -------------------------------------------------------------------------

    /// Stop every loop, the ad hoc pool and the motors.  Idempotent.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.store(true, Ordering::Release);
        let dropped = self.queue.flush();

        for handle in self.workers.lock().drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                warn!(thread = %name, "background loop panicked");
            }
        }
        self.adhoc.shutdown();

        for part in [BodyPart::Body, BodyPart::Head, BodyPart::Tail] {
            if let Err(e) = self.actuator.stop(part) {
                warn!(?part, error = %e, "stop command failed");
            }
        }
        info!(dropped, "controller shut down");
    }
}

impl Drop for RobotController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
