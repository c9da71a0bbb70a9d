//! [`ActionExecutor`] – runs one named action to completion.
//!
//! For each call to [`ActionExecutor::run`]:
//!
//! 1. Resolve the [`ActionDescriptor`] through the [`ActionCatalog`].
//! 2. **Posture gate** – if the action requires a posture and it is not the
//!    same action that last passed the gate, call
//!    [`PostureController::change_status`].  Running the same posture-gated
//!    action twice in a row transitions only once; a *different* action with
//!    a requirement always transitions, even to the posture already held.
//!    The action is remembered only once its transition has succeeded, so a
//!    failed transition is attempted again the next time the same action
//!    runs instead of being skipped as already done.
//! 3. Run the `before` chain, the action's own step, then the `after` chain,
//!    draining the motor bus after each phase.
//!
//! Every failure ends the action without retry.  The error is logged and
//! returned so the caller can discard it.  A panicking [`Step::Custom`]
//! routine is caught and reported as [`RoverError::ActuatorFault`], so it
//! cannot take the drain loop down with it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rover_hal::Actuator;
use rover_types::RoverError;
use tracing::{debug, info_span, warn};

use crate::catalog::{ActionCatalog, ActionDescriptor, Step, normalize_name};
use crate::posture::PostureController;

#[derive(Default)]
struct Bookkeeping {
    /// Action currently (or most recently successfully) running.
    current_action: Option<String>,
    /// Last action that passed the posture gate.
    last_posture_action: Option<String>,
}

/// Executes catalog actions against the actuator, one phase at a time.
pub struct ActionExecutor {
    catalog: Arc<ActionCatalog>,
    posture: Arc<PostureController>,
    actuator: Arc<dyn Actuator>,
    bookkeeping: Mutex<Bookkeeping>,
}

impl ActionExecutor {
    pub fn new(
        catalog: Arc<ActionCatalog>,
        posture: Arc<PostureController>,
        actuator: Arc<dyn Actuator>,
    ) -> Self {
        Self {
            catalog,
            posture,
            actuator,
            bookkeeping: Mutex::new(Bookkeeping::default()),
        }
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn posture(&self) -> &PostureController {
        &self.posture
    }

    /// Name of the action in progress, or of the last one that completed.
    /// Cleared when an action fails or is unknown.
    pub fn current_action(&self) -> Option<String> {
        self.bookkeeping.lock().current_action.clone()
    }

    /// Run `name` to completion, blocking the calling thread.
    ///
    /// # Errors
    ///
    /// - [`RoverError::UnknownAction`] – the name is not in the catalog.
    /// - [`RoverError::ActuatorFault`] – a driver call failed; the remaining
    ///   phases of this action are skipped.
    pub fn run(&self, name: &str) -> Result<(), RoverError> {
        let key = normalize_name(name);
        let span = info_span!("action", name = %key);
        let _enter = span.enter();

        let descriptor = match self.catalog.lookup(&key) {
            Ok(d) => d,
            Err(e) => {
                warn!("unknown action, skipping");
                self.bookkeeping.lock().current_action = None;
                return Err(e);
            }
        };

        self.bookkeeping.lock().current_action = Some(key.clone());
        match self.perform(&key, &descriptor) {
            Ok(()) => {
                debug!("action complete");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "action failed");
                self.bookkeeping.lock().current_action = None;
                Err(e)
            }
        }
    }

    fn perform(&self, key: &str, descriptor: &ActionDescriptor) -> Result<(), RoverError> {
        if let Some(target) = descriptor.required_posture {
            let needs_transition =
                self.bookkeeping.lock().last_posture_action.as_deref() != Some(key);
            if needs_transition {
                self.posture.change_status(target)?;
                self.bookkeeping.lock().last_posture_action = Some(key.to_string());
            } else {
                debug!(posture = %target, "same posture action as last time, gate skipped");
            }
        }

        if let Some(chain) = &descriptor.before {
            let step = self.catalog.resolve_chain(chain)?;
            self.run_phase(step)?;
        }
        self.run_phase(&descriptor.run)?;
        if let Some(chain) = &descriptor.after {
            let step = self.catalog.resolve_chain(chain)?;
            self.run_phase(step)?;
        }
        Ok(())
    }

    /// Queue `step` and wait for the motor bus to drain.
    fn run_phase(&self, step: &Step) -> Result<(), RoverError> {
        if step.is_noop() {
            return Ok(());
        }
        self.run_step(step)?;
        self.actuator.wait_all_done()
    }

    fn run_step(&self, step: &Step) -> Result<(), RoverError> {
        match step {
            Step::Noop => Ok(()),
            Step::Preset { name, speed } => {
                debug!(preset = %name, speed, "preset");
                self.actuator.do_action(name, *speed)
            }
            Step::Head {
                frames,
                speed,
                immediately,
            } => self
                .actuator
                .move_head(frames, self.posture.head_pitch(), *speed, *immediately),
            Step::Legs { frames, speed } => self.actuator.move_legs(frames, *speed),
            Step::Led { mode, color } => self.actuator.set_led(*mode, color),
            Step::Repeat { step, times, pause } => {
                for _ in 0..*times {
                    self.run_step(step)?;
                    std::thread::sleep(*pause);
                }
                Ok(())
            }
            Step::Sequence(steps) => steps.iter().try_for_each(|s| self.run_step(s)),
            Step::Custom(f) => catch_unwind(AssertUnwindSafe(|| f(self.actuator.as_ref())))
                .unwrap_or_else(|_| {
                    Err(RoverError::ActuatorFault {
                        component: "custom".to_string(),
                        details: "custom step panicked".to_string(),
                    })
                }),
        }
    }
}
