//! [`PostureController`] – the stand/sit/lie state machine.
//!
//! A transition is triggered only by [`PostureController::change_status`]:
//!
//! 1. The head pitch trim for the target posture is applied immediately.
//! 2. The body preset for `(current, target)` is queued.  Standing up from
//!    sitting or lying uses a faster rise; re-asserting a posture the body is
//!    already in still runs the light stabilising preset.
//! 3. The call blocks until the motor bus has drained.
//! 4. Only then is the new posture committed.
//!
//! If any driver call fails the committed posture is left untouched and the
//! error is returned to the caller.  Transitions are serialised: a second
//! caller waits until the first transition has fully completed.  Readers of
//! the committed posture never wait on a transition in progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rover_hal::Actuator;
use rover_types::{HeadPose, Posture, RoverError};
use tracing::{debug, info};

/// Head pitch trim while sitting.
pub const SIT_HEAD_PITCH: f32 = -35.0;
/// Head pitch trim while standing or lying.
pub const STAND_HEAD_PITCH: f32 = 0.0;
/// Speed used when applying a new head trim.
pub const HEAD_SPEED: u8 = 80;
/// Speed of ordinary posture presets.
pub const CHANGE_STATUS_SPEED: u8 = 60;
/// Speed of the stand-up motion from a sitting or lying body.
pub const RISE_SPEED: u8 = 75;

struct PostureState {
    current: Posture,
    head_pitch: f32,
}

/// Owns the robot's single current [`Posture`].
pub struct PostureController {
    actuator: Arc<dyn Actuator>,
    /// Held for the whole physical transition.
    transition: Mutex<()>,
    state: Mutex<PostureState>,
    transitions: AtomicUsize,
}

impl PostureController {
    /// Create a controller that believes the body starts in `initial`.
    pub fn new(actuator: Arc<dyn Actuator>, initial: Posture) -> Self {
        Self {
            actuator,
            transition: Mutex::new(()),
            state: Mutex::new(PostureState {
                current: initial,
                head_pitch: head_pitch_for(initial),
            }),
            transitions: AtomicUsize::new(0),
        }
    }

    /// The last committed posture.
    pub fn current(&self) -> Posture {
        self.state.lock().current
    }

    /// Head pitch trim of the last committed posture.
    pub fn head_pitch(&self) -> f32 {
        self.state.lock().head_pitch
    }

    /// Number of transitions that completed successfully, re-asserts
    /// included.
    pub fn transition_count(&self) -> usize {
        self.transitions.load(Ordering::Acquire)
    }

    /// Move the body into `target` and block until the motion has drained.
    ///
    /// # Errors
    ///
    /// Propagates the first [`RoverError`] returned by the actuator.  The
    /// committed posture is unchanged in that case.
    pub fn change_status(&self, target: Posture) -> Result<(), RoverError> {
        let _transition = self.transition.lock();
        let from = self.current();
        let pitch = head_pitch_for(target);

        self.actuator
            .move_head(&[HeadPose::level()], pitch, HEAD_SPEED, true)?;

        match (from, target) {
            (Posture::Sit | Posture::Lie, Posture::Stand) => {
                self.actuator.do_action(target.preset(), RISE_SPEED)?;
            }
            _ => {
                if from == target {
                    debug!(posture = %target, "re-asserting current posture");
                }
                self.actuator.do_action(target.preset(), CHANGE_STATUS_SPEED)?;
            }
        }
        self.actuator.wait_all_done()?;

        {
            let mut state = self.state.lock();
            state.current = target;
            state.head_pitch = pitch;
        }
        self.transitions.fetch_add(1, Ordering::AcqRel);
        info!(from = %from, to = %target, "posture changed");
        Ok(())
    }
}

fn head_pitch_for(posture: Posture) -> f32 {
    match posture {
        Posture::Sit => SIT_HEAD_PITCH,
        Posture::Stand | Posture::Lie => STAND_HEAD_PITCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_hal::{HalCall, SimDog};

    fn controller(initial: Posture) -> (Arc<SimDog>, PostureController) {
        let dog = Arc::new(SimDog::new());
        let pc = PostureController::new(dog.clone(), initial);
        (dog, pc)
    }

    #[test]
    fn starts_in_initial_posture() {
        let (_, pc) = controller(Posture::Lie);
        assert_eq!(pc.current(), Posture::Lie);
        assert_eq!(pc.transition_count(), 0);
    }

    #[test]
    fn sit_applies_trim_then_drains() {
        let (dog, pc) = controller(Posture::Lie);
        pc.change_status(Posture::Sit).unwrap();

        assert_eq!(pc.current(), Posture::Sit);
        assert!((pc.head_pitch() - SIT_HEAD_PITCH).abs() < f32::EPSILON);
        assert_eq!(
            dog.calls(),
            vec![
                HalCall::Head {
                    frames: 1,
                    pitch_comp: SIT_HEAD_PITCH,
                    speed: HEAD_SPEED,
                    immediately: true
                },
                HalCall::Action {
                    preset: "sit".to_string(),
                    speed: CHANGE_STATUS_SPEED
                },
                HalCall::WaitAllDone,
            ]
        );
    }

    #[test]
    fn standing_up_uses_rise_speed() {
        let (dog, pc) = controller(Posture::Sit);
        pc.change_status(Posture::Stand).unwrap();
        assert!(dog.calls().contains(&HalCall::Action {
            preset: "stand".to_string(),
            speed: RISE_SPEED
        }));
    }

    #[test]
    fn reasserting_stand_runs_stabilising_preset() {
        let (dog, pc) = controller(Posture::Stand);
        pc.change_status(Posture::Stand).unwrap();
        assert!(dog.calls().contains(&HalCall::Action {
            preset: "stand".to_string(),
            speed: CHANGE_STATUS_SPEED
        }));
        assert_eq!(pc.current(), Posture::Stand);
        assert_eq!(pc.transition_count(), 1);
    }

    #[test]
    fn fault_leaves_posture_at_last_committed_value() {
        let (dog, pc) = controller(Posture::Sit);
        dog.fail_preset("lie");

        let result = pc.change_status(Posture::Lie);
        assert!(matches!(result, Err(RoverError::ActuatorFault { .. })));
        assert_eq!(pc.current(), Posture::Sit);
        assert!((pc.head_pitch() - SIT_HEAD_PITCH).abs() < f32::EPSILON);
        assert_eq!(pc.transition_count(), 0);
        // The drain never ran.
        assert!(!dog.calls().contains(&HalCall::WaitAllDone));
    }
}
