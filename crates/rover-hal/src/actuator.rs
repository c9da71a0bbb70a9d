//! Generic `Actuator` trait for the robot's motor bus and RGB strip.
//!
//! The robot has a single motor bus: motion commands are queued by the
//! driver and executed in order.  [`Actuator::wait_all_done`] is the "drain"
//! signal the executor uses to block until every queued motion program has
//! physically finished.

use rover_types::{HeadPose, LedMode, LegFrame, RoverError};

/// A body part that can be stopped independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPart {
    Body,
    Head,
    Tail,
}

/// The physical actuator driver of the robot.
///
/// Implementations are shared between the drain thread, the ad hoc worker
/// pool, and the sensor loops, so every method takes `&self` and the driver
/// is responsible for its own internal synchronisation.
pub trait Actuator: Send + Sync {
    /// Queue the named motion preset (e.g. `"sit"`, `"bark"`, `"wag_tail"`)
    /// at `speed` (0–100).
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::ActuatorFault`] if the preset cannot be queued.
    fn do_action(&self, preset: &str, speed: u8) -> Result<(), RoverError>;

    /// Queue a head trajectory.  `pitch_comp` is the posture-dependent pitch
    /// trim added to every frame; `immediately` discards any head frames still
    /// waiting in the driver's buffer.
    fn move_head(
        &self,
        frames: &[HeadPose],
        pitch_comp: f32,
        speed: u8,
        immediately: bool,
    ) -> Result<(), RoverError>;

    /// Queue a leg trajectory.
    fn move_legs(&self, frames: &[LegFrame], speed: u8) -> Result<(), RoverError>;

    /// Block until every queued motion program has physically completed.
    fn wait_all_done(&self) -> Result<(), RoverError>;

    /// Stop `part` and discard its queued motion.
    fn stop(&self, part: BodyPart) -> Result<(), RoverError>;

    /// Switch the RGB strip to `mode` using a `#rrggbb` colour.
    fn set_led(&self, mode: LedMode, color: &str) -> Result<(), RoverError>;
}
