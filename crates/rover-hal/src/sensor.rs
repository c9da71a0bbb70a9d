//! Generic `Sensors` trait for the touch pad and the accelerometer.

use rover_types::{RoverError, TouchState};

/// Polled sensor inputs.
pub trait Sensors: Send + Sync {
    /// Read the dual touch pad.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::SensorFault`] on a bus or decode error.
    fn read_touch(&self) -> Result<TouchState, RoverError>;

    /// Read the raw value of the accelerometer axis used for lift detection.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::SensorFault`] on a bus error.
    fn read_accel_axis(&self) -> Result<i32, RoverError>;
}
