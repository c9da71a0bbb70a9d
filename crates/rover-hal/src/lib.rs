//! `rover-hal` – Hardware Abstraction Layer
//!
//! The control core never talks to the vendor robot SDK directly.  It only
//! calls the collaborator traits defined here, so a physical driver, a
//! network proxy, or the in-process simulator can be swapped in freely.
//!
//! # Modules
//!
//! - [`actuator`] – [`Actuator`][actuator::Actuator]: motion presets, head and
//!   leg trajectories, the "drain" signal, stop commands, and the RGB strip.
//! - [`audio`] – [`AudioOutput`][audio::AudioOutput]: blocking clip playback.
//! - [`sensor`] – [`Sensors`][sensor::Sensors]: touch pad and accelerometer.
//! - [`sim`] – [`SimDog`][sim::SimDog]: a recording simulator implementing all
//!   three traits, used by tests and the CLI.

pub mod actuator;
pub mod audio;
pub mod sensor;
pub mod sim;

pub use actuator::{Actuator, BodyPart};
pub use audio::AudioOutput;
pub use sensor::Sensors;
pub use sim::{HalCall, HoldGate, SimDog};
