//! `rover-runtime` – Command Arbitration for a Single Robot Body
//!
//! Serialises a stream of heterogeneous commands (batched actions, ad hoc
//! actions, speech clips, sensor interrupts) onto one robot that can run
//! only one motion program and one audio clip at a time.
//!
//! # Modules
//!
//! - [`controller`] – [`RobotController`][controller::RobotController]: the
//!   owned context wiring every component below to the drivers, with
//!   start/shutdown of the background loops.
//! - [`queue`] – [`CommandQueue`][queue::CommandQueue]: the pending FIFO and
//!   the dispatcher mode behind one lock, with flush and pre-emption.
//! - [`dispatcher`] – [`Dispatcher`][dispatcher::Dispatcher]: the single drain
//!   loop feeding the [`ActionExecutor`][rover_kernel::ActionExecutor].
//! - [`adhoc`] – [`AdHocPool`][adhoc::AdHocPool]: bounded, rate-limited pool
//!   for best-effort actions that bypass the queue.
//! - [`speech`] – [`SpeechArbiter`][speech::SpeechArbiter]: single-slot speech
//!   buffer and the playback lock.
//! - [`sensors`] – [`SensorInterruptRouter`][sensors::SensorInterruptRouter]
//!   and [`MotionDetector`][sensors::MotionDetector]: touch and lift/set-down
//!   interrupts.
//! - [`response`] – [`parse_response`][response::parse_response]: splits an AI
//!   reply into ordered action and speech parts.
//! - [`voice`] – [`VoiceCommands`][voice::VoiceCommands]: direct spoken
//!   commands.
//! - [`config`] – [`RuntimeConfig`][config::RuntimeConfig].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber with optional OTLP export.
//!
//! # Precedence
//!
//! Interrupts always beat queued-but-not-started items and never beat an
//! item already running.  Cancellation happens between items, never in the
//! middle of a motion or a clip.

pub mod adhoc;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod queue;
pub mod response;
pub mod sensors;
pub mod speech;
pub mod telemetry;
pub mod voice;

pub use adhoc::{AdHocPool, AdHocTask};
pub use config::{
    DispatchConfig, InterruptResponses, LedSetting, RuntimeConfig, SensorConfig, SpeechConfig,
};
pub use controller::{Drivers, QueueStatus, RobotController};
pub use dispatcher::Dispatcher;
pub use queue::{CommandQueue, QueueSnapshot};
pub use response::{ResponsePart, into_batch, parse_response};
pub use sensors::{MotionDetector, MotionEdge, SensorInterruptRouter};
pub use speech::SpeechArbiter;
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use voice::VoiceCommands;
