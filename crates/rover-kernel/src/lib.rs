//! `rover-kernel` – Action Execution Core
//!
//! Turns an action *name* into physical motion on a robot that can only run
//! one motion program at a time.
//!
//! # Modules
//!
//! - [`catalog`] – [`ActionCatalog`][catalog::ActionCatalog]: the immutable
//!   table mapping action names to [`ActionDescriptor`][catalog::ActionDescriptor]s
//!   (a [`Step`][catalog::Step], an optional posture requirement, and optional
//!   before/after chains).
//! - [`posture`] – [`PostureController`][posture::PostureController]: the
//!   stand/sit/lie state machine and its physical transitions.
//! - [`executor`] – [`ActionExecutor`][executor::ActionExecutor]: runs one
//!   action to completion, applying the posture gate and chaining, and
//!   blocking until every phase has physically drained.

pub mod catalog;
pub mod executor;
pub mod posture;

pub use catalog::{ActionCatalog, ActionDescriptor, CatalogBuilder, Chain, Step, normalize_name};
pub use executor::ActionExecutor;
pub use posture::PostureController;
