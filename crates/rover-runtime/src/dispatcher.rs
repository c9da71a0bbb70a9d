//! [`Dispatcher`] – the single drain loop between the queue and the executor.
//!
//! Exactly one dispatcher thread runs per robot.  Each tick pops at most one
//! item and runs it to completion, so items of a batch execute strictly in
//! order and never overlap.  The loop polls at a fixed interval when there
//! is nothing to do.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use rover_kernel::ActionExecutor;
use rover_types::RoverError;
use tracing::{debug, info};

use crate::queue::CommandQueue;

pub struct Dispatcher {
    queue: Arc<CommandQueue>,
    executor: Arc<ActionExecutor>,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<CommandQueue>,
        executor: Arc<ActionExecutor>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            executor,
            poll_interval,
        }
    }

    /// Run the next pending item, if any.  Returns `true` when an item ran.
    ///
    /// Executor errors have already been logged by the executor and are
    /// discarded here; only the outcome counter is updated.
    pub fn tick(&self) -> bool {
        let Some(name) = self.queue.next() else {
            return false;
        };
        let result = self.executor.run(&name);
        if let Err(e) = &result {
            debug!(action = %name, error = %e, "dropping failed item, continuing batch");
        }
        self.queue.finish(result.is_ok());
        true
    }

    /// Start the drain loop on a dedicated thread.  The loop exits once
    /// `shutdown` is set and the current item (if any) has finished.
    pub fn spawn(
        self: Arc<Self>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<JoinHandle<()>, RoverError> {
        std::thread::Builder::new()
            .name("rover-drain".to_string())
            .spawn(move || {
                info!("drain loop started");
                while !shutdown.load(Ordering::Acquire) {
                    if !self.tick() {
                        std::thread::sleep(self.poll_interval);
                    }
                }
                info!("drain loop stopped");
            })
            .map_err(|e| RoverError::Dispatch(format!("failed to spawn drain loop: {e}")))
    }
}
