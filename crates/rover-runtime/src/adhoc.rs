//! [`AdHocPool`] – bounded worker pool for best-effort single actions.
//!
//! Ad hoc actions (proxy or AI triggered) bypass the drain loop and run on
//! the blocking pool of a private Tokio runtime, capped at `workers`
//! concurrent actions.  They may overlap with the batch being drained.
//!
//! An optional `governor` rate limiter rejects submissions that arrive
//! closer together than the configured minimum interval.

use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use parking_lot::Mutex;
use rover_kernel::ActionExecutor;
use rover_types::RoverError;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Grace period given to running ad hoc actions on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Handle to one submitted ad hoc action.
pub struct AdHocTask {
    name: String,
    handle: Handle,
    join: JoinHandle<Result<(), RoverError>>,
}

impl AdHocTask {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Block until the action has ended and return its outcome.
    ///
    /// Must not be called from inside an async context.
    pub fn wait(self) -> Result<(), RoverError> {
        self.handle.block_on(self.join).map_err(|e| {
            RoverError::Dispatch(format!("ad hoc action '{}' did not complete: {e}", self.name))
        })?
    }
}

pub struct AdHocPool {
    executor: Arc<ActionExecutor>,
    runtime: Mutex<Option<Runtime>>,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl AdHocPool {
    /// Build a pool running at most `workers` actions at once.
    ///
    /// When `min_interval` is `Some`, submissions spaced closer than that are
    /// rejected with [`RoverError::RateLimited`].
    pub fn new(
        executor: Arc<ActionExecutor>,
        workers: usize,
        min_interval: Option<Duration>,
    ) -> Result<Self, RoverError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers.max(1))
            .thread_name("rover-adhoc")
            .enable_all()
            .build()
            .map_err(|e| RoverError::Dispatch(format!("failed to create ad hoc runtime: {e}")))?;

        let limiter = min_interval
            .and_then(Quota::with_period)
            .map(RateLimiter::direct);

        Ok(Self {
            executor,
            runtime: Mutex::new(Some(runtime)),
            limiter,
        })
    }

    /// Start `name` on a pool worker and return immediately.
    ///
    /// # Errors
    ///
    /// - [`RoverError::RateLimited`] – the previous submission was too recent.
    /// - [`RoverError::Dispatch`] – the pool has been shut down.
    pub fn submit(&self, name: &str) -> Result<AdHocTask, RoverError> {
        if let Some(limiter) = &self.limiter
            && limiter.check().is_err()
        {
            warn!(action = %name, "ad hoc action rejected by rate limiter");
            return Err(RoverError::RateLimited(name.to_string()));
        }

        let runtime = self.runtime.lock();
        let Some(runtime) = runtime.as_ref() else {
            return Err(RoverError::Dispatch("ad hoc pool is shut down".to_string()));
        };

        debug!(action = %name, "ad hoc action submitted");
        let executor = self.executor.clone();
        let owned = name.to_string();
        let join = runtime.spawn_blocking(move || executor.run(&owned));
        Ok(AdHocTask {
            name: name.to_string(),
            handle: runtime.handle().clone(),
            join,
        })
    }

    /// Stop accepting work and give running actions a short grace period.
    /// Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
            info!("ad hoc pool stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_hal::SimDog;
    use rover_kernel::{ActionCatalog, PostureController};
    use rover_types::Posture;

    fn pool(min_interval: Option<Duration>) -> (Arc<SimDog>, AdHocPool) {
        let dog = Arc::new(SimDog::new());
        let posture = Arc::new(PostureController::new(dog.clone(), Posture::Sit));
        let executor = Arc::new(ActionExecutor::new(
            Arc::new(ActionCatalog::standard().unwrap()),
            posture,
            dog.clone(),
        ));
        (dog, AdHocPool::new(executor, 2, min_interval).unwrap())
    }

    #[test]
    fn submitted_action_runs_and_reports() {
        let (dog, pool) = pool(None);
        let task = pool.submit("bark").unwrap();
        assert_eq!(task.name(), "bark");
        task.wait().unwrap();
        assert_eq!(dog.presets(), vec!["bark"]);
    }

    #[test]
    fn unknown_action_result_is_returned_to_waiter() {
        let (_, pool) = pool(None);
        let result = pool.submit("notarealaction").unwrap().wait();
        assert!(matches!(result, Err(RoverError::UnknownAction(_))));
    }

    #[test]
    fn rapid_submissions_are_throttled() {
        let (_, pool) = pool(Some(Duration::from_secs(60)));
        pool.submit("bark").unwrap().wait().unwrap();
        assert!(matches!(pool.submit("bark"), Err(RoverError::RateLimited(_))));
    }

    #[test]
    fn actions_overlap_up_to_worker_count() {
        let (dog, pool) = pool(None);
        let gate = dog.hold_preset("bark");
        let first = pool.submit("bark").unwrap();
        assert!(gate.wait_reached(Duration::from_secs(2)));

        // The first worker is parked mid-motion; the second still runs.
        pool.submit("wag_tail").unwrap().wait().unwrap();
        assert!(dog.presets().contains(&"wag_tail".to_string()));

        gate.release();
        first.wait().unwrap();
    }

    #[test]
    fn submit_after_shutdown_fails() {
        let (_, pool) = pool(None);
        pool.shutdown();
        pool.shutdown();
        assert!(matches!(pool.submit("bark"), Err(RoverError::Dispatch(_))));
    }
}
