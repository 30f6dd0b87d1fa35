use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time;

use crate::{config::RateLimitConfig, error::Error};

/// Bounds the number of executions in flight. Waiters give up after the
/// queue timeout instead of piling up behind a saturated runner.
#[derive(Debug, Clone)]
pub struct Admission {
    semaphore: Arc<Semaphore>,
    queue_timeout: Duration,
}

impl Admission {
    pub fn new(max_concurrent: usize, queue_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            queue_timeout,
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, Error> {
        match time::timeout(self.queue_timeout, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(Error::Overloaded),
            Err(_elapsed) => Err(Error::Overloaded),
        }
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Sliding-window limiter: at most `max_executions` admissions within any
/// `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max_executions: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_executions: config.max_executions,
            window: config.window,
            admitted: Mutex::new(VecDeque::with_capacity(config.max_executions)),
        }
    }

    /// Record an admission, or report how long until the oldest one in the
    /// window expires.
    pub async fn check(&self) -> Result<(), Error> {
        self.check_n(1).await
    }

    /// Record `n` admissions at once, all or nothing.
    pub async fn check_n(&self, n: usize) -> Result<(), Error> {
        self.check_n_at(n, Instant::now()).await
    }

    async fn check_n_at(&self, n: usize, now: Instant) -> Result<(), Error> {
        if n > self.max_executions {
            return Err(Error::Validation(format!(
                "request needs {} executions, the rate limit allows {} per {} ms",
                n,
                self.max_executions,
                self.window.as_millis()
            )));
        }

        let mut admitted = self.admitted.lock().await;
        while let Some(oldest) = admitted.front() {
            if now.duration_since(*oldest) >= self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }

        let excess = (admitted.len() + n).saturating_sub(self.max_executions);
        if excess > 0 {
            // There is room once the `excess` oldest admissions have expired
            let retry_after = admitted
                .get(excess - 1)
                .map(|t| self.window.saturating_sub(now.duration_since(*t)))
                .unwrap_or(self.window);
            return Err(Error::RateLimited { retry_after });
        }

        admitted.extend(std::iter::repeat(now).take(n));
        Ok(())
    }
}
