use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::app::HoundError;

/// Wait between failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Fixed(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::None)
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, Backoff::Fixed(delay))
    }
}

/// Every attempt failed; `last` is the final error
#[derive(Debug)]
pub struct Exhausted {
    pub attempts: u32,
    pub last: HoundError,
}

impl From<Exhausted> for HoundError {
    fn from(exhausted: Exhausted) -> Self {
        exhausted.last
    }
}

/// Run `op` until it succeeds or the policy's attempts run out.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, Exhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, HoundError>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", what, attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt < policy.max_attempts => {
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    what, attempt, policy.max_attempts, e
                );
                if let Backoff::Fixed(delay) = policy.backoff {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => {
                return Err(Exhausted {
                    attempts: attempt,
                    last: e,
                })
            }
        }
    }
}
