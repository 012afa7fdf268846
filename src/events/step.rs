//! Step primitives for workflow functions.
//!
//! A step is a named async unit of work. Failed steps are retried with
//! exponential backoff; the final error is handed back to the function.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};

pub const MAX_ATTEMPTS: u32 = 4;
const BASE_BACKOFF: Duration = Duration::from_millis(250);

pub async fn run<T, E, F, Fut>(name: &str, mut step: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match step().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_ATTEMPTS => {
                let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                warn!(
                    "Step {} failed (attempt {}/{}), retrying in {:?}: {}",
                    name, attempt, MAX_ATTEMPTS, backoff, e
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Suspends until `at`. Instants in the past resolve immediately.
pub async fn sleep_until(name: &str, at: DateTime<Utc>) {
    let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    if !wait.is_zero() {
        info!("Step {} sleeping until {}", name, at);
    }
    tokio::time::sleep(wait).await;
}
