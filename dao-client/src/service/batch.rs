//! Fan-out / fan-in with per-task failure isolation.
//!
//! Every task is polled concurrently and bounded by the same timeout. A task
//! that fails or times out is reported in `failed` and never cancels its
//! siblings.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tracing::warn;

use crate::error::DaoError;

/// Outcome of a settled batch, in task submission order.
#[derive(Debug)]
pub struct Settled<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<(String, DaoError)>,
}

impl<T> Settled<T> {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Settled<U> {
        Settled {
            succeeded: self.succeeded.into_iter().map(f).collect(),
            failed: self.failed,
        }
    }
}

impl<T> Settled<Vec<T>> {
    pub fn flatten(self) -> Settled<T> {
        Settled {
            succeeded: self.succeeded.into_iter().flatten().collect(),
            failed: self.failed,
        }
    }
}

/// Bounds a single fallible task; expiry is reported as a fetch failure.
pub async fn with_timeout<T, F>(timeout: Duration, task: F) -> Result<T, DaoError>
where
    F: Future<Output = Result<T, DaoError>>,
{
    match tokio::time::timeout(timeout, task).await {
        Ok(result) => result,
        Err(_) => Err(DaoError::fetch(format!(
            "timed out after {} ms",
            timeout.as_millis()
        ))),
    }
}

/// Runs all labelled tasks concurrently and waits for every one to settle.
pub async fn settle_all<T, F>(tasks: Vec<(String, F)>, timeout: Duration) -> Settled<T>
where
    F: Future<Output = Result<T, DaoError>>,
{
    let bounded = tasks
        .into_iter()
        .map(|(label, task)| async move { (label, with_timeout(timeout, task).await) });

    let mut settled = Settled {
        succeeded: Vec::new(),
        failed: Vec::new(),
    };
    for (label, outcome) in join_all(bounded).await {
        match outcome {
            Ok(value) => settled.succeeded.push(value),
            Err(err) => {
                warn!(task = %label, error = %err, "Batch task dropped");
                settled.failed.push((label, err));
            }
        }
    }
    settled
}
