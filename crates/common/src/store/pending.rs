use std::future::Future;
use tokio::task::JoinHandle;

use crate::errors::{AppError, Result};

/// A value whose write to the store is still in flight.
///
/// The value is usable immediately. `wait` resolves once the write has
/// landed; `detach` lets it finish in the background and logs a failure.
#[must_use = "call wait() or detach() to decide how the write completes"]
pub struct PendingWrite<T> {
    value: T,
    handle: JoinHandle<Result<()>>,
}

impl<T> PendingWrite<T> {
    pub fn spawn<F>(value: T, write: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            value,
            handle: tokio::spawn(write),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<T> {
        match self.handle.await {
            Ok(Ok(())) => Ok(self.value),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(AppError::Internal {
                message: format!("Store write task failed: {join_err}"),
            }),
        }
    }

    pub fn detach(self) -> T {
        let handle = self.handle;
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::error!(error = %err, "Background store write failed"),
                Err(join_err) => tracing::error!(error = %join_err, "Background store write panicked"),
            }
        });
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PendingWrite<U> {
        PendingWrite {
            value: f(self.value),
            handle: self.handle,
        }
    }
}
