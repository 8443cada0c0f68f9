use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::{runtime::Handle, sync::oneshot};

use gim_slo::{errors, Result};

/// One-shot completion handle of a store operation.
///
/// Resolves exactly once, to either the value or the error. If the worker
/// goes away without reporting, the handle resolves to an engine error.
pub struct StoreChannel<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> fmt::Debug for StoreChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreChannel").finish()
    }
}

impl<T: Send + 'static> StoreChannel<T> {
    /// Runs `work` on the runtime behind `handle`. The caller itself does
    /// not have to be on a runtime thread.
    pub fn spawn<F>(handle: &Handle, work: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        handle.spawn(async move {
            // the receiver may have been dropped; nothing is waiting then
            let _ = tx.send(work.await);
        });
        Self { rx }
    }
}

impl<T> StoreChannel<T> {
    /// An already completed handle.
    pub fn ready(result: Result<T>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Waits outside of an async context. Panics inside a runtime thread.
    pub fn blocking_recv(self) -> Result<T> {
        self.rx.blocking_recv().unwrap_or_else(|err| Err(errors::any(err)))
    }
}

impl<T> Future for StoreChannel<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(err)) => Poll::Ready(Err(errors::any(err))),
            Poll::Pending => Poll::Pending,
        }
    }
}
