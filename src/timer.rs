//! Cancellable one-shot timers on the tokio runtime.

use std::cell::RefCell;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs a callback once after a delay.
///
/// Scheduling again cancels the pending callback. Dropping the timer cancels it too.
#[derive(Default)]
pub struct OneShotTimer {
    handle: RefCell<Option<JoinHandle<()>>>,
}

impl OneShotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        if let Some(previous) = self.handle.replace(Some(handle)) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(handle) = self.handle.borrow_mut().take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.handle
            .borrow()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
