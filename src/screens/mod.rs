//! Screen-level state with optimistic updates around single network calls.

pub mod discover;
pub mod matches;
pub mod messages;
pub mod onboarding;
pub mod photos;
pub mod setup;

use std::cell::Cell;

use crate::error::{ClientError, ClientResult};

/// Marks a control busy until dropped. A second action while one is
/// pending is rejected instead of queued.
pub(crate) struct Busy<'a>(&'a Cell<bool>);

impl<'a> Busy<'a> {
    pub(crate) fn acquire(flag: &'a Cell<bool>, op: &str) -> ClientResult<Self> {
        if flag.replace(true) {
            return Err(ClientError::invalid_input("Another action is still in progress").in_op(op));
        }
        Ok(Self(flag))
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
