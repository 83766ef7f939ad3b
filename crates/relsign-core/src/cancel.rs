//! Deadline and cancellation signal threaded through every phase.
//!
//! Checked before each archive entry is processed, so a large archive stops
//! promptly rather than at the next archive boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{CancelReason, Result, SignError};

/// A cloneable cancellation handle with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    deadline: Option<Instant>,
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// A signal that never fires unless [`cancel`](Self::cancel) is called.
    pub fn none() -> Self {
        Self::default()
    }

    /// A signal that fires `timeout` from now. A zero timeout means no deadline.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let deadline = timeout
            .filter(|t| !t.is_zero())
            .map(|t| Instant::now() + t);
        Self {
            deadline,
            flag: Arc::default(),
        }
    }

    /// Trip the signal. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Why the signal has fired, if it has.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.flag.load(Ordering::SeqCst) {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Return [`SignError::Cancelled`] if the signal has fired.
    ///
    /// # Errors
    ///
    /// Returns the cancellation reason as an error.
    pub fn check(&self) -> Result<()> {
        match self.reason() {
            Some(reason) => Err(SignError::Cancelled(reason)),
            None => Ok(()),
        }
    }

    /// Time left before the deadline, or `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_deadline_never_fires() {
        let c = Cancellation::with_timeout(Some(Duration::ZERO));
        assert!(c.check().is_ok());
        assert_eq!(c.remaining(), None);
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let c = Cancellation::none();
        let other = c.clone();
        other.cancel();
        assert_eq!(c.reason(), Some(CancelReason::Cancelled));
        assert!(c.check().unwrap_err().is_cancelled());
    }

    #[test]
    fn expired_deadline_reports_deadline() {
        let c = Cancellation::with_timeout(Some(Duration::from_nanos(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(c.reason(), Some(CancelReason::DeadlineExceeded));
        assert_eq!(c.remaining(), Some(Duration::ZERO));
    }
}
