//! Deadline-bounded execution
//!
//! A [`Deadline`] is an absolute instant. Children derived with
//! [`Deadline::child`] never outlive their parent. Cancellation from the
//! caller side (client disconnect) needs no signal: dropping the future
//! that awaits [`Deadline::run`] drops the wrapped operation with it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// The operation did not finish before its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline exceeded after {budget:?}")]
pub struct DeadlineExceeded {
    pub budget: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Derive a deadline capped at `cap` from now but no later than `self`.
    pub fn child(&self, cap: Duration) -> Self {
        let capped = Instant::now() + cap;
        if capped <= self.at {
            Self { at: capped, budget: cap }
        } else {
            Self {
                at: self.at,
                budget: self.remaining(),
            }
        }
    }

    /// Derive from an optional parent; without one the cap alone applies.
    pub fn within(parent: Option<Deadline>, cap: Duration) -> Self {
        match parent {
            Some(parent) => parent.child(cap),
            None => Self::after(cap),
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Budget this deadline was created with
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Drive `fut` until it completes or the deadline passes.
    ///
    /// On expiry the future is dropped before returning.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| DeadlineExceeded { budget: self.budget })
    }
}
