//! Bounded retry without backoff.
//!
//! [`RetryPolicy::run`] calls an operation up to `max_attempts` times,
//! stopping at the first success. Every failed attempt is logged; the
//! error of the last attempt is returned when all of them fail.

use std::fmt::Display;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// A policy that tries at most `max_attempts` times (at least once).
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
        }
    }

    /// First attempt plus one immediate retry.
    pub const fn retry_once() -> Self {
        Self::new(2)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op`, passing it the 1-based attempt number.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts => {
                    warn!(
                        "{} failed (attempt {}/{}), retrying: {}",
                        what, attempt, self.max_attempts, err
                    );
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        "{} failed (attempt {}/{}), giving up: {}",
                        what, attempt, self.max_attempts, err
                    );
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::retry_once()
    }
}
