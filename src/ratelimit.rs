use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::{
    error::{Error, Result},
    model::mongodb::Id,
};

/// A sliding-window rate limiter for vote attempts, keyed by user.
///
/// Every attempt counts against the limit, successful or not, matching a
/// front-of-route limiter. State is in-process only; limits reset on
/// restart, which is acceptable for an abuse brake.
pub struct VoteLimiter {
    attempts: Mutex<HashMap<Id, VecDeque<Instant>>>,
}

impl VoteLimiter {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt by the given user, failing with
    /// `TooManyRequests` if they have exhausted the window.
    pub fn check(&self, user: Id, window: Duration, limit: usize) -> Result<()> {
        let mut attempts = self.attempts.lock().unwrap();
        let now = Instant::now();

        // Sweep expired attempts for everyone and evict users with none
        // left, so the map doesn't grow with every voter the process has
        // ever seen.
        attempts.retain(|_, entry| {
            while entry
                .front()
                .map_or(false, |earliest| now.duration_since(*earliest) >= window)
            {
                entry.pop_front();
            }
            !entry.is_empty()
        });

        let entry = attempts.entry(user).or_default();
        if entry.len() >= limit {
            return Err(Error::TooManyRequests(
                "Too many vote attempts. Please try again later.".to_string(),
            ));
        }
        entry.push_back(now);
        Ok(())
    }
}

impl Default for VoteLimiter {
    fn default() -> Self {
        Self::new()
    }
}
