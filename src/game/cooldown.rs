//! Per-user cooldown tracking.
//!
//! Records live in a process-local Moka cache whose TTL equals the
//! cooldown, so they disappear once they can no longer block anything.
//! Being process-local, two bot processes do not see each other's records
//! and a restart clears them; the daily claim therefore keeps its
//! timestamp in the inventory record instead and only reuses
//! [`remaining`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::ops::compute::Op;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};

/// Time left before an action last taken at `last` may run again.
///
/// `None` once `now - last >= window`. A `last` in the future counts as
/// "just now".
pub fn remaining(last: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> Option<Duration> {
    let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
    if elapsed >= window {
        None
    } else {
        Some(window - elapsed)
    }
}

/// Cooldown gate for one command.
#[derive(Clone, Debug)]
pub struct CooldownTracker {
    window: Duration,
    last_used: TypedCache<u64, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new(name: &str, window: Duration, cache: &CacheRegistry) -> Self {
        Self {
            window,
            last_used: cache.get_or_create(name, CacheConfig::cooldown(window)),
        }
    }

    /// Remaining cooldown for `user_id`, or `None` if the action is allowed.
    pub fn check(&self, user_id: u64, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_used.get(&user_id)?;
        remaining(last, now, self.window)
    }

    /// Check and record in one step.
    ///
    /// Starts the cooldown at `now` and returns `Ok`, or returns the time
    /// left if it is still running. Of two concurrent callers for one user
    /// only one gets `Ok`.
    pub fn try_acquire(&self, user_id: u64, now: DateTime<Utc>) -> Result<(), Duration> {
        let window = self.window;
        let mut blocked = None;
        self.last_used.compute(user_id, |last| {
            match last.and_then(|last| remaining(last, now, window)) {
                Some(left) => {
                    blocked = Some(left);
                    Op::Nop
                }
                None => Op::Put(now),
            }
        });
        match blocked {
            Some(left) => Err(left),
            None => Ok(()),
        }
    }

    /// Give back a cooldown taken at `acquired_at` for an action that did
    /// not happen. A newer record is left alone.
    pub fn release(&self, user_id: u64, acquired_at: DateTime<Utc>) {
        self.last_used.compute(user_id, |last| match last {
            Some(last) if last == acquired_at => Op::Remove,
            _ => Op::Nop,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn tracker(window_secs: u64) -> CooldownTracker {
        CooldownTracker::new("test", Duration::from_secs(window_secs), &CacheRegistry::new())
    }

    #[test]
    fn test_first_action_allowed() {
        let t = tracker(60);
        assert!(t.check(1, Utc::now()).is_none());
    }

    #[test]
    fn test_remaining_is_window_minus_elapsed() {
        let t = tracker(1800);
        let t0 = Utc::now();
        t.try_acquire(1, t0).unwrap();

        let t1 = t0 + ChronoDuration::seconds(600);
        assert_eq!(t.check(1, t1), Some(Duration::from_secs(1200)));
    }

    #[test]
    fn test_elapsed_exactly_at_window() {
        let t = tracker(60);
        let t0 = Utc::now();
        t.try_acquire(1, t0).unwrap();

        assert!(t.check(1, t0 + ChronoDuration::seconds(60)).is_none());
        assert_eq!(
            t.check(1, t0 + ChronoDuration::seconds(59)),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_users_are_independent() {
        let t = tracker(60);
        let now = Utc::now();
        t.try_acquire(1, now).unwrap();
        assert!(t.check(2, now).is_none());
    }

    #[test]
    fn test_acquire_blocks_until_window_passes() {
        let t = tracker(60);
        let t0 = Utc::now();

        assert!(t.try_acquire(1, t0).is_ok());
        assert_eq!(
            t.try_acquire(1, t0 + ChronoDuration::seconds(20)),
            Err(Duration::from_secs(40))
        );
        // The refused attempt did not restart the window.
        assert!(t.try_acquire(1, t0 + ChronoDuration::seconds(60)).is_ok());
    }

    #[test]
    fn test_release_reopens_only_own_record() {
        let t = tracker(60);
        let t0 = Utc::now();

        t.try_acquire(1, t0).unwrap();
        t.release(1, t0);
        assert!(t.check(1, t0).is_none());

        let t1 = t0 + ChronoDuration::seconds(90);
        t.try_acquire(1, t1).unwrap();
        t.release(1, t0);
        assert!(t.check(1, t1).is_some());
    }

    #[test]
    fn test_concurrent_acquire_admits_one() {
        let t = tracker(60);
        let now = Utc::now();

        let admitted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| t.try_acquire(1, now).is_ok()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap() as usize).sum()
        });
        assert_eq!(admitted, 1);
    }

    #[test]
    fn test_clock_going_backwards_counts_as_just_used() {
        let now = Utc::now();
        let last = now + ChronoDuration::seconds(5);
        assert_eq!(remaining(last, now, Duration::from_secs(30)), Some(Duration::from_secs(30)));
    }
}
