use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use poise::serenity_prelude::UserId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

const PRUNE_THRESHOLD: usize = 4096;

/// Process-wide record of when each user last earned XP.
#[derive(Debug)]
pub struct CooldownTracker {
    window: TimeDelta,
    last_award: Mutex<HashMap<UserId, DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            last_award: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_cooling_down(&self, user: UserId, now: DateTime<Utc>) -> bool {
        self.last_award
            .lock()
            .get(&user)
            .is_some_and(|last| now - *last < self.window)
    }

    /// Starts a new window for `user` at `now`.
    pub fn record(&self, user: UserId, now: DateTime<Utc>) {
        let mut last_award = self.last_award.lock();
        if last_award.len() >= PRUNE_THRESHOLD {
            let window = self.window;
            last_award.retain(|_, last| now - *last < window);
        }
        last_award.insert(user, now);
    }
}

/// Per-user async locks so one user's read-modify-write cycles never interleave.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            if locks.len() >= PRUNE_THRESHOLD {
                // Only the map holds an unused lock.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(user).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn first_message_is_never_cooling_down() {
        let tracker = CooldownTracker::new(Duration::from_secs(10));
        assert!(!tracker.is_cooling_down(UserId::new(1), at(0)));
    }

    #[test]
    fn window_runs_from_the_recorded_award() {
        let tracker = CooldownTracker::new(Duration::from_secs(10));
        let user = UserId::new(1);
        tracker.record(user, at(0));
        assert!(tracker.is_cooling_down(user, at(9)));
        assert!(!tracker.is_cooling_down(user, at(10)));
    }

    #[test]
    fn checking_does_not_start_a_window() {
        let tracker = CooldownTracker::new(Duration::from_secs(10));
        let user = UserId::new(1);
        assert!(!tracker.is_cooling_down(user, at(0)));
        assert!(!tracker.is_cooling_down(user, at(1)));
    }

    #[test]
    fn users_are_tracked_independently() {
        let tracker = CooldownTracker::new(Duration::from_secs(10));
        tracker.record(UserId::new(1), at(0));
        assert!(!tracker.is_cooling_down(UserId::new(2), at(1)));
    }

    #[test]
    fn zero_window_disables_cooldown() {
        let tracker = CooldownTracker::new(Duration::ZERO);
        let user = UserId::new(1);
        tracker.record(user, at(0));
        assert!(!tracker.is_cooling_down(user, at(0)));
    }

    #[tokio::test]
    async fn user_lock_serializes_same_user() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.lock(UserId::new(1)).await;

        let contended = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(UserId::new(1)).await;
            })
        };
        // Other users are unaffected.
        let _other = locks.lock(UserId::new(2)).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contended.is_finished());
        drop(guard);
        contended.await.unwrap();
    }
}
