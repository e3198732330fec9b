use chrono::{DateTime, Utc};
use serde::Serialize;

/// A state machine advanced by one-second ticks.
pub trait Ticking {
    /// Apply one elapsed second.
    fn tick(&mut self);
    /// Whether further ticks can still change state.
    fn is_ticking(&self) -> bool;
}

/// Whole-second countdown. Never goes below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    total: u32,
    remaining: u32,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self {
            total: seconds,
            remaining: seconds,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_elapsed(&self) -> bool {
        self.remaining == 0
    }

    /// Completed share in percent, 100 once elapsed.
    pub fn progress(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let done = u64::from(self.total - self.remaining) * 100 / u64::from(self.total);
        done as u8
    }
}

impl Ticking for Countdown {
    fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    fn is_ticking(&self) -> bool {
        !self.is_elapsed()
    }
}

/// Binds a [`Ticking`] machine to wall-clock time.
///
/// Tick `k` is due at `anchor + k` seconds, where the anchor is the moment the
/// machine started ticking. Progress is recomputed from the clock on every
/// observation, so nothing depends on a timer actually firing.
#[derive(Debug, Clone)]
pub struct Paced<T> {
    inner: T,
    anchor: Option<DateTime<Utc>>,
    applied: i64,
}

impl<T: Ticking> Paced<T> {
    pub fn start(inner: T, now: DateTime<Utc>) -> Self {
        let anchor = inner.is_ticking().then_some(now);
        Self {
            inner,
            anchor,
            applied: 0,
        }
    }

    /// Apply every tick due by `now`.
    pub fn advance_to(&mut self, now: DateTime<Utc>) -> &T {
        let Some(anchor) = self.anchor else {
            return &self.inner;
        };
        let due = (now - anchor).num_seconds().max(0);
        while self.applied < due && self.inner.is_ticking() {
            self.inner.tick();
            self.applied += 1;
        }
        if !self.inner.is_ticking() {
            self.anchor = None;
        }
        &self.inner
    }

    /// Run an event against the machine at `now`. If the event starts the
    /// machine ticking, the anchor is set to `now`.
    pub fn update<R>(&mut self, now: DateTime<Utc>, event: impl FnOnce(&mut T) -> R) -> R {
        self.advance_to(now);
        let was_ticking = self.inner.is_ticking();
        let result = event(&mut self.inner);
        if !was_ticking && self.inner.is_ticking() {
            self.anchor = Some(now);
            self.applied = 0;
        }
        result
    }

    pub fn get(&self) -> &T {
        &self.inner
    }

    /// Instant of the next due tick, if any.
    pub fn next_tick_at(&self) -> Option<DateTime<Utc>> {
        self.anchor
            .map(|anchor| anchor + chrono::TimeDelta::seconds(self.applied + 1))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn countdown_saturates_at_zero() {
        let mut countdown = Countdown::new(2);
        countdown.tick();
        countdown.tick();
        countdown.tick();

        assert_eq!(countdown.remaining(), 0);
        assert!(countdown.is_elapsed());
        assert_eq!(countdown.progress(), 100);
    }

    #[test]
    fn zero_second_countdown_is_already_elapsed() {
        let countdown = Countdown::new(0);
        assert!(countdown.is_elapsed());
        assert!(!countdown.is_ticking());
    }

    #[test]
    fn paced_applies_only_whole_elapsed_seconds() {
        let start = Utc::now();
        let mut paced = Paced::start(Countdown::new(5), start);

        assert_eq!(paced.advance_to(start + TimeDelta::milliseconds(999)).remaining(), 5);
        assert_eq!(paced.advance_to(start + TimeDelta::seconds(2)).remaining(), 3);
        assert_eq!(paced.next_tick_at(), Some(start + TimeDelta::seconds(3)));
        assert_eq!(paced.advance_to(start + TimeDelta::seconds(60)).remaining(), 0);
        assert_eq!(paced.next_tick_at(), None);
    }

    #[test]
    fn paced_ignores_clock_going_backwards() {
        let start = Utc::now();
        let mut paced = Paced::start(Countdown::new(5), start);

        paced.advance_to(start + TimeDelta::seconds(2));
        assert_eq!(paced.advance_to(start - TimeDelta::seconds(10)).remaining(), 3);
    }
}
