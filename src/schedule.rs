//! Two independent periodic timers: one asks the board for data, the other
//! redraws the display. Missed ticks are skipped rather than replayed.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Due {
    pub request: bool,
    pub refresh: bool,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    every: Duration,
    next: Instant,
}

impl Timer {
    fn fire(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.every;
        if self.next <= now {
            self.next = now + self.every;
        }
        true
    }
}

pub struct Schedule {
    request: Option<Timer>,
    refresh: Timer,
}

impl Schedule {
    /// Both timers fire first at `start`. Pass `None` for `request_every`
    /// when the board pushes data on its own.
    pub fn new(request_every: Option<Duration>, refresh_every: Duration, start: Instant) -> Self {
        Self {
            request: request_every.map(|every| Timer { every, next: start }),
            refresh: Timer {
                every: refresh_every,
                next: start,
            },
        }
    }

    pub fn poll(&mut self, now: Instant) -> Due {
        Due {
            request: self.request.as_mut().map_or(false, |timer| timer.fire(now)),
            refresh: self.refresh.fire(now),
        }
    }

    /// Time left until either timer fires next.
    pub fn until_next(&self, now: Instant) -> Duration {
        let next = match &self.request {
            Some(request) => request.next.min(self.refresh.next),
            None => self.refresh.next,
        };
        next.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: Duration = Duration::from_millis(250);
    const REFRESH: Duration = Duration::from_millis(100);

    #[test]
    fn both_timers_fire_at_start() {
        let start = Instant::now();
        let mut schedule = Schedule::new(Some(REQUEST), REFRESH, start);
        assert_eq!(
            schedule.poll(start),
            Due {
                request: true,
                refresh: true
            }
        );
        assert_eq!(schedule.poll(start), Due::default());
    }

    #[test]
    fn rates_are_independent() {
        let start = Instant::now();
        let mut schedule = Schedule::new(Some(REQUEST), REFRESH, start);

        let mut requests = 0;
        let mut refreshes = 0;
        for step in 0..=10 {
            let due = schedule.poll(start + Duration::from_millis(step * 50));
            requests += due.request as u32;
            refreshes += due.refresh as u32;
        }

        // Over 500 ms: requests at 0, 250, 500; refreshes every 100 ms.
        assert_eq!(requests, 3);
        assert_eq!(refreshes, 6);
    }

    #[test]
    fn push_mode_never_requests() {
        let start = Instant::now();
        let mut schedule = Schedule::new(None, REFRESH, start);
        for step in 0..5 {
            assert!(!schedule.poll(start + REFRESH * step).request);
        }
    }

    #[test]
    fn missed_ticks_are_skipped() {
        let start = Instant::now();
        let mut schedule = Schedule::new(None, REFRESH, start);
        schedule.poll(start);

        let late = start + Duration::from_millis(1000);
        assert!(schedule.poll(late).refresh);
        assert!(!schedule.poll(late + Duration::from_millis(50)).refresh);
        assert!(schedule.poll(late + REFRESH).refresh);
    }

    #[test]
    fn until_next_picks_the_nearest_timer() {
        let start = Instant::now();
        let mut schedule = Schedule::new(Some(REQUEST), REFRESH, start);
        schedule.poll(start);
        assert_eq!(schedule.until_next(start), REFRESH);
        assert_eq!(schedule.until_next(start + Duration::from_secs(1)), Duration::ZERO);
    }
}
