//! periodic scheduling.
//!
//! a [`Ticker`] yields a [`Tick`] once per period. the caller runs each tick to completion
//! before asking for the next one, so ticks never interleave. if a tick overruns one or more
//! deadlines, those deadlines are skipped rather than fired in a burst.

use {
    crate::source::{Clock, SystemClock},
    std::{
        cell::RefCell,
        time::{Duration, Instant},
    },
    tracing::debug,
};

/// blocks the current thread.
pub trait Sleep {
    fn sleep(&self, duration: Duration);
}

#[derive(Default)]
pub struct ThreadSleep;

/// a mock sleeper, recording each requested duration without blocking.
#[derive(Default)]
#[allow(dead_code, reason = "this is a testing utility.")]
pub struct MockSleep {
    slept: RefCell<Vec<Duration>>,
}

/// yields a tick once per period.
pub struct Ticker<C = SystemClock, S = ThreadSleep> {
    clock: C,
    sleep: S,
    period: Duration,
    /// the deadline of the next tick, once the first has been scheduled.
    next: Option<Instant>,
}

/// one execution of the periodic task.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tick {
    /// the number of deadlines missed since the last tick.
    pub skipped: u32,
}

// === impl ThreadSleep ===

impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration)
    }
}

// === impl MockSleep ===

#[allow(dead_code, reason = "this is a testing utility.")]
impl MockSleep {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Sleep for MockSleep {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

impl<S: Sleep> Sleep for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

// === impl Ticker ===

impl Ticker {
    /// returns a ticker driven by the system clock.
    pub fn new(period: Duration) -> Self {
        Self::with(SystemClock, ThreadSleep, period)
    }
}

impl<C, S> Ticker<C, S> {
    /// returns a ticker driven by the given clock and sleeper.
    ///
    /// # panics
    ///
    /// panics if `period` is zero.
    pub fn with(clock: C, sleep: S, period: Duration) -> Self {
        assert!(!period.is_zero(), "ticker period must be non-zero");

        Self {
            clock,
            sleep,
            period,
            next: None,
        }
    }
}

impl<C, S> Iterator for Ticker<C, S>
where
    C: Clock,
    S: Sleep,
{
    type Item = Tick;

    /// waits for the next deadline.
    ///
    /// the first tick happens one period after the first call.
    fn next(&mut self) -> Option<Tick> {
        let Self {
            clock,
            sleep,
            period,
            next,
        } = self;

        let now = clock.now();
        let deadline = *next.get_or_insert(now + *period);

        let skipped = if now < deadline {
            sleep.sleep(deadline - now);
            0
        } else {
            let late = now - deadline;
            let missed = late.as_nanos() / period.as_nanos();
            u32::try_from(missed).unwrap_or(u32::MAX)
        };

        if skipped > 0 {
            debug!(skipped, ?period, "tick overran, skipping missed deadlines");
        }

        *next = Some(deadline + period.saturating_mul(skipped.saturating_add(1)));

        Some(Tick { skipped })
    }
}
