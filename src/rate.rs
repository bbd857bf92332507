//! instantaneous cpu utilization.
//!
//! a [`Rate`] is derived by differencing two cumulative [`Sample`]s over the wall time that
//! elapsed between them. it is dimensionless: nanoseconds of cpu time consumed per nanosecond
//! of wall time, so a fully busy 4-cpu host has a rate of 4.

use {
    crate::sample::{Nanos, Sample},
    std::time::Duration,
    thiserror::Error,
};

#[cfg(test)]
mod tests;

/// intervals at or below this resolution are too noisy to compute a rate over.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// cpu time consumed over an interval of wall time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Rate {
    /// cpu time consumed during the interval.
    used: Nanos,
    /// wall time elapsed during the interval.
    elapsed: Nanos,
}

/// a pair of samples that no rate can be computed from.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RateError {
    #[error("samples move backwards in time")]
    NonMonotonicTime,
    #[error("number of cpus changed from {previous} to {current}")]
    CpuCountMismatch { previous: usize, current: usize },
    #[error("time delta of {elapsed:?} is unexpectedly small")]
    IntervalTooSmall { elapsed: Duration },
    #[error("cumulative usage decreased from {previous} to {current}")]
    CounterDecreased { previous: Nanos, current: Nanos },
}

/// computes the rate of cpu usage between `previous` and `current`.
///
/// NB: when there is no previous sample this returns [`Rate::ZERO`]. that is a "cannot yet
/// estimate" sentinel, not a measurement of an idle host. the monitor reports it as
/// [`Outcome::Primed`][crate::Outcome::Primed] rather than as an observation.
pub fn compute(previous: Option<&Sample>, current: &Sample) -> Result<Rate, RateError> {
    let Some(previous) = previous else {
        return Ok(Rate::ZERO);
    };

    if current.time() <= previous.time() {
        return Err(RateError::NonMonotonicTime);
    }

    if current.cpus() != previous.cpus() {
        return Err(RateError::CpuCountMismatch {
            previous: previous.cpus(),
            current: current.cpus(),
        });
    }

    let elapsed = current.time().duration_since(previous.time());
    if elapsed <= MIN_INTERVAL {
        return Err(RateError::IntervalTooSmall { elapsed });
    }

    let used = current
        .total()
        .checked_sub(previous.total())
        .ok_or(RateError::CounterDecreased {
            previous: previous.total(),
            current: current.total(),
        })?;

    Ok(Rate {
        used,
        elapsed: Nanos::from_duration(elapsed),
    })
}

// === impl Rate ===

impl Rate {
    pub const ZERO: Self = Self {
        used: Nanos::ZERO,
        elapsed: Nanos::ZERO,
    };

    /// returns the number of cpus' worth of time consumed during the interval.
    pub fn as_f64(&self) -> f64 {
        let Self { used, elapsed } = *self;

        if elapsed == Nanos::ZERO {
            return 0.0;
        }

        used.get() as f64 / elapsed.get() as f64
    }

    /// returns the idle capacity of `cpus` cpus, in whole-cpu units scaled by 100.
    ///
    /// this is `(cpus - rate) * 100`, computed from the integer deltas so that the result is
    /// exact whenever it is representable. it is negative if more time was consumed than
    /// `cpus` cpus can provide.
    pub fn availability(&self, cpus: usize) -> f64 {
        let Self { used, elapsed } = *self;
        let capacity = cpus as f64 * 100.0;

        if elapsed == Nanos::ZERO {
            return capacity;
        }

        let (used, elapsed) = (i128::from(used.get()), i128::from(elapsed.get()));
        let idle = (cpus as i128)
            .saturating_mul(elapsed)
            .saturating_sub(used)
            .saturating_mul(100);

        idle as f64 / elapsed as f64
    }

    pub fn used(&self) -> Nanos {
        self.used
    }

    pub fn elapsed(&self) -> Nanos {
        self.elapsed
    }
}
