use std::{
    fmt::{self, Display},
    str::FromStr,
    time::Duration,
};

/// a cumulative count of cpu time, in nanoseconds.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Nanos(u64);

// === impl Nanos ===

impl Nanos {
    pub const ZERO: Self = Self(0);

    pub const fn new(nanos: u64) -> Self {
        Self(nanos)
    }

    /// converts a count of microseconds, as reported by cgroup v2's `cpu.stat`.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(1_000))
    }

    /// converts a duration, saturating at `u64::MAX` nanoseconds (roughly 584 years).
    pub fn from_duration(duration: Duration) -> Self {
        u64::try_from(duration.as_nanos())
            .map(Self)
            .unwrap_or(Self(u64::MAX))
    }

    pub const fn get(self) -> u64 {
        let Self(nanos) = self;
        nanos
    }

    /// returns `self - earlier`, or `None` if the counter went backwards.
    pub fn checked_sub(self, earlier: Self) -> Option<Self> {
        let (Self(lhs), Self(rhs)) = (self, earlier);
        lhs.checked_sub(rhs).map(Self)
    }
}

impl FromStr for Nanos {
    type Err = <u64 as FromStr>::Err;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl Display for Nanos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(nanos) = self;
        write!(f, "{nanos}ns")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_are_scaled() {
        assert_eq!(Nanos::from_micros(1_500), Nanos::new(1_500_000));
    }

    #[test]
    fn sub_second_durations_keep_precision() {
        let nanos = Nanos::from_duration(Duration::from_micros(49_999));
        assert_eq!(nanos.get(), 49_999_000);
    }

    #[test]
    fn huge_durations_saturate() {
        let nanos = Nanos::from_duration(Duration::MAX);
        assert_eq!(nanos.get(), u64::MAX);
    }

    #[test]
    fn checked_sub_refuses_to_go_backwards() {
        let (a, b) = (Nanos::new(10), Nanos::new(7));
        assert_eq!(a.checked_sub(b), Some(Nanos::new(3)));
        assert_eq!(b.checked_sub(a), None);
    }

    #[test]
    fn parses_kernel_counters() {
        assert_eq!("18446744073709551615".parse(), Ok(Nanos::new(u64::MAX)));
        assert!("-1".parse::<Nanos>().is_err());
    }
}
