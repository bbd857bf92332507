use {
    super::*,
    std::time::{Duration, Instant},
};

/// returns a sample taken `offset` after `base`, with a `total` split evenly across `cpus`.
fn sample(base: Instant, offset: Duration, total: u64, cpus: usize) -> Sample {
    let share = total / cpus.max(1) as u64;
    let per_cpu = vec![Nanos::new(share); cpus];
    Sample::new(base + offset, per_cpu, Nanos::new(total))
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

mod compute_tests {
    use super::*;

    #[test]
    fn first_sample_is_zero() {
        let now = Instant::now();
        let rate = compute(None, &sample(now, ms(0), 123_456_789, 4)).unwrap();
        assert_eq!(rate, Rate::ZERO);
        assert_eq!(rate.as_f64(), 0.0);
    }

    #[test]
    fn rate_is_usage_over_elapsed_time() {
        let now = Instant::now();
        let cases = [
            (ms(100), 0, 390_000_000, 3.9),
            (ms(50), 1_000, 1_000, 0.0),
            (ms(1_000), 7_000_000_000, 9_000_000_000, 2.0),
            (ms(20), 0, 5_000_000, 0.25),
        ];

        for (elapsed, before, after, expected) in cases {
            let a = sample(now, ms(0), before, 4);
            let b = sample(now, elapsed, after, 4);
            let rate = compute(Some(&a), &b).unwrap();
            let exact = (after - before) as f64 / elapsed.as_nanos() as f64;
            assert_eq!(rate.as_f64(), exact);
            assert_eq!(rate.as_f64(), expected);
            assert!(rate.as_f64() >= 0.0);
        }
    }

    /// sub-second intervals must not be truncated to whole seconds.
    #[test]
    fn sub_second_intervals_keep_precision() {
        let now = Instant::now();
        let a = sample(now, ms(0), 0, 2);
        let b = sample(now, Duration::from_micros(50_500), 50_500_000, 2);
        let rate = compute(Some(&a), &b).unwrap();
        assert_eq!(rate.elapsed(), Nanos::new(50_500_000));
        assert_eq!(rate.as_f64(), 1.0);
    }

    #[test]
    fn same_inputs_same_rate() {
        let now = Instant::now();
        let a = sample(now, ms(0), 10_000, 8);
        let b = sample(now, ms(37), 29_000_000, 8);
        assert_eq!(compute(Some(&a), &b), compute(Some(&a), &b));
    }

    #[test]
    fn equal_timestamps_are_non_monotonic() {
        let now = Instant::now();
        let a = sample(now, ms(10), 0, 4);
        let b = sample(now, ms(10), 1_000, 4);
        assert_eq!(compute(Some(&a), &b), Err(RateError::NonMonotonicTime));
    }

    #[test]
    fn backwards_timestamps_are_non_monotonic() {
        let now = Instant::now();
        let a = sample(now, ms(100), 0, 4);
        let b = sample(now, ms(0), 1_000, 4);
        assert_eq!(compute(Some(&a), &b), Err(RateError::NonMonotonicTime));
    }

    #[test]
    fn cpu_hotplug_is_rejected() {
        let now = Instant::now();
        let a = sample(now, ms(0), 0, 4);
        let b = sample(now, ms(100), 1_000, 3);
        assert_eq!(
            compute(Some(&a), &b),
            Err(RateError::CpuCountMismatch {
                previous: 4,
                current: 3
            })
        );
    }

    #[test]
    fn interval_at_resolution_is_too_small() {
        let now = Instant::now();
        let a = sample(now, ms(0), 0, 4);
        let b = sample(now, MIN_INTERVAL, 1_000, 4);
        assert_eq!(
            compute(Some(&a), &b),
            Err(RateError::IntervalTooSmall {
                elapsed: MIN_INTERVAL
            })
        );
    }

    #[test]
    fn interval_below_resolution_is_too_small() {
        let now = Instant::now();
        let a = sample(now, ms(0), 0, 4);
        let b = sample(now, Duration::from_micros(400), 1_000, 4);
        assert!(matches!(
            compute(Some(&a), &b),
            Err(RateError::IntervalTooSmall { .. })
        ));
    }

    #[test]
    fn interval_just_above_resolution_is_accepted() {
        let now = Instant::now();
        let a = sample(now, ms(0), 0, 4);
        let b = sample(now, MIN_INTERVAL + Duration::from_nanos(1), 1_000, 4);
        assert!(compute(Some(&a), &b).is_ok());
    }

    #[test]
    fn decreasing_counters_are_rejected() {
        let now = Instant::now();
        let a = sample(now, ms(200), 550_000_000, 4);
        let b = sample(now, ms(250), 540_000_000, 4);
        assert_eq!(
            compute(Some(&a), &b),
            Err(RateError::CounterDecreased {
                previous: Nanos::new(550_000_000),
                current: Nanos::new(540_000_000),
            })
        );
    }

    /// samples without a per-cpu breakdown (cgroup v2) are compared by total alone.
    #[test]
    fn totals_without_per_cpu_counters() {
        let now = Instant::now();
        let a = Sample::new(now, Vec::new(), Nanos::new(0));
        let b = Sample::new(now + ms(100), Vec::new(), Nanos::new(50_000_000));
        assert_eq!(compute(Some(&a), &b).unwrap().as_f64(), 0.5);
    }
}

mod availability_tests {
    use super::*;

    #[test]
    fn first_sample_has_full_capacity() {
        assert_eq!(Rate::ZERO.availability(4), 400.0);
    }

    /// `(4.0 - 3.9) * 100.0` is not exactly 10 in floating point.
    #[test]
    fn availability_is_exact() {
        let now = Instant::now();
        let a = sample(now, ms(0), 0, 4);
        let b = sample(now, ms(100), 390_000_000, 4);
        let rate = compute(Some(&a), &b).unwrap();
        assert_eq!(rate.availability(4), 10.0);
    }

    #[test]
    fn oversubscription_is_negative() {
        let now = Instant::now();
        let a = sample(now, ms(0), 0, 2);
        let b = sample(now, ms(100), 250_000_000, 2);
        let rate = compute(Some(&a), &b).unwrap();
        assert_eq!(rate.availability(2), -50.0);
    }
}
