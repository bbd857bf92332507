use std::time::Instant;

pub use self::nanos::Nanos;

mod nanos;

/// a snapshot of cumulative cpu usage at a moment in time.
///
/// samples are immutable once built; the monitor holds at most two of them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sample {
    /// when the counters were read.
    time: Instant,
    /// cumulative usage of each logical cpu, in cpu order.
    ///
    /// this is empty when the accounting subsystem has no per-cpu breakdown.
    per_cpu: Vec<Nanos>,
    /// cumulative usage of all cpus.
    total: Nanos,
}

// === impl Sample ===

impl Sample {
    pub fn new(time: Instant, per_cpu: Vec<Nanos>, total: Nanos) -> Self {
        Self {
            time,
            per_cpu,
            total,
        }
    }

    pub fn time(&self) -> Instant {
        self.time
    }

    pub fn per_cpu(&self) -> &[Nanos] {
        &self.per_cpu
    }

    pub fn total(&self) -> Nanos {
        self.total
    }

    /// the number of logical cpus this sample accounts for.
    pub fn cpus(&self) -> usize {
        self.per_cpu.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpus_are_counted_from_per_cpu_counters() {
        let per_cpu = [100, 250, 0, 650].map(Nanos::new).to_vec();
        let sample = Sample::new(Instant::now(), per_cpu, Nanos::new(1_000));
        assert_eq!(sample.cpus(), 4);
        assert_eq!(sample.per_cpu()[3], Nanos::new(650));
    }

    #[test]
    fn unified_samples_have_no_cpus() {
        let sample = Sample::new(Instant::now(), Vec::new(), Nanos::new(1_000));
        assert_eq!(sample.cpus(), 0);
        assert_eq!(sample.total(), Nanos::new(1_000));
    }
}
