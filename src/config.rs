//! startup configuration.

use {
    crate::{
        monitor::{BaselinePolicy, Settings},
        trigger::SysrqTrigger,
    },
    std::{
        fs, io,
        num::NonZeroUsize,
        path::{Path, PathBuf},
        time::Duration,
    },
    thiserror::Error,
};

/// everything needed to start monitoring. read-only once the monitor starts.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// cpu availability percentage at or below which the trigger fires.
    pub trigger_percent: i64,
    /// interval between polls.
    pub period: Duration,
    /// the sysrq command to send.
    pub payload: String,
    /// total cpu capacity, overriding the number of online cpus.
    pub cpus: Option<NonZeroUsize>,
    /// where the cgroup hierarchy is mounted.
    pub cgroup_root: PathBuf,
    /// the file the payload is written to.
    pub sysrq_file: PathBuf,
    /// what to do with a sample that no rate could be computed from.
    pub baseline: BaselinePolicy,
    /// reads of cpu accounting slower than this are rejected. defaults to the period.
    pub collect_deadline: Option<Duration>,
    /// redraw an availability meter on stdout after every poll.
    pub watch: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("polling period must be non-zero")]
    ZeroPeriod,
    #[error("collection deadline must be non-zero")]
    ZeroDeadline,
    #[error("sysrq command must not be empty")]
    EmptyPayload,
    #[error("failed to count cpus from {}: {source}", path.display())]
    Cpus {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid cpu list `{0}`")]
    CpuList(String),
}

// === impl Config ===

impl Config {
    pub const DEFAULT_TRIGGER_PERCENT: i64 = 10;
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(50);
    pub const DEFAULT_PAYLOAD: &str = "l";
    pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";

    /// lists every online logical cpu of the host, regardless of affinity or cgroup quotas.
    pub const ONLINE_CPUS: &str = "/sys/devices/system/cpu/online";

    /// checks that the configuration can be used to start monitoring.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }

        if self.collect_deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(ConfigError::ZeroDeadline);
        }

        if self.payload.is_empty() {
            return Err(ConfigError::EmptyPayload);
        }

        Ok(())
    }

    /// returns the total cpu capacity of the host, in whole cpus.
    ///
    /// this is discovered once, at startup. the root cgroup accounts for every cpu of the host,
    /// so a quota placed on this process must not shrink the count.
    pub fn cpus(&self) -> Result<usize, ConfigError> {
        match self.cpus {
            Some(cpus) => Ok(cpus.get()),
            None => online_cpus(Path::new(Self::ONLINE_CPUS)),
        }
    }

    pub fn collect_deadline(&self) -> Duration {
        self.collect_deadline.unwrap_or(self.period)
    }

    /// returns the monitor's settings, for a host with `cpus` cpus.
    pub fn settings(&self, cpus: usize) -> Settings {
        Settings {
            cpus,
            trigger_percent: self.trigger_percent,
            payload: self.payload.clone(),
            baseline: self.baseline,
        }
    }
}

/// counts the cpus in a sysfs cpu list file.
pub fn online_cpus(path: &Path) -> Result<usize, ConfigError> {
    let list = fs::read_to_string(path).map_err(|source| ConfigError::Cpus {
        path: path.to_owned(),
        source,
    })?;

    parse_cpu_list(&list)
}

/// counts the cpus in a list such as `0-3,8,10-11`.
pub fn parse_cpu_list(list: &str) -> Result<usize, ConfigError> {
    let invalid = || ConfigError::CpuList(list.trim().to_owned());

    let count_range = |range: &str| -> Option<usize> {
        let (first, last) = range.split_once('-').unwrap_or((range, range));
        let (first, last) = (first.parse::<usize>().ok()?, last.parse::<usize>().ok()?);
        last.checked_sub(first)?.checked_add(1)
    };

    list.trim()
        .split(',')
        .map(|range| count_range(range).ok_or_else(invalid))
        .sum::<Result<usize, _>>()
        .and_then(|cpus| if cpus == 0 { Err(invalid()) } else { Ok(cpus) })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trigger_percent: Self::DEFAULT_TRIGGER_PERCENT,
            period: Self::DEFAULT_PERIOD,
            payload: Self::DEFAULT_PAYLOAD.to_owned(),
            cpus: None,
            cgroup_root: PathBuf::from(Self::DEFAULT_CGROUP_ROOT),
            sysrq_file: PathBuf::from(SysrqTrigger::PATH),
            baseline: BaselinePolicy::default(),
            collect_deadline: None,
            watch: false,
        }
    }
}
