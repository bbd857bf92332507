//! command-line flags.

use {
    crate::{config::Config, monitor::BaselinePolicy, trigger::SysrqTrigger},
    clap::{ArgAction, Parser},
    std::{num::NonZeroUsize, path::PathBuf, time::Duration},
};

/// triggers a sysrq when the host runs out of cpu.
#[derive(Debug, Parser)]
#[command(name = "cpu-sysrq", version, about)]
pub struct Args {
    /// sysrq command to send.
    #[arg(long, default_value = Config::DEFAULT_PAYLOAD)]
    pub sysrq: String,

    /// cpu availability percentage at or below which to trigger sysrq.
    #[arg(
        long,
        default_value_t = Config::DEFAULT_TRIGGER_PERCENT,
        allow_negative_numbers = true
    )]
    pub trigger_percent: i64,

    /// cpu usage monitoring period, e.g. `50ms` or `1s`.
    #[arg(long, default_value = "50ms", value_parser = parse_duration)]
    pub period: Duration,

    /// total number of cpus. defaults to the number of online cpus.
    #[arg(long)]
    pub cpus: Option<NonZeroUsize>,

    /// where the cgroup hierarchy is mounted.
    #[arg(long, default_value = Config::DEFAULT_CGROUP_ROOT)]
    pub cgroup_root: PathBuf,

    /// the file sysrq commands are written to.
    #[arg(long, default_value = SysrqTrigger::PATH)]
    pub sysrq_file: PathBuf,

    /// whether a sample that no rate could be computed from replaces the baseline.
    #[arg(long = "on-rate-error", default_value_t = BaselinePolicy::Retain)]
    pub baseline: BaselinePolicy,

    /// reads of cpu accounting slower than this are skipped. defaults to the period.
    #[arg(long, value_parser = parse_duration)]
    pub collect_deadline: Option<Duration>,

    /// draw a live cpu availability meter.
    #[arg(long)]
    pub watch: bool,

    /// log more. `-v` logs every observation, `-vv` every raw counter.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

// === impl Args ===

impl From<Args> for Config {
    fn from(
        Args {
            sysrq,
            trigger_percent,
            period,
            cpus,
            cgroup_root,
            sysrq_file,
            baseline,
            collect_deadline,
            watch,
            verbose: _,
        }: Args,
    ) -> Self {
        Self {
            trigger_percent,
            period,
            payload: sysrq,
            cpus,
            cgroup_root,
            sysrq_file,
            baseline,
            collect_deadline,
            watch,
        }
    }
}

/// parses a duration such as `50ms`, `1.5s`, or `250us`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    const UNITS: [(&str, u128); 7] = [
        ("ns", 1),
        ("us", 1_000),
        ("µs", 1_000),
        ("ms", 1_000_000),
        ("s", 1_000_000_000),
        ("m", 60_000_000_000),
        ("h", 3_600_000_000_000),
    ];

    let invalid = || format!("invalid duration `{s}`");

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| format!("missing unit in duration `{s}`"))?;
    let (value, unit) = s.split_at(split);
    let (_, scale) = UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .ok_or_else(|| format!("unknown unit `{unit}` in duration `{s}`"))?;

    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }

    let digits = |digits: &str| -> Result<u128, String> {
        match digits {
            "" => Ok(0),
            digits => digits.parse().map_err(|_| invalid()),
        }
    };

    let whole = digits(whole)?.checked_mul(*scale).ok_or_else(invalid)?;
    let fraction = u32::try_from(fraction.len())
        .ok()
        .and_then(|len| 10_u128.checked_pow(len))
        .and_then(|denominator| {
            let numerator = digits(fraction).ok()?.checked_mul(*scale)?;
            Some(numerator / denominator)
        })
        .ok_or_else(invalid)?;

    whole
        .checked_add(fraction)
        .and_then(|nanos| u64::try_from(nanos).ok())
        .map(Duration::from_nanos)
        .ok_or_else(invalid)
}
