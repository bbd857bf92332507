//! triggers a sysrq when the host runs out of cpu.
//!
//! the [`Monitor`] polls cgroup cpu accounting once per period, computes how much cpu capacity
//! was left idle since the previous poll, and writes a command to `/proc/sysrq-trigger` when
//! that availability is at or below a threshold. by default, this is `l`, which dumps a
//! backtrace of every cpu to the kernel log: a last-resort diagnostic for a cpu-starved host.

use {
    self::{
        collector::{CgroupCollector, CollectError, Collector},
        config::{Config, ConfigError},
        schedule::Ticker,
        trigger::SysrqTrigger,
        window::Watch,
    },
    thiserror::Error,
    tracing::{info, warn},
};

pub use self::monitor::{BaselinePolicy, Monitor, Outcome, Settings};

pub mod cli;
pub mod collector;
pub mod config;
pub mod logging;
pub mod monitor;
pub mod rate;
pub mod sample;
pub mod schedule;
pub mod source;
pub mod trigger;

mod meter;
mod window;

pub struct App {
    monitor: Monitor,
    ticker: Ticker,
    watch: Option<Watch>,
}

/// a failure that prevents monitoring from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to find cpu accounting: {0}")]
    Collector(#[from] CollectError),
    #[error("failed to set up the terminal: {0}")]
    Watch(#[source] std::io::Error),
}

/// === impl App ===

impl App {
    /// initializes a new application.
    pub fn new(config: &Config) -> Result<Self, StartupError> {
        config.validate()?;

        let cpus = config.cpus()?;
        let collector = CgroupCollector::discover(&config.cgroup_root, config.collect_deadline())?;
        let trigger = SysrqTrigger::new(&config.sysrq_file);

        // a hierarchy that cannot be read now would fail on every tick.
        let sample = collector.collect()?;

        info!(
            cpus,
            cgroup = %collector.dir().display(),
            total = %sample.total(),
            hierarchy = ?collector.hierarchy(),
            period = ?config.period,
            trigger_percent = config.trigger_percent,
            baseline = %config.baseline,
            "monitoring cpu availability"
        );

        if !trigger.path().exists() {
            warn!(path = %trigger.path().display(), "sysrq trigger file does not exist");
        }

        let watch = config
            .watch
            .then(|| Watch::stdout(cpus))
            .transpose()
            .map_err(StartupError::Watch)?;

        Ok(Self {
            monitor: Monitor::new(collector, trigger, config.settings(cpus)),
            ticker: Ticker::new(config.period),
            watch,
        })
    }

    /// runs the application, polling once per tick until the process exits.
    pub fn run(self) {
        let Self {
            mut monitor,
            ticker,
            mut watch,
        } = self;

        for _tick in ticker {
            let outcome = monitor.poll();

            if let Some(watch) = watch.as_mut() {
                if let Err(error) = watch.draw(&outcome) {
                    warn!(%error, "failed to draw meter");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{fs, num::NonZeroUsize, path::PathBuf},
    };

    /// returns a fresh cgroup root, holding `cpu.stat` with the given contents.
    fn cgroup_root(name: &str, cpu_stat: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("cpu-sysrq-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("cgroup.controllers"), "cpu\n").unwrap();
        fs::write(root.join("cpu.stat"), cpu_stat).unwrap();
        root
    }

    fn config(cgroup_root: PathBuf) -> Config {
        Config {
            cpus: NonZeroUsize::new(4),
            cgroup_root,
            collect_deadline: Some(std::time::Duration::from_secs(5)),
            ..Config::default()
        }
    }

    #[test]
    fn starts_on_readable_accounting() {
        let root = cgroup_root("app-ok", "usage_usec 1000\n");
        assert!(App::new(&config(root.clone())).is_ok());
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn unreadable_accounting_is_fatal() {
        let root = cgroup_root("app-unreadable", "user_usec 1000\n");
        let err = App::new(&config(root.clone())).err().unwrap();
        assert!(matches!(
            err,
            StartupError::Collector(CollectError::Parse { file: "cpu.stat", .. })
        ));
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn invalid_config_is_fatal() {
        let config = Config {
            payload: String::new(),
            ..config(PathBuf::from("/nonexistent"))
        };
        let err = App::new(&config).err().unwrap();
        assert!(matches!(err, StartupError::Config(ConfigError::EmptyPayload)));
    }
}
