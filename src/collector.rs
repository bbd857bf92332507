//! cgroup cpu accounting.
//!
//! the collector reads cumulative cpu usage of the root cgroup, which accounts for every task
//! on the host. both cgroup hierarchies are supported:
//!
//! * v1 exposes `cpuacct.usage` and `cpuacct.usage_percpu`, in nanoseconds.
//! * v2 exposes `usage_usec` in `cpu.stat`, in microseconds, with no per-cpu breakdown.

use {
    crate::{
        sample::{Nanos, Sample},
        source::{AccountingSource, CgroupDir, Clock, SystemClock},
    },
    std::{
        cell::RefCell,
        collections::VecDeque,
        io,
        num::ParseIntError,
        path::{Path, PathBuf},
        time::Duration,
    },
    thiserror::Error,
    tracing::trace,
};


/// supplies fresh cpu usage samples on demand.
pub trait Collector {
    fn collect(&self) -> Result<Sample, CollectError>;
}

/// collects samples from cgroup accounting files.
pub struct CgroupCollector<C = SystemClock, S = CgroupDir> {
    /// the clock used to timestamp samples.
    clock: C,
    /// the underlying accounting files.
    source: S,
    /// the layout of the accounting files.
    hierarchy: Hierarchy,
    /// reads that take longer than this are rejected.
    deadline: Duration,
}

/// the version of the cgroup hierarchy being read.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Hierarchy {
    /// the legacy `cpuacct` controller.
    V1,
    /// the unified hierarchy.
    V2,
}

/// a mock collector, replaying a fixed sequence of results.
#[derive(Default)]
#[allow(dead_code, reason = "this is a testing utility.")]
pub struct MockCollector {
    samples: RefCell<VecDeque<Result<Sample, CollectError>>>,
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to read {file}: {source}")]
    Io {
        file: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: &'static str,
        #[source]
        source: ParseError,
    },
    #[error("reading cpu accounting took {elapsed:?}, longer than the {deadline:?} deadline")]
    Deadline { elapsed: Duration, deadline: Duration },
    #[error("no cpu accounting found under {}", root.display())]
    NoHierarchy { root: PathBuf },
}

#[derive(Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("invalid counter: {0}")]
    Counter(#[from] ParseIntError),
    #[error("missing key `{0}`")]
    MissingKey(&'static str),
}

// === impl CgroupCollector ===

impl CgroupCollector {
    /// the unified hierarchy advertises its controllers in this file.
    const CONTROLLERS: &str = "cgroup.controllers";

    /// directories the v1 `cpuacct` controller is commonly mounted at.
    const CPUACCT_MOUNTS: [&str; 3] = ["cpuacct", "cpu,cpuacct", "cpu"];

    /// finds the cpu accounting files of the cgroup hierarchy mounted at `root`.
    ///
    /// a hierarchy is only accepted if every file a sample is read from is present.
    pub fn discover(root: &Path, deadline: Duration) -> Result<Self, CollectError> {
        let has_files = |dir: &Path, files: &[&str]| files.iter().all(|f| dir.join(f).is_file());

        if root.join(Self::CONTROLLERS).is_file() && has_files(root, Hierarchy::V2.files()) {
            let source = CgroupDir::new(root);
            return Ok(Self::new(SystemClock, source, Hierarchy::V2, deadline));
        }

        Self::CPUACCT_MOUNTS
            .iter()
            .map(|mount| root.join(mount))
            .find(|dir| has_files(dir, Hierarchy::V1.files()))
            .map(CgroupDir::new)
            .map(|source| Self::new(SystemClock, source, Hierarchy::V1, deadline))
            .ok_or_else(|| CollectError::NoHierarchy {
                root: root.to_owned(),
            })
    }

    /// returns the directory samples are read from.
    pub fn dir(&self) -> &Path {
        self.source.path()
    }
}

impl<C, S> CgroupCollector<C, S> {
    pub fn new(clock: C, source: S, hierarchy: Hierarchy, deadline: Duration) -> Self {
        Self {
            clock,
            source,
            hierarchy,
            deadline,
        }
    }

    pub fn hierarchy(&self) -> Hierarchy {
        self.hierarchy
    }
}

impl<C, S> CgroupCollector<C, S>
where
    S: AccountingSource,
{
    fn read(&self, file: &'static str) -> Result<String, CollectError> {
        self.source
            .read(file)
            .map_err(|source| CollectError::Io { file, source })
    }

    /// reads `(per_cpu, total)` usage counters.
    fn read_counters(&self) -> Result<(Vec<Nanos>, Nanos), CollectError> {
        let parse_error = |file| move |source| CollectError::Parse { file, source };

        match self.hierarchy {
            Hierarchy::V1 => {
                let file = Hierarchy::V1_USAGE;
                let total = parse_usage(&self.read(file)?).map_err(parse_error(file))?;
                let file = Hierarchy::V1_USAGE_PERCPU;
                let per_cpu = parse_usage_percpu(&self.read(file)?).map_err(parse_error(file))?;
                Ok((per_cpu, total))
            }
            Hierarchy::V2 => {
                let file = Hierarchy::V2_STAT;
                let total = parse_cpu_stat(&self.read(file)?).map_err(parse_error(file))?;
                Ok((Vec::new(), total))
            }
        }
    }
}

impl<C, S> Collector for CgroupCollector<C, S>
where
    C: Clock,
    S: AccountingSource,
{
    fn collect(&self) -> Result<Sample, CollectError> {
        let Self {
            clock,
            hierarchy,
            deadline,
            ..
        } = self;

        let start = clock.now();
        let (per_cpu, total) = self.read_counters()?;
        let time = clock.now();

        let elapsed = time.saturating_duration_since(start);
        if elapsed > *deadline {
            return Err(CollectError::Deadline {
                elapsed,
                deadline: *deadline,
            });
        }

        trace!(?hierarchy, %total, ?per_cpu, "read cpu accounting");

        Ok(Sample::new(time, per_cpu, total))
    }
}

// === impl Hierarchy ===

impl Hierarchy {
    const V1_USAGE: &str = "cpuacct.usage";
    const V1_USAGE_PERCPU: &str = "cpuacct.usage_percpu";
    const V2_STAT: &str = "cpu.stat";

    /// the accounting files a sample is read from.
    fn files(self) -> &'static [&'static str] {
        match self {
            Self::V1 => &[Self::V1_USAGE, Self::V1_USAGE_PERCPU],
            Self::V2 => &[Self::V2_STAT],
        }
    }
}

// === impl MockCollector ===

#[allow(dead_code, reason = "this is a testing utility.")]
impl MockCollector {
    pub fn new(samples: impl IntoIterator<Item = Result<Sample, CollectError>>) -> Self {
        Self {
            samples: RefCell::new(samples.into_iter().collect()),
        }
    }
}

impl Collector for MockCollector {
    fn collect(&self) -> Result<Sample, CollectError> {
        let Self { samples } = self;

        samples
            .borrow_mut()
            .pop_front()
            .expect("mock samples should not be empty")
    }
}

// === parsers ===

/// parses a single counter, as found in `cpuacct.usage`.
pub fn parse_usage(contents: &str) -> Result<Nanos, ParseError> {
    contents.trim().parse().map_err(ParseError::Counter)
}

/// parses per-cpu counters, as found in `cpuacct.usage_percpu`.
pub fn parse_usage_percpu(contents: &str) -> Result<Vec<Nanos>, ParseError> {
    contents
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(ParseError::Counter)
}

/// parses the `usage_usec` entry of a cgroup v2 `cpu.stat` table.
pub fn parse_cpu_stat(contents: &str) -> Result<Nanos, ParseError> {
    const KEY: &str = "usage_usec";

    contents
        .lines()
        .filter_map(|line| line.split_once(' '))
        .find(|(key, _)| *key == KEY)
        .ok_or(ParseError::MissingKey(KEY))
        .and_then(|(_, value)| value.trim().parse().map_err(ParseError::Counter))
        .map(Nanos::from_micros)
}
