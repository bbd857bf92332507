use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    fs,
    io,
    path::PathBuf,
    time::Instant,
};

pub use self::{accounting::*, clock::*};

mod clock {
    use super::*;

    pub trait Clock {
        fn now(&self) -> Instant;
    }

    #[derive(Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> Instant {
            Instant::now()
        }
    }

    /// a mock clock, replaying a fixed sequence of instants.
    #[derive(Default)]
    #[allow(dead_code, reason = "this is a testing utility.")]
    pub struct MockClock {
        times: RefCell<VecDeque<Instant>>,
    }

    #[allow(dead_code, reason = "this is a testing utility.")]
    impl MockClock {
        pub fn new(times: impl IntoIterator<Item = Instant>) -> Self {
            Self {
                times: RefCell::new(times.into_iter().collect()),
            }
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            let MockClock { times } = self;

            times
                .borrow_mut()
                .pop_front()
                .expect("mock times should not be empty")
        }
    }
}

/// abstracts over providers of cgroup accounting files.
mod accounting {
    use super::*;

    /// a source of cgroup accounting data.
    pub trait AccountingSource {
        /// returns the contents of the named accounting file.
        fn read(&self, file: &str) -> io::Result<String>;
    }

    /// accounting files in a cgroup directory.
    #[derive(Clone, Debug)]
    pub struct CgroupDir {
        path: PathBuf,
    }

    /// a mock accounting source.
    #[derive(Default)]
    #[allow(dead_code, reason = "this is a testing utility.")]
    pub struct MockAccounting {
        files: RefCell<HashMap<String, VecDeque<io::Result<String>>>>,
    }

    // === impl CgroupDir ===

    impl CgroupDir {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        pub fn path(&self) -> &std::path::Path {
            &self.path
        }
    }

    impl AccountingSource for CgroupDir {
        fn read(&self, file: &str) -> io::Result<String> {
            fs::read_to_string(self.path.join(file))
        }
    }

    // === impl MockAccounting ===

    #[allow(dead_code, reason = "this is a testing utility.")]
    impl MockAccounting {
        /// queues the next contents of `file`.
        pub fn push(&self, file: &str, contents: impl Into<String>) {
            self.push_result(file, Ok(contents.into()));
        }

        /// queues the next result of reading `file`.
        pub fn push_result(&self, file: &str, result: io::Result<String>) {
            let Self { files } = self;

            files
                .borrow_mut()
                .entry(file.to_owned())
                .or_default()
                .push_back(result);
        }
    }

    impl AccountingSource for MockAccounting {
        fn read(&self, file: &str) -> io::Result<String> {
            let Self { files } = self;

            files
                .borrow_mut()
                .get_mut(file)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(io::Error::from(io::ErrorKind::NotFound)))
        }
    }
}
