//! the emergency action.

use {
    std::{
        cell::RefCell,
        fs, io,
        path::{Path, PathBuf},
    },
    thiserror::Error,
};

/// performs the emergency action.
pub trait Trigger {
    fn fire(&self, payload: &str) -> Result<(), TriggerError>;
}

/// sends a command to the kernel's magic sysrq key handler.
///
/// see `Documentation/admin-guide/sysrq.rst` for the available commands. the default, `l`,
/// prints a backtrace of every active cpu to the kernel log.
#[derive(Clone, Debug)]
pub struct SysrqTrigger {
    path: PathBuf,
}

/// a mock trigger, recording every payload it is fired with.
#[derive(Default)]
#[allow(dead_code, reason = "this is a testing utility.")]
pub struct MockTrigger {
    fired: RefCell<Vec<String>>,
    broken: bool,
}

#[derive(Debug, Error)]
#[error("failed to write to {}: {source}", path.display())]
pub struct TriggerError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

// === impl SysrqTrigger ===

impl SysrqTrigger {
    pub const PATH: &str = "/proc/sysrq-trigger";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for SysrqTrigger {
    fn default() -> Self {
        Self::new(Self::PATH)
    }
}

impl Trigger for SysrqTrigger {
    fn fire(&self, payload: &str) -> Result<(), TriggerError> {
        let Self { path } = self;

        fs::write(path, payload).map_err(|source| TriggerError {
            path: path.clone(),
            source,
        })
    }
}

// === impl MockTrigger ===

#[allow(dead_code, reason = "this is a testing utility.")]
impl MockTrigger {
    /// returns a trigger that fails every time it is fired.
    pub fn broken() -> Self {
        Self {
            fired: RefCell::default(),
            broken: true,
        }
    }

    /// returns the payloads this trigger has been fired with.
    pub fn fired(&self) -> Vec<String> {
        self.fired.borrow().clone()
    }
}

impl Trigger for MockTrigger {
    fn fire(&self, payload: &str) -> Result<(), TriggerError> {
        let Self { fired, broken } = self;

        fired.borrow_mut().push(payload.to_owned());

        if *broken {
            return Err(TriggerError {
                path: PathBuf::from(SysrqTrigger::PATH),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            });
        }

        Ok(())
    }
}
