//! Fault-injecting filesystem.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pluginreg_core::{FileStat, Fs, OsFs};

/// A filesystem operation that can be faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    /// [`Fs::create_temp_dir`]
    CreateTempDir,
    /// [`Fs::open_file`]
    OpenFile,
    /// Writes through a file returned by [`Fs::open_file`].
    Write,
    /// [`Fs::chmod`]
    Chmod,
    /// [`Fs::remove_all`]
    RemoveAll,
    /// [`Fs::stat`]
    Stat,
}

#[derive(Debug, Clone)]
struct Fault {
    file_name: Option<String>,
    message: String,
}

impl Fault {
    fn applies_to(&self, path: &Path) -> bool {
        match &self.file_name {
            Some(name) => path.file_name().is_some_and(|f| f == name.as_str()),
            None => true,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    faults: HashMap<FsOp, Fault>,
    created: Vec<PathBuf>,
    removed: Vec<PathBuf>,
    chmods: Vec<(PathBuf, u32)>,
}

/// Host filesystem with per-operation fault injection.
///
/// A faulted operation fails with an error whose message is the one given
/// to [`FaultyFs::fail`]. Temp directory creation, removals and permission
/// changes are recorded so tests can check what was left behind.
#[derive(Debug, Clone)]
pub struct FaultyFs {
    inner: OsFs,
    state: Arc<Mutex<State>>,
}

impl FaultyFs {
    /// Wrap the host filesystem, creating temp directories under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: OsFs::with_temp_root(root),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Fail every `op` with `message` from now on.
    #[must_use]
    pub fn fail(self, op: FsOp, message: &str) -> Self {
        self.insert_fault(op, None, message)
    }

    /// Fail `op` with `message` only for paths whose file name is
    /// `file_name`.
    #[must_use]
    pub fn fail_for(self, op: FsOp, file_name: &str, message: &str) -> Self {
        self.insert_fault(op, Some(file_name.to_string()), message)
    }

    fn insert_fault(self, op: FsOp, file_name: Option<String>, message: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.faults.insert(
                op,
                Fault {
                    file_name,
                    message: message.to_string(),
                },
            );
        }
        self
    }

    /// Temp directories created, in order.
    #[must_use]
    pub fn created(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .map(|s| s.created.clone())
            .unwrap_or_default()
    }

    /// Paths passed to `remove_all`, in order.
    #[must_use]
    pub fn removed(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .map(|s| s.removed.clone())
            .unwrap_or_default()
    }

    /// `(path, mode)` pairs passed to `chmod`, in order.
    #[must_use]
    pub fn chmods(&self) -> Vec<(PathBuf, u32)> {
        self.state
            .lock()
            .map(|s| s.chmods.clone())
            .unwrap_or_default()
    }

    /// Whether every created temp directory was removed and is gone.
    #[must_use]
    pub fn all_temp_dirs_removed(&self) -> bool {
        let removed = self.removed();
        self.created()
            .iter()
            .all(|dir| removed.contains(dir) && !dir.exists())
    }

    fn fault(&self, op: FsOp, path: &Path) -> io::Result<()> {
        let fault = self
            .state
            .lock()
            .ok()
            .and_then(|s| s.faults.get(&op).cloned())
            .filter(|f| f.applies_to(path));
        match fault {
            Some(fault) => Err(io::Error::other(fault.message)),
            None => Ok(()),
        }
    }

    fn with_state(&self, f: impl FnOnce(&mut State)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }
}

impl Fs for FaultyFs {
    fn create_temp_dir(&self, prefix: &str) -> io::Result<PathBuf> {
        self.fault(FsOp::CreateTempDir, Path::new(prefix))?;
        let path = self.inner.create_temp_dir(prefix)?;
        self.with_state(|s| s.created.push(path.clone()));
        Ok(path)
    }

    fn open_file(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write + Send>> {
        self.fault(FsOp::OpenFile, path)?;
        let file = self.inner.open_file(path, mode)?;
        match self.fault(FsOp::Write, path) {
            Ok(()) => Ok(file),
            Err(e) => Ok(Box::new(FailingWriter {
                message: e.to_string(),
            })),
        }
    }

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.with_state(|s| s.chmods.push((path.to_path_buf(), mode)));
        self.fault(FsOp::Chmod, path)?;
        self.inner.chmod(path, mode)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        self.with_state(|s| s.removed.push(path.to_path_buf()));
        self.fault(FsOp::RemoveAll, path)?;
        self.inner.remove_all(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.fault(FsOp::Stat, path)?;
        self.inner.stat(path)
    }
}

struct FailingWriter {
    message: String,
}

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other(self.message.clone()))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
