//! Per-install execution context.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{InstallError, InstallResult};
use crate::fs::{Fs, OsFs};

/// Context threaded through discovery, every remote call and the delegate
/// installer of one install.
///
/// Carries the filesystem handle installers are constructed with and the
/// caller's cancellation token. Cloning is cheap and clones share the token.
#[derive(Debug, Clone)]
pub struct InstallContext {
    fs: Arc<dyn Fs>,
    cancellation: CancellationToken,
}

impl InstallContext {
    /// Create a context bound to `fs` with a fresh cancellation token.
    #[must_use]
    pub fn new(fs: Arc<dyn Fs>) -> Self {
        Self {
            fs,
            cancellation: CancellationToken::new(),
        }
    }

    /// Use the caller's cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Replace the filesystem handle.
    #[must_use]
    pub fn with_fs(mut self, fs: Arc<dyn Fs>) -> Self {
        self.fs = fs;
        self
    }

    /// Filesystem handle for this install.
    #[must_use]
    pub fn fs(&self) -> &Arc<dyn Fs> {
        &self.fs
    }

    /// Cancellation token for this install.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the caller has cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail with [`InstallError::Cancelled`] if the caller has cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Cancelled`] after cancellation.
    pub fn ensure_active(&self) -> InstallResult<()> {
        if self.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the caller cancels first, in which
    /// case `fut` is dropped and `None` is returned.
    pub async fn run_until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

impl Default for InstallContext {
    fn default() -> Self {
        Self::new(Arc::new(OsFs::new()))
    }
}
