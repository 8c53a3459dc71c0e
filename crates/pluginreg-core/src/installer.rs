//! Installer capability and predicate-based registry.
//!
//! Each registration is a host identifier, a predicate deciding whether the
//! installer handles a source, and a factory binding a new installer to a
//! filesystem. [`InstallerRegistry::find`] scans registrations in order and
//! the first accepting predicate wins.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::InstallContext;
use crate::error::{InstallError, InstallResult};
use crate::fs::Fs;
use crate::plugin::Plugin;

/// Makes a plugin usable at a destination directory.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Install the plugin identified by `source` under `dest`.
    ///
    /// # Errors
    ///
    /// Returns an [`InstallError`] describing the first failing step.
    async fn install(&self, ctx: &InstallContext, dest: &Path, source: &str)
    -> InstallResult<Plugin>;
}

/// Decides whether an installer handles a source.
pub type InstallerPredicate = Box<dyn Fn(&InstallContext, &str) -> bool + Send + Sync>;

/// Builds an installer bound to a filesystem.
pub type InstallerFactory = Box<dyn Fn(Arc<dyn Fs>) -> Arc<dyn Installer> + Send + Sync>;

struct Registration {
    id: String,
    predicate: InstallerPredicate,
    factory: InstallerFactory,
}

/// Ordered set of installer registrations.
#[derive(Default)]
pub struct InstallerRegistry {
    registrations: Vec<Registration>,
}

impl InstallerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an installer.
    ///
    /// Registering an identifier again replaces the earlier registration in
    /// place, keeping its position in the scan order.
    pub fn register<P, F>(&mut self, id: impl Into<String>, predicate: P, factory: F)
    where
        P: Fn(&InstallContext, &str) -> bool + Send + Sync + 'static,
        F: Fn(Arc<dyn Fs>) -> Arc<dyn Installer> + Send + Sync + 'static,
    {
        let registration = Registration {
            id: id.into(),
            predicate: Box::new(predicate),
            factory: Box::new(factory),
        };

        if let Some(existing) = self
            .registrations
            .iter_mut()
            .find(|r| r.id == registration.id)
        {
            debug!(id = %registration.id, "replacing installer registration");
            *existing = registration;
        } else {
            debug!(id = %registration.id, "registered installer");
            self.registrations.push(registration);
        }
    }

    /// Find the first installer whose predicate accepts `source`, bound to
    /// the context's filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::NoSupportedInstaller`] if no predicate matches.
    pub fn find(&self, ctx: &InstallContext, source: &str) -> InstallResult<Arc<dyn Installer>> {
        let registration = self
            .registrations
            .iter()
            .find(|r| (r.predicate)(ctx, source))
            .ok_or_else(|| InstallError::NoSupportedInstaller {
                path: source.to_string(),
            })?;

        debug!(id = %registration.id, source, "found installer");

        Ok((registration.factory)(Arc::clone(ctx.fs())))
    }

    /// Find an installer for `source` and run it.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::NoSupportedInstaller`] if nothing matches,
    /// otherwise whatever the installer returns.
    pub async fn install(
        &self,
        ctx: &InstallContext,
        dest: &Path,
        source: &str,
    ) -> InstallResult<Plugin> {
        let installer = self.find(ctx, source)?;
        installer.install(ctx, dest, source).await
    }

    /// Registered identifiers in scan order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.id.as_str()).collect()
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl fmt::Debug for InstallerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallerRegistry")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}
