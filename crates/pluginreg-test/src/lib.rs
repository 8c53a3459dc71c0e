//! Shared test utilities for pluginreg.
//!
//! This crate provides mock implementations and test helpers that can be
//! used across pluginreg crates as a dev-dependency.
//!
//! - [`MockRepositoryService`]: scripted releases, contents and assets with
//!   call recording
//! - [`FaultyFs`]: host filesystem with per-operation fault injection
//! - [`TestServer`]: route-table HTTP server for exercising the real client
//! - [`fixtures`]: metadata documents and archive builders
//!
//! # Usage
//!
//! ```rust,ignore
//! use pluginreg_test::{MockRepositoryService, fixtures};
//! use pluginreg_github::Release;
//!
//! let service = MockRepositoryService::new()
//!     .with_latest("owner", "my-plugin", Release::tagged("v1.0.0"))
//!     .with_contents(
//!         "owner",
//!         "my-plugin",
//!         "v1.0.0",
//!         fixtures::metadata("my-plugin", "my-plugin.zip"),
//!     );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod fs;
pub mod mocks;
pub mod server;

pub use fs::{FaultyFs, FsOp};
pub use mocks::{MockRepositoryService, ServiceCall};
pub use server::{RecordedRequest, TestResponse, TestServer};
