//! CLI command implementations.

pub(crate) mod install;
pub(crate) mod resolve;
