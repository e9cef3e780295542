//! # wpb-core
//!
//! Core types shared by the wpb workspace: the error taxonomy, run-period tags
//! and the traits through which external lookup services are injected.
//!
//! This crate intentionally has no dependency on the columnar or correction
//! crates, so any of them can depend on it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod period;
pub mod traits;

pub use error::{Error, Result};
pub use period::{Period, Variation};
pub use traits::{LumiMask, NoLumiMask, ScaleFactorService, SfVariant};

/// Workspace version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
