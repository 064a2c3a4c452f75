//! Core abstractions for volstage-rs.
//!
//! This crate provides the pieces every other volstage crate builds on:
//! - [`VolstageError`] and the crate-wide [`Result`]
//! - [`MapperOptions`], the host-settable table resolutions
//! - Structured [`Diagnostic`]s delivered to a [`DiagnosticSink`]
//! - [`ModTime`] stamps and the [`StalenessTracker`] that plans rebuilds

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod diagnostics;
pub mod error;
pub mod options;
pub mod staleness;
pub mod timestamp;

pub use diagnostics::{Component, Diagnostic, DiagnosticSink, Diagnostics, LogOnly, Severity};
pub use error::{Result, VolstageError};
pub use options::{MapperOptions, DEFAULT_COLOR_SIZE, DEFAULT_OPACITY_SIZE};
pub use staleness::{BuildTimestamps, RebuildPlan, RebuildScope, StalenessInputs, StalenessTracker};
pub use timestamp::{ModTime, TimeStamp};
