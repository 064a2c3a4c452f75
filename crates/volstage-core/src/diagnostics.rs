//! Structured diagnostics.
//!
//! Every non-fatal condition the pipeline runs into is reported as a
//! [`Diagnostic`] to a caller-supplied [`DiagnosticSink`]. Reports are also
//! forwarded to the `log` facade so hosts that only install a logger still
//! see them.

use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Expected configuration, e.g. a volume without a property block.
    Debug,
    /// Informational progress.
    Info,
    /// An unsupported feature was replaced by the nearest supported behavior.
    Warning,
    /// Missing data or a violated precondition; the operation was skipped.
    Error,
}

impl Severity {
    /// Returns the matching `log` level.
    pub fn log_level(self) -> log::Level {
        match self {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

/// The pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Per-frame orchestration and input lookup.
    Mapper,
    /// Multi-component to single-channel reduction.
    Extractor,
    /// Lookup table discretization.
    TransferFunction,
    /// Spatial field conversion and upload.
    SpatialField,
    /// Device handle ownership.
    Resources,
    /// Rebuild planning.
    Staleness,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Mapper => "mapper",
            Component::Extractor => "extractor",
            Component::TransferFunction => "transfer-function",
            Component::SpatialField => "spatial-field",
            Component::Resources => "resources",
            Component::Staleness => "staleness",
        };
        f.write_str(name)
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub component: Component,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, component: Component, message: impl Into<String>) -> Self {
        Self {
            severity,
            component,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.component, self.message)
    }
}

/// Receives diagnostics from the pipeline.
pub trait DiagnosticSink {
    /// Accepts one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Logs a diagnostic and hands it to the sink.
pub fn emit(sink: &mut (impl DiagnosticSink + ?Sized), diagnostic: Diagnostic) {
    log::log!(diagnostic.severity.log_level(), "{diagnostic}");
    sink.report(diagnostic);
}

impl dyn DiagnosticSink + '_ {
    /// Logs and reports at debug severity.
    pub fn debug(&mut self, component: Component, message: impl Into<String>) {
        emit(self, Diagnostic::new(Severity::Debug, component, message));
    }

    /// Logs and reports at warning severity.
    pub fn warn(&mut self, component: Component, message: impl Into<String>) {
        emit(self, Diagnostic::new(Severity::Warning, component, message));
    }

    /// Logs and reports at error severity.
    pub fn error(&mut self, component: Component, message: impl Into<String>) {
        emit(self, Diagnostic::new(Severity::Error, component, message));
    }
}

/// A sink that keeps every diagnostic in order.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected diagnostics.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Returns diagnostics with exactly the given severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity == severity)
    }

    /// Returns whether any diagnostic from `component` has `severity`.
    pub fn contains(&self, severity: Severity, component: Component) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == severity && d.component == component)
    }

    /// Returns whether no diagnostics were collected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all collected diagnostics.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }
}

/// A sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnly;

impl DiagnosticSink for LogOnly {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}
