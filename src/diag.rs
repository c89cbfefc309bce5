//! Diagnostics
//!
//! Structured error and warning records accumulated by schema validation and
//! CRUD handlers. A handler collects as many diagnostics as it can in one
//! pass instead of stopping at the first problem, so the operator sees every
//! validation issue at once.

use std::fmt;

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One step in an attribution path into the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Attr(String),
    Index(usize),
}

/// Attribution path pointing at the offending value in the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    /// Path rooted at a top-level attribute.
    pub fn attr(name: impl Into<String>) -> Self {
        Self {
            steps: vec![PathStep::Attr(name.into())],
        }
    }

    /// Extend the path with a nested attribute name.
    pub fn with_attr(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PathStep::Attr(name.into()));
        self
    }

    /// Extend the path with a list index.
    pub fn with_index(mut self, index: usize) -> Self {
        self.steps.push(PathStep::Index(index));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match step {
                PathStep::Attr(name) => write!(f, "{name}")?,
                PathStep::Index(idx) => write!(f, "{idx}")?,
            }
        }
        Ok(())
    }
}

/// A single structured error or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub attribute_path: AttributePath,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: String::new(),
            attribute_path: AttributePath::default(),
        }
    }

    pub fn error_detail(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            ..Self::error(summary)
        }
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: String::new(),
            attribute_path: AttributePath::default(),
        }
    }

    /// Internal defect rather than a user-correctable mistake. The detail
    /// asks the operator to report the issue instead of fixing their config.
    pub fn plugin_error(summary: impl Into<String>) -> Self {
        Self::error_detail(
            summary,
            "This is a Stratos provider error, please report this issue to us! Thank you",
        )
    }

    pub fn with_path(mut self, path: AttributePath) -> Self {
        self.attribute_path = path;
        self
    }
}

/// Accumulating list of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.records.push(diag);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.records.extend(other.records);
    }

    pub fn has_error(&self) -> bool {
        self.records
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diag: Diagnostic) -> Self {
        Self {
            records: vec![diag],
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_rendering() {
        let path = AttributePath::attr("dimension").with_index(2).with_attr("weight");
        assert_eq!(path.to_string(), "dimension.2.weight");
    }

    #[test]
    fn test_has_error_ignores_warnings() {
        let mut d = Diagnostics::new();
        d.push(Diagnostic::warning("deprecated attribute"));
        assert!(!d.has_error());
        d.push(Diagnostic::error("boom"));
        assert!(d.has_error());
    }

    #[test]
    fn test_plugin_error_carries_report_hint() {
        let diag = Diagnostic::plugin_error("unexpected empty response");
        assert!(diag.detail.contains("report this issue"));
        assert_eq!(diag.severity, Severity::Error);
    }
}
