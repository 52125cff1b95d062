//! Configuration validation issues.
//!
//! Config loading collects every problem it finds instead of stopping at the
//! first one. Each problem is a [`ConfigIssue`] with a severity; callers abort
//! on any [`Severity::Error`] and print warnings.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A persona definition is invalid (empty name/stance, bad prior).
    InvalidPersona { name: String },
    /// Two personas share a name.
    DuplicatePersona { name: String },
    /// A numeric setting is outside its allowed range.
    OutOfRange { field: String },
    /// A duration setting is zero.
    ZeroDuration { field: String },
    /// The per-call timeout exceeds the whole pipeline budget.
    CallTimeoutExceedsPipeline,
    /// No backend base URL is configured.
    MissingBaseUrl,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", label, self.message)
    }
}
