// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Structured diagnostic records accumulated during a configuration session

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity levels
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational status message
    #[default]
    Info,
    /// Something was ignored or degraded
    Warning,
    /// Part of the configuration could not be applied
    Error,
    /// The document itself could not be read any further
    Fatal,
}

impl Severity {
    /// The `log` level this severity is reported at
    pub fn log_level(self) -> log::Level {
        match self {
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error | Severity::Fatal => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Position in the configuration document (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number
    pub line: usize,
    /// Column number
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Diagnostic codes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// Plain status message
    Status,
    /// No explicit or implicit action matched an element
    UnmatchedElement,
    /// Required attribute missing
    MissingAttribute,
    /// Mutually exclusive attributes misused
    InvalidAttributes,
    /// Named reference could not be resolved
    UnresolvedReference,
    /// Class lookup or construction failure
    Instantiation,
    /// Property lookup or coercion failure
    Property,
    /// Variable substitution failure
    Substitution,
    /// Object stack does not match the action's expectation
    StackDiscipline,
    /// Component activation failure
    Activation,
    /// A rule registered from the document could not be installed
    RuleRegistration,
    /// File could not be read
    Io,
    /// Reported by the XML reader
    Parser,
    /// Custom code
    Custom(String),
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCode::Status => write!(f, "status"),
            DiagnosticCode::UnmatchedElement => write!(f, "unmatched element"),
            DiagnosticCode::MissingAttribute => write!(f, "missing attribute"),
            DiagnosticCode::InvalidAttributes => write!(f, "invalid attributes"),
            DiagnosticCode::UnresolvedReference => write!(f, "unresolved reference"),
            DiagnosticCode::Instantiation => write!(f, "instantiation"),
            DiagnosticCode::Property => write!(f, "property"),
            DiagnosticCode::Substitution => write!(f, "substitution"),
            DiagnosticCode::StackDiscipline => write!(f, "stack discipline"),
            DiagnosticCode::Activation => write!(f, "activation"),
            DiagnosticCode::RuleRegistration => write!(f, "rule registration"),
            DiagnosticCode::Io => write!(f, "io"),
            DiagnosticCode::Parser => write!(f, "parser"),
            DiagnosticCode::Custom(code) => write!(f, "{code}"),
        }
    }
}

/// A single diagnostic record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity of the diagnostic
    pub severity: Severity,
    /// Error code
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Position in the document, when a locator was active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            cause: None,
            location: None,
        }
    }

    /// Create an informational status record
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, DiagnosticCode::Status, message)
    }

    /// Create a warning
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Create an error
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Attach a cause
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// Attach a location unless one is already set
    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        if self.location.is_none() {
            self.location = location;
        }
        self
    }

    /// Check if this is an error or worse
    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }

    /// Check if this is a warning
    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " ({location})")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": caused by {cause}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_display_with_location_and_cause() {
        let diagnostic = Diagnostic::error(DiagnosticCode::Instantiation, "boom")
            .at(Some(SourceLocation::new(3, 14)))
            .with_cause("no such class");
        assert_eq!(
            diagnostic.to_string(),
            "[ERROR] boom (line 3, column 14): caused by no such class"
        );
        assert!(diagnostic.is_error());
    }

    #[test]
    fn test_at_keeps_existing_location() {
        let diagnostic = Diagnostic::info("x")
            .at(Some(SourceLocation::new(1, 1)))
            .at(Some(SourceLocation::new(9, 9)));
        assert_eq!(diagnostic.location, Some(SourceLocation::new(1, 1)));
    }
}
