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

//! Error types for configuration interpretation
//!
//! Configuration problems are accumulated as diagnostics rather than thrown; the
//! types here are what actions, the property accessor and the substitution engine
//! hand back to the interpreter before it turns them into diagnostic records.

use crate::diagnostics::DiagnosticCode;
use thiserror::Error;

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while building the component graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required attribute is absent or empty
    #[error("Missing required attribute '{attribute}' on element [{element}]")]
    MissingAttribute {
        /// Element tag name
        element: String,
        /// Attribute name
        attribute: String,
    },

    /// Mutually exclusive attributes were both present, or neither
    #[error("Invalid attributes on element [{element}]: {message}")]
    InvalidAttributes {
        /// Element tag name
        element: String,
        /// Human-readable explanation
        message: String,
    },

    /// A named reference could not be resolved in this session
    #[error("Could not resolve '{name}': {message}")]
    UnresolvedReference {
        /// The referenced name
        name: String,
        /// Human-readable explanation
        message: String,
    },

    /// A class name is unknown or its factory failed
    #[error("Could not instantiate class '{class_name}': {message}")]
    Instantiation {
        /// Requested class name
        class_name: String,
        /// Human-readable explanation
        message: String,
    },

    /// A class was found but does not satisfy the required supertype
    #[error("Class '{class_name}' is not a {expected}")]
    WrongSupertype {
        /// Requested class name
        class_name: String,
        /// Supertype the caller asked for
        expected: String,
    },

    /// Property introspection or coercion failure
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Variable substitution failure
    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    /// The object stack does not hold what the action expected
    #[error("Unexpected object on the execution stack: {message}")]
    UnexpectedObject {
        /// Human-readable explanation
        message: String,
    },

    /// A component refused to activate
    #[error("Activation of component '{class_name}' failed: {message}")]
    Activation {
        /// Class of the component
        class_name: String,
        /// Reason given by the component
        message: String,
    },

    /// Reading a configuration or properties file failed
    #[error("I/O error on '{path}': {message}")]
    Io {
        /// File path
        path: String,
        /// Underlying error message
        message: String,
    },

    /// Any other configuration error
    #[error("{0}")]
    Other(String),
}

impl ConfigError {
    /// Create a missing attribute error
    pub fn missing_attribute(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            element: element.into(),
            attribute: attribute.into(),
        }
    }

    /// Create an unexpected object error
    pub fn unexpected_object(message: impl Into<String>) -> Self {
        Self::UnexpectedObject {
            message: message.into(),
        }
    }

    /// Diagnostic code used when this error is recorded
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ConfigError::MissingAttribute { .. } => DiagnosticCode::MissingAttribute,
            ConfigError::InvalidAttributes { .. } => DiagnosticCode::InvalidAttributes,
            ConfigError::UnresolvedReference { .. } => DiagnosticCode::UnresolvedReference,
            ConfigError::Instantiation { .. } | ConfigError::WrongSupertype { .. } => {
                DiagnosticCode::Instantiation
            }
            ConfigError::Property(_) => DiagnosticCode::Property,
            ConfigError::Substitution(_) => DiagnosticCode::Substitution,
            ConfigError::UnexpectedObject { .. } => DiagnosticCode::StackDiscipline,
            ConfigError::Activation { .. } => DiagnosticCode::Activation,
            ConfigError::Io { .. } => DiagnosticCode::Io,
            ConfigError::Other(_) => DiagnosticCode::Custom("configuration".to_string()),
        }
    }
}

/// Errors raised by the generic property accessor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// No property of that name on the target
    #[error("No such property '{name}' in class {class_name}")]
    NotFound {
        /// Normalized property name
        name: String,
        /// Class of the target component
        class_name: String,
    },

    /// The string could not be converted to the property type
    #[error("Failed to convert value '{value}' to {target_type} for property '{name}'")]
    Conversion {
        /// Normalized property name
        name: String,
        /// Offending string value
        value: String,
        /// Target type name
        target_type: String,
    },

    /// The property exists but cannot be set from a string
    #[error("Property '{name}' of type {type_name} cannot be set from a string")]
    UnsupportedType {
        /// Normalized property name
        name: String,
        /// Type of the property
        type_name: String,
    },

    /// A component was offered to a slot of an incompatible kind
    #[error("Component of class {actual} is not assignable to '{name}' (expects {expected})")]
    TypeMismatch {
        /// Normalized property name
        name: String,
        /// Required component kind
        expected: String,
        /// Class of the offered component
        actual: String,
    },

    /// The component rejected an otherwise well-typed value
    #[error("Property '{name}' rejected the value: {message}")]
    Rejected {
        /// Normalized property name
        name: String,
        /// Reason given by the component
        message: String,
    },
}

impl PropertyError {
    /// Create a not-found error
    pub fn not_found(name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            class_name: class_name.into(),
        }
    }
}

/// Errors raised by `${...}` variable substitution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionError {
    /// A `${` has no matching `}`
    #[error("Unterminated variable reference at offset {offset} in \"{input}\"")]
    Unterminated {
        /// The text being expanded
        input: String,
        /// Byte offset of the opening `${`
        offset: usize,
    },

    /// A variable expands (directly or indirectly) to itself
    #[error("Circular variable reference detected: {chain}")]
    Circular {
        /// The keys involved, in expansion order
        chain: String,
    },
}

/// Outcome signalled by an action phase
///
/// The two skip variants are control flow only; the action records any user-visible
/// diagnostic itself before raising them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// Suppress dispatch for every descendant of the current element
    #[error("skip children of the current element")]
    SkipChildren,

    /// Suppress dispatch for the remaining siblings of the current element
    #[error("skip remaining siblings of the current element")]
    SkipSiblings,

    /// Unexpected failure; recorded, then handled like `SkipChildren`
    #[error(transparent)]
    Failed(#[from] ConfigError),
}

/// Result of a single action phase
pub type ActionResult<T = ()> = std::result::Result<T, ActionError>;
