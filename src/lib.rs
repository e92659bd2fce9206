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

//! Rule-driven XML configuration interpreter
//!
//! Walks an XML configuration document, matches every element against a table of
//! tag patterns and lets the bound actions build an in-memory graph of logging
//! components (loggers, appenders, encoders, layouts, filters).
//!
//! ```no_run
//! use octofhir_joran::{JoranConfigurator, LoggerContext};
//!
//! let context = LoggerContext::shared("app");
//! let report = JoranConfigurator::new(context.clone())
//!     .configure_file("logback.xml")
//!     .expect("readable configuration");
//! for diagnostic in report.diagnostics() {
//!     eprintln!("{diagnostic}");
//! }
//! ```

#![warn(missing_docs)]

pub mod action;
pub mod configurator;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod interpreter;
pub mod introspection;
pub mod model;
pub mod pattern;
pub mod registry;

// Re-export main types
pub use configurator::{ConfigurationReport, ConfiguratorOptions, JoranConfigurator};
pub use context::ExecutionContext;
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity, SourceLocation};
pub use error::{ActionError, ActionResult, ConfigError, PropertyError, Result, SubstitutionError};
pub use interpreter::{Interpreter, InterpreterState};
pub use introspection::{Aggregation, PropertyAccessor};
pub use model::{Component, ComponentKind, ComponentRef, Level, Logger, LoggerContext};
pub use pattern::Pattern;
pub use registry::{ActionRegistry, ClassRegistry, RuleStore};
