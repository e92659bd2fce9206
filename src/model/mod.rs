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

//! Component model for configured logging graphs
//!
//! This module provides the component contract the interpreter relies on plus the
//! built-in components a configuration document can instantiate by class name.

pub mod appender;
pub mod component;
pub mod filter;
pub mod layout;
pub mod level;
pub mod logger;
pub mod type_coercion;

pub use appender::{ConsoleAppender, FileAppender};
pub use component::{
    Component, ComponentKind, ComponentRef, LifeCycle, PropertyDescriptor, PropertyKind,
    PropertyValue, ValueType, component_name, component_ref, with_component, with_component_mut,
};
pub use filter::{FilterReply, LevelFilter, ThresholdFilter};
pub use layout::{PatternLayout, PatternLayoutEncoder};
pub use level::{Level, ParseLevelError};
pub use logger::{Logger, LoggerContext, LoggerSnapshot, ROOT_LOGGER_NAME};
pub use type_coercion::{CoercionError, TypeCoercion};
