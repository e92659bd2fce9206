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

//! The contract every configurable component satisfies
//!
//! Instead of runtime reflection each component type publishes a static list of
//! [`PropertyDescriptor`]s and dispatches typed setters and adders by name. The
//! [`crate::introspection::PropertyAccessor`] builds on top of this.

use super::level::Level;
use crate::error::PropertyError;
use parking_lot::RwLock;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a component under construction or in the finished graph
pub type ComponentRef = Arc<RwLock<dyn Component>>;

/// Supertypes a component can satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComponentKind {
    /// The root logger context
    Context,
    /// A logger
    Logger,
    /// Output destination for events
    Appender,
    /// Turns events into bytes
    Encoder,
    /// Turns events into strings
    Layout,
    /// Accepts or rejects events
    Filter,
    /// Anything else
    Other,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Context => "Context",
            ComponentKind::Logger => "Logger",
            ComponentKind::Appender => "Appender",
            ComponentKind::Encoder => "Encoder",
            ComponentKind::Layout => "Layout",
            ComponentKind::Filter => "Filter",
            ComponentKind::Other => "Object",
        };
        f.write_str(name)
    }
}

/// Types a basic property can be coerced into from a string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Kept as-is
    String,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    Long,
    /// `true` / `false`, case-insensitive
    Boolean,
    /// A [`Level`]
    Level,
    /// One of a fixed set of tokens, case-insensitive
    Enum(&'static [&'static str]),
}

impl ValueType {
    /// Name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueType::String => "String",
            ValueType::Integer => "int",
            ValueType::Long => "long",
            ValueType::Boolean => "boolean",
            ValueType::Level => "Level",
            ValueType::Enum(_) => "enum",
        }
    }
}

/// A coerced property value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// String value
    String(String),
    /// 32-bit integer value
    Integer(i32),
    /// 64-bit integer value
    Long(i64),
    /// Boolean value
    Boolean(bool),
    /// Level value
    Level(Level),
    /// Canonical enum token
    Enum(&'static str),
}

impl PropertyValue {
    /// Borrow the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            PropertyValue::Enum(token) => Some(token),
            _ => None,
        }
    }

    /// The boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The level payload
    pub fn as_level(&self) -> Option<Level> {
        match self {
            PropertyValue::Level(level) => Some(*level),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Long(l) => write!(f, "{l}"),
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Level(level) => write!(f, "{level}"),
            PropertyValue::Enum(token) => f.write_str(token),
        }
    }
}

/// What a named property accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Settable from a string
    Basic(ValueType),
    /// A single nested component
    Component(ComponentKind),
    /// Any number of nested components, added one at a time
    Collection(ComponentKind),
}

/// A named property published by a component type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Property name in lower camel case
    pub name: &'static str,
    /// Accepted values
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    /// Describe a string-settable property
    pub const fn basic(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            kind: PropertyKind::Basic(value_type),
        }
    }

    /// Describe a single nested component slot
    pub const fn component(name: &'static str, kind: ComponentKind) -> Self {
        Self {
            name,
            kind: PropertyKind::Component(kind),
        }
    }

    /// Describe a collection of nested components
    pub const fn collection(name: &'static str, kind: ComponentKind) -> Self {
        Self {
            name,
            kind: PropertyKind::Collection(kind),
        }
    }
}

/// Second phase of two-phase construction
pub trait LifeCycle {
    /// Called once every property and child is set; returns the reason on refusal
    fn activate(&mut self) -> Result<(), String>;

    /// Whether activation succeeded
    fn is_active(&self) -> bool;
}

/// A configurable component
pub trait Component: Any + Send + Sync {
    /// Name this component was registered under
    fn class_name(&self) -> &'static str;

    /// Supertypes this component satisfies
    fn kinds(&self) -> &'static [ComponentKind];

    /// Published properties
    fn descriptor(&self) -> &'static [PropertyDescriptor] {
        &[]
    }

    /// Set an already-coerced basic property
    fn set_property(&mut self, name: &str, _value: PropertyValue) -> Result<(), PropertyError> {
        Err(PropertyError::not_found(name, self.class_name()))
    }

    /// Read a basic property
    fn property(&self, _name: &str) -> Option<PropertyValue> {
        None
    }

    /// Set a single nested component
    fn set_component(&mut self, name: &str, _child: ComponentRef) -> Result<(), PropertyError> {
        Err(PropertyError::not_found(name, self.class_name()))
    }

    /// Add one element to a component collection
    fn add_component(&mut self, name: &str, _child: ComponentRef) -> Result<(), PropertyError> {
        Err(PropertyError::not_found(name, self.class_name()))
    }

    /// Activation hook, for components that have one
    fn as_lifecycle(&mut self) -> Option<&mut dyn LifeCycle> {
        None
    }

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether this component satisfies `kind`
    fn is_kind(&self, kind: ComponentKind) -> bool {
        self.kinds().contains(&kind)
    }
}

/// Wrap a component in a shared handle
pub fn component_ref<C: Component>(component: C) -> ComponentRef {
    Arc::new(RwLock::new(component))
}

/// Run `f` against the concrete type behind `component`, if it matches
pub fn with_component<T: Component, R>(
    component: &ComponentRef,
    f: impl FnOnce(&T) -> R,
) -> Option<R> {
    let guard = component.read();
    guard.as_any().downcast_ref::<T>().map(f)
}

/// Run `f` against the concrete type behind `component` mutably, if it matches
pub fn with_component_mut<T: Component, R>(
    component: &ComponentRef,
    f: impl FnOnce(&mut T) -> R,
) -> Option<R> {
    let mut guard = component.write();
    guard.as_any_mut().downcast_mut::<T>().map(f)
}

/// The `name` property of a component, used for appender bookkeeping
pub fn component_name(component: &ComponentRef) -> Option<String> {
    component
        .read()
        .property("name")
        .and_then(|value| value.as_str().map(str::to_string))
}

/// Shorthand used by component implementations to reject a value of the wrong shape
pub(crate) fn wrong_value(name: &str, value: &PropertyValue) -> PropertyError {
    PropertyError::Rejected {
        name: name.to_string(),
        message: format!("unexpected value '{value}'"),
    }
}
