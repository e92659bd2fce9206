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

//! Built-in appenders
//!
//! Appenders here are configuration targets: they validate their settings on
//! activation and expose them for inspection. Writing events is the logging
//! runtime's concern.

use super::component::{
    Component, ComponentKind, ComponentRef, LifeCycle, PropertyDescriptor, PropertyValue,
    ValueType, wrong_value,
};
use crate::error::PropertyError;
use std::any::Any;

const APPENDER_KINDS: &[ComponentKind] = &[ComponentKind::Appender];

/// Console targets accepted by [`ConsoleAppender`]
pub const CONSOLE_TARGETS: &[&str] = &["System.out", "System.err"];

/// State shared by every appender
#[derive(Clone, Default)]
pub struct AppenderBase {
    name: Option<String>,
    encoder: Option<ComponentRef>,
    layout: Option<ComponentRef>,
    filters: Vec<ComponentRef>,
    immediate_flush: bool,
    active: bool,
}

impl AppenderBase {
    fn new() -> Self {
        Self {
            immediate_flush: true,
            ..Self::default()
        }
    }

    /// Appender name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Configured encoder
    pub fn encoder(&self) -> Option<&ComponentRef> {
        self.encoder.as_ref()
    }

    /// Configured layout
    pub fn layout(&self) -> Option<&ComponentRef> {
        self.layout.as_ref()
    }

    /// Attached filters in order
    pub fn filters(&self) -> &[ComponentRef] {
        &self.filters
    }

    /// Whether output is flushed after every event
    pub fn immediate_flush(&self) -> bool {
        self.immediate_flush
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), PropertyError>> {
        let result = match (name, value) {
            ("name", PropertyValue::String(s)) => {
                self.name = Some(s.clone());
                Ok(())
            }
            ("immediateFlush", PropertyValue::Boolean(b)) => {
                self.immediate_flush = *b;
                Ok(())
            }
            ("name" | "immediateFlush", _) => Err(wrong_value(name, value)),
            _ => return None,
        };
        Some(result)
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "name" => self.name.clone().map(PropertyValue::String),
            "immediateFlush" => Some(PropertyValue::Boolean(self.immediate_flush)),
            _ => None,
        }
    }

    fn set_component(&mut self, name: &str, child: ComponentRef) -> bool {
        match name {
            "encoder" => self.encoder = Some(child),
            "layout" => self.layout = Some(child),
            _ => return false,
        }
        true
    }

    fn add_component(&mut self, name: &str, child: ComponentRef) -> bool {
        if name == "filter" {
            self.filters.push(child);
            return true;
        }
        false
    }

    fn require_output(&self) -> Result<(), String> {
        if self.encoder.is_none() && self.layout.is_none() {
            return Err(format!(
                "No encoder set for the appender named [{}]",
                self.name.as_deref().unwrap_or("")
            ));
        }
        Ok(())
    }
}

const CONSOLE_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::basic("name", ValueType::String),
    PropertyDescriptor::basic("target", ValueType::Enum(CONSOLE_TARGETS)),
    PropertyDescriptor::basic("immediateFlush", ValueType::Boolean),
    PropertyDescriptor::component("encoder", ComponentKind::Encoder),
    PropertyDescriptor::component("layout", ComponentKind::Layout),
    PropertyDescriptor::collection("filter", ComponentKind::Filter),
];

/// Appender writing to standard output or standard error
#[derive(Clone)]
pub struct ConsoleAppender {
    base: AppenderBase,
    target: &'static str,
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleAppender {
    /// Create an appender targeting `System.out`
    pub fn new() -> Self {
        Self {
            base: AppenderBase::new(),
            target: CONSOLE_TARGETS[0],
        }
    }

    /// Shared appender state
    pub fn base(&self) -> &AppenderBase {
        &self.base
    }

    /// Output stream token
    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl LifeCycle for ConsoleAppender {
    fn activate(&mut self) -> Result<(), String> {
        self.base.require_output()?;
        self.base.active = true;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.base.active
    }
}

impl Component for ConsoleAppender {
    fn class_name(&self) -> &'static str {
        "ConsoleAppender"
    }

    fn kinds(&self) -> &'static [ComponentKind] {
        APPENDER_KINDS
    }

    fn descriptor(&self) -> &'static [PropertyDescriptor] {
        CONSOLE_PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        if let Some(result) = self.base.set_property(name, &value) {
            return result;
        }
        match (name, &value) {
            ("target", PropertyValue::Enum(token)) => {
                self.target = *token;
                Ok(())
            }
            ("target", _) => Err(wrong_value(name, &value)),
            _ => Err(PropertyError::not_found(name, self.class_name())),
        }
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "target" => Some(PropertyValue::Enum(self.target)),
            _ => self.base.property(name),
        }
    }

    fn set_component(&mut self, name: &str, child: ComponentRef) -> Result<(), PropertyError> {
        if self.base.set_component(name, child) {
            Ok(())
        } else {
            Err(PropertyError::not_found(name, self.class_name()))
        }
    }

    fn add_component(&mut self, name: &str, child: ComponentRef) -> Result<(), PropertyError> {
        if self.base.add_component(name, child) {
            Ok(())
        } else {
            Err(PropertyError::not_found(name, self.class_name()))
        }
    }

    fn as_lifecycle(&mut self) -> Option<&mut dyn LifeCycle> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

const FILE_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::basic("name", ValueType::String),
    PropertyDescriptor::basic("file", ValueType::String),
    PropertyDescriptor::basic("append", ValueType::Boolean),
    PropertyDescriptor::basic("prudent", ValueType::Boolean),
    PropertyDescriptor::basic("bufferSize", ValueType::Integer),
    PropertyDescriptor::basic("immediateFlush", ValueType::Boolean),
    PropertyDescriptor::component("encoder", ComponentKind::Encoder),
    PropertyDescriptor::component("layout", ComponentKind::Layout),
    PropertyDescriptor::collection("filter", ComponentKind::Filter),
];

/// Default write buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: i32 = 8192;

/// Appender writing to a file
#[derive(Clone)]
pub struct FileAppender {
    base: AppenderBase,
    file: Option<String>,
    append: bool,
    prudent: bool,
    buffer_size: i32,
}

impl Default for FileAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl FileAppender {
    /// Create an appender in append mode with no file yet
    pub fn new() -> Self {
        Self {
            base: AppenderBase::new(),
            file: None,
            append: true,
            prudent: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Shared appender state
    pub fn base(&self) -> &AppenderBase {
        &self.base
    }

    /// Target file path
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Whether existing content is kept
    pub fn is_append(&self) -> bool {
        self.append
    }

    /// Whether prudent (multi-process safe) mode is on
    pub fn is_prudent(&self) -> bool {
        self.prudent
    }

    /// Write buffer size in bytes
    pub fn buffer_size(&self) -> i32 {
        self.buffer_size
    }
}

impl LifeCycle for FileAppender {
    fn activate(&mut self) -> Result<(), String> {
        let name = self.base.name.as_deref().unwrap_or("");
        match self.file.as_deref() {
            None | Some("") => {
                return Err(format!(r#""File" property not set for appender named [{name}]"#));
            }
            Some(_) => {}
        }
        if self.prudent && !self.append {
            return Err(format!(
                "Setting \"append\" to false is incompatible with prudent mode for appender [{name}]"
            ));
        }
        if self.buffer_size <= 0 {
            return Err(format!("Buffer size must be positive for appender [{name}]"));
        }
        self.base.require_output()?;
        self.base.active = true;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.base.active
    }
}

impl Component for FileAppender {
    fn class_name(&self) -> &'static str {
        "FileAppender"
    }

    fn kinds(&self) -> &'static [ComponentKind] {
        APPENDER_KINDS
    }

    fn descriptor(&self) -> &'static [PropertyDescriptor] {
        FILE_PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        if let Some(result) = self.base.set_property(name, &value) {
            return result;
        }
        match (name, &value) {
            ("file", PropertyValue::String(path)) => self.file = Some(path.trim().to_string()),
            ("append", PropertyValue::Boolean(append)) => self.append = *append,
            ("prudent", PropertyValue::Boolean(prudent)) => self.prudent = *prudent,
            ("bufferSize", PropertyValue::Integer(size)) => self.buffer_size = *size,
            ("file" | "append" | "prudent" | "bufferSize", _) => {
                return Err(wrong_value(name, &value));
            }
            _ => return Err(PropertyError::not_found(name, self.class_name())),
        }
        Ok(())
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "file" => self.file.clone().map(PropertyValue::String),
            "append" => Some(PropertyValue::Boolean(self.append)),
            "prudent" => Some(PropertyValue::Boolean(self.prudent)),
            "bufferSize" => Some(PropertyValue::Integer(self.buffer_size)),
            _ => self.base.property(name),
        }
    }

    fn set_component(&mut self, name: &str, child: ComponentRef) -> Result<(), PropertyError> {
        if self.base.set_component(name, child) {
            Ok(())
        } else {
            Err(PropertyError::not_found(name, self.class_name()))
        }
    }

    fn add_component(&mut self, name: &str, child: ComponentRef) -> Result<(), PropertyError> {
        if self.base.add_component(name, child) {
            Ok(())
        } else {
            Err(PropertyError::not_found(name, self.class_name()))
        }
    }

    fn as_lifecycle(&mut self) -> Option<&mut dyn LifeCycle> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::component::component_ref;
    use crate::model::layout::PatternLayoutEncoder;

    #[test]
    fn test_console_requires_encoder() {
        let mut appender = ConsoleAppender::new();
        appender
            .set_property("name", PropertyValue::String("STDOUT".into()))
            .unwrap();
        let err = appender.activate().unwrap_err();
        assert!(err.contains("STDOUT"));

        appender
            .set_component("encoder", component_ref(PatternLayoutEncoder::new()))
            .unwrap();
        assert!(appender.activate().is_ok());
        assert!(appender.is_active());
    }

    #[test]
    fn test_file_appender_requires_file() {
        let mut appender = FileAppender::new();
        appender
            .set_component("encoder", component_ref(PatternLayoutEncoder::new()))
            .unwrap();
        assert!(appender.activate().is_err());

        appender
            .set_property("file", PropertyValue::String(" app.log ".into()))
            .unwrap();
        assert!(appender.activate().is_ok());
        assert_eq!(appender.file(), Some("app.log"));
    }

    #[test]
    fn test_prudent_conflicts_with_truncate() {
        let mut appender = FileAppender::new();
        appender
            .set_property("file", PropertyValue::String("x.log".into()))
            .unwrap();
        appender
            .set_property("prudent", PropertyValue::Boolean(true))
            .unwrap();
        appender
            .set_property("append", PropertyValue::Boolean(false))
            .unwrap();
        appender
            .set_component("encoder", component_ref(PatternLayoutEncoder::new()))
            .unwrap();
        assert!(appender.activate().is_err());
    }
}
