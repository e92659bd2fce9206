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

//! Pattern layouts and the encoder that wraps them

use super::component::{
    Component, ComponentKind, LifeCycle, PropertyDescriptor, PropertyValue, ValueType,
    wrong_value,
};
use crate::error::PropertyError;
use indexmap::IndexMap;
use std::any::Any;

const LAYOUT_KINDS: &[ComponentKind] = &[ComponentKind::Layout];
const LAYOUT_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::basic("pattern", ValueType::String),
    PropertyDescriptor::basic("outputPatternAsHeader", ValueType::Boolean),
];

/// Conversion words appearing in a layout pattern, in order of appearance
///
/// `%-5level` yields `level`, `%d{HH:mm}` yields `d`, `%%` is a literal percent sign.
pub fn conversion_words(pattern: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            continue;
        }
        while matches!(chars.peek(), Some(c) if *c == '-' || *c == '.' || c.is_ascii_digit()) {
            chars.next();
        }
        let mut word = String::new();
        while let Some(c) = chars.peek().copied().filter(|c| c.is_ascii_alphabetic()) {
            word.push(c);
            chars.next();
        }
        if !word.is_empty() {
            words.push(word);
        }
    }
    words
}

/// Layout driven by a conversion pattern such as `%d %-5level %logger - %msg%n`
#[derive(Debug, Clone, Default)]
pub struct PatternLayout {
    pattern: Option<String>,
    output_pattern_as_header: bool,
    words: Vec<String>,
    active: bool,
}

impl PatternLayout {
    /// Create a layout with no pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a layout with `pattern`
    pub fn with_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Configured pattern
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Conversion words found at activation
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Each conversion word paired with the custom converter class `rules` maps it to;
    /// `None` means the built-in converter handles the word
    pub fn effective_converters<'a>(
        &'a self,
        rules: &'a IndexMap<String, String>,
    ) -> Vec<(&'a str, Option<&'a str>)> {
        self.words
            .iter()
            .map(|word| (word.as_str(), rules.get(word).map(String::as_str)))
            .collect()
    }
}

impl LifeCycle for PatternLayout {
    fn activate(&mut self) -> Result<(), String> {
        match self.pattern.as_deref() {
            Some(pattern) if !pattern.trim().is_empty() => {
                self.words = conversion_words(pattern);
                self.active = true;
                Ok(())
            }
            _ => Err("Empty or null pattern".to_string()),
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Component for PatternLayout {
    fn class_name(&self) -> &'static str {
        "PatternLayout"
    }

    fn kinds(&self) -> &'static [ComponentKind] {
        LAYOUT_KINDS
    }

    fn descriptor(&self) -> &'static [PropertyDescriptor] {
        LAYOUT_PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        match (name, value) {
            ("pattern", PropertyValue::String(pattern)) => self.pattern = Some(pattern),
            ("outputPatternAsHeader", PropertyValue::Boolean(b)) => {
                self.output_pattern_as_header = b
            }
            (name @ ("pattern" | "outputPatternAsHeader"), value) => {
                return Err(wrong_value(name, &value));
            }
            (name, _) => return Err(PropertyError::not_found(name, self.class_name())),
        }
        Ok(())
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "pattern" => self.pattern.clone().map(PropertyValue::String),
            "outputPatternAsHeader" => Some(PropertyValue::Boolean(self.output_pattern_as_header)),
            _ => None,
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

const ENCODER_KINDS: &[ComponentKind] = &[ComponentKind::Encoder];
const ENCODER_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::basic("pattern", ValueType::String),
    PropertyDescriptor::basic("charset", ValueType::String),
    PropertyDescriptor::basic("outputPatternAsHeader", ValueType::Boolean),
];

/// Encoder that formats through an internal [`PatternLayout`]
#[derive(Debug, Clone)]
pub struct PatternLayoutEncoder {
    layout: PatternLayout,
    charset: String,
}

impl Default for PatternLayoutEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternLayoutEncoder {
    /// Create an encoder with no pattern, encoding UTF-8
    pub fn new() -> Self {
        Self {
            layout: PatternLayout::new(),
            charset: "UTF-8".to_string(),
        }
    }

    /// The wrapped layout
    pub fn layout(&self) -> &PatternLayout {
        &self.layout
    }

    /// Output character set
    pub fn charset(&self) -> &str {
        &self.charset
    }
}

impl LifeCycle for PatternLayoutEncoder {
    fn activate(&mut self) -> Result<(), String> {
        if !self.charset.eq_ignore_ascii_case("UTF-8") && !self.charset.eq_ignore_ascii_case("UTF8")
        {
            log::debug!("Charset [{}] recorded as configured", self.charset);
        }
        self.layout.activate()
    }

    fn is_active(&self) -> bool {
        self.layout.is_active()
    }
}

impl Component for PatternLayoutEncoder {
    fn class_name(&self) -> &'static str {
        "PatternLayoutEncoder"
    }

    fn kinds(&self) -> &'static [ComponentKind] {
        ENCODER_KINDS
    }

    fn descriptor(&self) -> &'static [PropertyDescriptor] {
        ENCODER_PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        match (name, value) {
            ("charset", PropertyValue::String(charset)) => {
                self.charset = charset.trim().to_string();
                Ok(())
            }
            ("charset", value) => Err(wrong_value(name, &value)),
            (name, value) => self.layout.set_property(name, value).map_err(|err| match err {
                PropertyError::NotFound { name, .. } => {
                    PropertyError::not_found(name, "PatternLayoutEncoder")
                }
                other => other,
            }),
        }
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "charset" => Some(PropertyValue::String(self.charset.clone())),
            _ => self.layout.property(name),
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

    #[test]
    fn test_conversion_words() {
        assert_eq!(
            conversion_words("%d{HH:mm:ss.SSS} [%thread] %-5level %logger{36} - %msg%n 100%%"),
            vec!["d", "thread", "level", "logger", "msg", "n"]
        );
    }

    #[test]
    fn test_layout_requires_pattern() {
        let mut layout = PatternLayout::new();
        assert!(layout.activate().is_err());

        let mut layout = PatternLayout::with_pattern("%msg%n");
        assert!(layout.activate().is_ok());
        assert_eq!(layout.words(), &["msg", "n"]);
    }

    #[test]
    fn test_effective_converters() {
        let mut layout = PatternLayout::with_pattern("%sample %level");
        layout.activate().unwrap();
        let mut rules = IndexMap::new();
        rules.insert("sample".to_string(), "com.acme.SampleConverter".to_string());
        assert_eq!(
            layout.effective_converters(&rules),
            vec![("sample", Some("com.acme.SampleConverter")), ("level", None)]
        );
    }

    #[test]
    fn test_encoder_forwards_pattern() {
        let mut encoder = PatternLayoutEncoder::new();
        encoder
            .set_property("pattern", PropertyValue::String("%level".into()))
            .unwrap();
        assert_eq!(encoder.layout().pattern(), Some("%level"));
        assert!(encoder.activate().is_ok());
        assert!(encoder.is_active());
    }
}
