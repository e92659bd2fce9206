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

//! Level based event filters

use super::component::{
    Component, ComponentKind, LifeCycle, PropertyDescriptor, PropertyValue, ValueType,
    wrong_value,
};
use super::level::Level;
use crate::error::PropertyError;
use std::any::Any;

const FILTER_KINDS: &[ComponentKind] = &[ComponentKind::Filter];

/// Filter decision tokens
pub const FILTER_REPLIES: &[&str] = &["ACCEPT", "DENY", "NEUTRAL"];

/// Outcome of a filter decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReply {
    /// Accept without consulting later filters
    Accept,
    /// Drop the event
    Deny,
    /// Let the next filter decide
    Neutral,
}

impl FilterReply {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "ACCEPT" => Some(FilterReply::Accept),
            "DENY" => Some(FilterReply::Deny),
            "NEUTRAL" => Some(FilterReply::Neutral),
            _ => None,
        }
    }

    fn token(self) -> &'static str {
        match self {
            FilterReply::Accept => "ACCEPT",
            FilterReply::Deny => "DENY",
            FilterReply::Neutral => "NEUTRAL",
        }
    }
}

const THRESHOLD_PROPERTIES: &[PropertyDescriptor] =
    &[PropertyDescriptor::basic("level", ValueType::Level)];

/// Denies events below a threshold level
#[derive(Debug, Clone, Default)]
pub struct ThresholdFilter {
    level: Option<Level>,
    active: bool,
}

impl ThresholdFilter {
    /// Create a filter with no threshold yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured threshold
    pub fn level(&self) -> Option<Level> {
        self.level
    }

    /// Decide for an event at `level`
    pub fn decide(&self, level: Level) -> FilterReply {
        match self.level {
            Some(threshold) if self.active && level < threshold => FilterReply::Deny,
            _ => FilterReply::Neutral,
        }
    }
}

impl LifeCycle for ThresholdFilter {
    fn activate(&mut self) -> Result<(), String> {
        if self.level.is_none() {
            return Err("No level set for ThresholdFilter".to_string());
        }
        self.active = true;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Component for ThresholdFilter {
    fn class_name(&self) -> &'static str {
        "ThresholdFilter"
    }

    fn kinds(&self) -> &'static [ComponentKind] {
        FILTER_KINDS
    }

    fn descriptor(&self) -> &'static [PropertyDescriptor] {
        THRESHOLD_PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        match (name, &value) {
            ("level", PropertyValue::Level(level)) => {
                self.level = Some(*level);
                Ok(())
            }
            ("level", _) => Err(wrong_value(name, &value)),
            _ => Err(PropertyError::not_found(name, self.class_name())),
        }
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "level" => self.level.map(PropertyValue::Level),
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

const LEVEL_FILTER_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::basic("level", ValueType::Level),
    PropertyDescriptor::basic("onMatch", ValueType::Enum(FILTER_REPLIES)),
    PropertyDescriptor::basic("onMismatch", ValueType::Enum(FILTER_REPLIES)),
];

/// Matches events of exactly one level
#[derive(Debug, Clone)]
pub struct LevelFilter {
    level: Option<Level>,
    on_match: FilterReply,
    on_mismatch: FilterReply,
    active: bool,
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelFilter {
    /// Create a filter answering `NEUTRAL` both ways
    pub fn new() -> Self {
        Self {
            level: None,
            on_match: FilterReply::Neutral,
            on_mismatch: FilterReply::Neutral,
            active: false,
        }
    }

    /// Decide for an event at `level`
    pub fn decide(&self, level: Level) -> FilterReply {
        if !self.active {
            return FilterReply::Neutral;
        }
        if self.level == Some(level) {
            self.on_match
        } else {
            self.on_mismatch
        }
    }
}

impl LifeCycle for LevelFilter {
    fn activate(&mut self) -> Result<(), String> {
        if self.level.is_none() {
            return Err("No level set for LevelFilter".to_string());
        }
        self.active = true;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Component for LevelFilter {
    fn class_name(&self) -> &'static str {
        "LevelFilter"
    }

    fn kinds(&self) -> &'static [ComponentKind] {
        FILTER_KINDS
    }

    fn descriptor(&self) -> &'static [PropertyDescriptor] {
        LEVEL_FILTER_PROPERTIES
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        match (name, &value) {
            ("level", PropertyValue::Level(level)) => self.level = Some(*level),
            ("onMatch", PropertyValue::Enum(token)) => {
                self.on_match = FilterReply::from_token(token).ok_or_else(|| wrong_value(name, &value))?
            }
            ("onMismatch", PropertyValue::Enum(token)) => {
                self.on_mismatch =
                    FilterReply::from_token(token).ok_or_else(|| wrong_value(name, &value))?
            }
            ("level" | "onMatch" | "onMismatch", _) => return Err(wrong_value(name, &value)),
            _ => return Err(PropertyError::not_found(name, self.class_name())),
        }
        Ok(())
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "level" => self.level.map(PropertyValue::Level),
            "onMatch" => Some(PropertyValue::Enum(self.on_match.token())),
            "onMismatch" => Some(PropertyValue::Enum(self.on_mismatch.token())),
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
