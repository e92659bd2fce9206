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

//! Generic property access over components
//!
//! [`PropertyAccessor`] resolves element and attribute names against the property
//! descriptors a component publishes, coerces strings into the declared type and
//! dispatches to the component's typed setters and adders. Descriptor indexes are
//! built once per component type and shared through a global cache.

use crate::error::PropertyError;
use crate::model::{
    ComponentKind, ComponentRef, PropertyDescriptor, PropertyKind, PropertyValue, TypeCoercion,
    ValueType,
};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// How a nested element can be attached to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Aggregation {
    /// The parent has no slot of that name
    NotFound,
    /// A single-valued component slot
    AsProperty,
    /// An `add<Name>` style collection
    AsCollection,
}

/// Indexed view of a class's property descriptors
#[derive(Debug)]
pub struct Introspection {
    class_name: &'static str,
    properties: FxHashMap<&'static str, PropertyDescriptor>,
    adders: FxHashMap<String, PropertyDescriptor>,
}

impl Introspection {
    fn build(class_name: &'static str, descriptors: &'static [PropertyDescriptor]) -> Self {
        let mut properties = FxHashMap::default();
        let mut adders = FxHashMap::default();
        for descriptor in descriptors {
            match descriptor.kind {
                PropertyKind::Collection(_) => {
                    adders.insert(format!("add{}", capitalize(descriptor.name)), *descriptor);
                }
                PropertyKind::Basic(_) | PropertyKind::Component(_) => {
                    properties.insert(descriptor.name, *descriptor);
                }
            }
        }
        Self {
            class_name,
            properties,
            adders,
        }
    }

    /// Class these descriptors belong to
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Single-valued property named `name` (already normalized)
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// Collection whose adder is `add<Name>`
    pub fn adder(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.adders.get(&format!("add{}", capitalize(name)))
    }
}

/// Keyed by concrete type; distinct types may share a class name
static INTROSPECTION_CACHE: Lazy<DashMap<TypeId, Arc<Introspection>>> =
    Lazy::new(DashMap::new);

fn introspect(target: &ComponentRef) -> Arc<Introspection> {
    let (type_id, class_name, descriptors) = {
        let component = target.read();
        (
            Any::type_id(component.as_any()),
            component.class_name(),
            component.descriptor(),
        )
    };
    if let Some(cached) = INTROSPECTION_CACHE.get(&type_id) {
        return Arc::clone(&cached);
    }
    INTROSPECTION_CACHE
        .entry(type_id)
        .or_insert_with(|| Arc::new(Introspection::build(class_name, descriptors)))
        .clone()
}

/// Lower the first character unless the first two are both upper case (`URL` stays)
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => {
            name.to_string()
        }
        (Some(first), _) => first.to_lowercase().chain(name.chars().skip(1)).collect(),
        (None, _) => String::new(),
    }
}

/// Upper the first character
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Name-driven access to one component's properties
#[derive(Clone)]
pub struct PropertyAccessor {
    target: ComponentRef,
    introspection: Arc<Introspection>,
}

impl PropertyAccessor {
    /// Create an accessor over `target`
    pub fn new(target: ComponentRef) -> Self {
        let introspection = introspect(&target);
        Self {
            target,
            introspection,
        }
    }

    /// The component being configured
    pub fn target(&self) -> &ComponentRef {
        &self.target
    }

    /// Class of the target
    pub fn class_name(&self) -> &'static str {
        self.introspection.class_name()
    }

    /// Classify how a nested component named `name` would attach
    ///
    /// Collections take priority over a single property of the same name.
    pub fn can_contain_component(&self, name: &str) -> Aggregation {
        if let Some(PropertyDescriptor {
            kind: PropertyKind::Collection(_),
            ..
        }) = self.introspection.adder(name)
        {
            return Aggregation::AsCollection;
        }
        match self.introspection.property(&decapitalize(name)) {
            Some(PropertyDescriptor {
                kind: PropertyKind::Component(_),
                ..
            }) => Aggregation::AsProperty,
            _ => Aggregation::NotFound,
        }
    }

    /// Component kind required by the slot or collection called `name`
    pub fn component_kind(&self, name: &str) -> Option<ComponentKind> {
        if let Some(descriptor) = self.introspection.adder(name) {
            if let PropertyKind::Collection(kind) = descriptor.kind {
                return Some(kind);
            }
        }
        match self.introspection.property(&decapitalize(name))?.kind {
            PropertyKind::Component(kind) => Some(kind),
            _ => None,
        }
    }

    /// Type of the string-settable property called `name`
    pub fn basic_property_type(&self, name: &str) -> Option<ValueType> {
        match self.introspection.property(&decapitalize(name))?.kind {
            PropertyKind::Basic(value_type) => Some(value_type),
            _ => None,
        }
    }

    /// Whether `name` is a string-settable property
    pub fn can_set_property(&self, name: &str) -> bool {
        self.basic_property_type(name).is_some()
    }

    /// Coerce `value` and set the property called `name`
    pub fn set_property(&self, name: &str, value: &str) -> Result<(), PropertyError> {
        let name = decapitalize(name);
        let Some(descriptor) = self.introspection.property(&name) else {
            log::warn!(
                "No such property [{name}] in {}",
                self.introspection.class_name()
            );
            return Err(PropertyError::not_found(name, self.class_name()));
        };
        let value_type = match descriptor.kind {
            PropertyKind::Basic(value_type) => value_type,
            PropertyKind::Component(kind) | PropertyKind::Collection(kind) => {
                return Err(PropertyError::UnsupportedType {
                    name,
                    type_name: kind.to_string(),
                });
            }
        };
        let coerced =
            TypeCoercion::coerce(value, &value_type).map_err(|_| PropertyError::Conversion {
                name: name.clone(),
                value: value.to_string(),
                target_type: value_type.type_name().to_string(),
            })?;
        self.target.write().set_property(&name, coerced)
    }

    /// Read the property called `name`
    pub fn get_property(&self, name: &str) -> Option<PropertyValue> {
        self.target.read().property(&decapitalize(name))
    }

    /// Set the single component slot called `name`
    pub fn set_component(&self, name: &str, child: &ComponentRef) -> Result<(), PropertyError> {
        let name = decapitalize(name);
        let kind = match self.introspection.property(&name).map(|d| d.kind) {
            Some(PropertyKind::Component(kind)) => kind,
            _ => return Err(PropertyError::not_found(name, self.class_name())),
        };
        self.check_assignable(&name, kind, child)?;
        self.target.write().set_component(&name, Arc::clone(child))
    }

    /// Add `child` to the collection whose adder is `add<Name>`
    pub fn add_component(&self, name: &str, child: &ComponentRef) -> Result<(), PropertyError> {
        let (property, kind) = match self.introspection.adder(name) {
            Some(PropertyDescriptor {
                name,
                kind: PropertyKind::Collection(kind),
            }) => (*name, *kind),
            _ => return Err(PropertyError::not_found(decapitalize(name), self.class_name())),
        };
        self.check_assignable(property, kind, child)?;
        self.target.write().add_component(property, Arc::clone(child))
    }

    /// Attach `child` according to a classification made earlier
    pub fn attach(
        &self,
        aggregation: Aggregation,
        name: &str,
        child: &ComponentRef,
    ) -> Result<(), PropertyError> {
        match aggregation {
            Aggregation::AsProperty => self.set_component(name, child),
            Aggregation::AsCollection => self.add_component(name, child),
            Aggregation::NotFound => Err(PropertyError::not_found(name, self.class_name())),
        }
    }

    fn check_assignable(
        &self,
        name: &str,
        kind: ComponentKind,
        child: &ComponentRef,
    ) -> Result<(), PropertyError> {
        if Arc::ptr_eq(&self.target, child) {
            return Err(PropertyError::Rejected {
                name: name.to_string(),
                message: "a component cannot contain itself".to_string(),
            });
        }
        let child = child.read();
        if child.is_kind(kind) {
            Ok(())
        } else {
            Err(PropertyError::TypeMismatch {
                name: name.to_string(),
                expected: kind.to_string(),
                actual: child.class_name().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Component, ConsoleAppender, LifeCycle, PatternLayoutEncoder, ThresholdFilter,
        component_ref, with_component,
    };
    use std::any::Any;

    const ROLLING_PROPERTIES: &[PropertyDescriptor] = &[
        PropertyDescriptor::basic("maxFileSize", ValueType::Integer),
        PropertyDescriptor::basic("append", ValueType::Boolean),
        PropertyDescriptor::component("filter", ComponentKind::Filter),
        PropertyDescriptor::collection("filter", ComponentKind::Filter),
    ];

    #[derive(Default)]
    struct SizeCapped {
        max_file_size: i32,
        append: bool,
        single: Option<ComponentRef>,
        many: Vec<ComponentRef>,
    }

    impl Component for SizeCapped {
        fn class_name(&self) -> &'static str {
            "SizeCapped"
        }

        fn kinds(&self) -> &'static [ComponentKind] {
            &[ComponentKind::Other]
        }

        fn descriptor(&self) -> &'static [PropertyDescriptor] {
            ROLLING_PROPERTIES
        }

        fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
            match (name, value) {
                ("maxFileSize", PropertyValue::Integer(size)) => self.max_file_size = size,
                ("append", PropertyValue::Boolean(append)) => self.append = append,
                (name, _) => return Err(PropertyError::not_found(name, "SizeCapped")),
            }
            Ok(())
        }

        fn set_component(&mut self, _name: &str, child: ComponentRef) -> Result<(), PropertyError> {
            self.single = Some(child);
            Ok(())
        }

        fn add_component(&mut self, _name: &str, child: ComponentRef) -> Result<(), PropertyError> {
            self.many.push(child);
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    /// Publishes the same class name as [`SizeCapped`] with fewer properties
    #[derive(Default)]
    struct PlainSizeCapped {
        append: bool,
    }

    impl Component for PlainSizeCapped {
        fn class_name(&self) -> &'static str {
            "SizeCapped"
        }

        fn kinds(&self) -> &'static [ComponentKind] {
            &[ComponentKind::Other]
        }

        fn descriptor(&self) -> &'static [PropertyDescriptor] {
            const PROPERTIES: &[PropertyDescriptor] =
                &[PropertyDescriptor::basic("append", ValueType::Boolean)];
            PROPERTIES
        }

        fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
            match (name, value) {
                ("append", PropertyValue::Boolean(append)) => self.append = append,
                (name, _) => return Err(PropertyError::not_found(name, "SizeCapped")),
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn accessor() -> PropertyAccessor {
        PropertyAccessor::new(component_ref(SizeCapped::default()))
    }

    #[test]
    fn test_integer_and_boolean_coercion() {
        let accessor = accessor();
        accessor.set_property("maxFileSize", "100").unwrap();
        accessor.set_property("Append", "TRUE").unwrap();

        let (size, append) =
            with_component(accessor.target(), |c: &SizeCapped| (c.max_file_size, c.append))
                .unwrap();
        assert_eq!(size, 100);
        assert!(append);
    }

    #[test]
    fn test_unparseable_value_leaves_field_unchanged() {
        let accessor = accessor();
        accessor.set_property("maxFileSize", "7").unwrap();
        let err = accessor.set_property("maxFileSize", "lots").unwrap_err();
        assert!(matches!(err, PropertyError::Conversion { .. }));
        assert_eq!(
            with_component(accessor.target(), |c: &SizeCapped| c.max_file_size),
            Some(7)
        );
    }

    #[test]
    fn test_missing_property_is_reported() {
        let err = accessor().set_property("colour", "red").unwrap_err();
        assert!(matches!(err, PropertyError::NotFound { .. }));
    }

    #[test]
    fn test_collection_takes_priority_over_property() {
        let accessor = accessor();
        assert_eq!(accessor.can_contain_component("filter"), Aggregation::AsCollection);
        assert_eq!(accessor.can_contain_component("append"), Aggregation::NotFound);
        assert_eq!(accessor.can_contain_component("unknown"), Aggregation::NotFound);
    }

    #[test]
    fn test_component_slots_on_appender() {
        let appender = PropertyAccessor::new(component_ref(ConsoleAppender::new()));
        assert_eq!(appender.can_contain_component("encoder"), Aggregation::AsProperty);
        assert_eq!(appender.can_contain_component("Encoder"), Aggregation::AsProperty);
        assert_eq!(appender.can_contain_component("filter"), Aggregation::AsCollection);
        assert_eq!(appender.component_kind("encoder"), Some(ComponentKind::Encoder));
        assert!(appender.can_set_property("target"));
        assert!(!appender.can_set_property("encoder"));
    }

    #[test]
    fn test_type_mismatch_is_recoverable() {
        let appender = PropertyAccessor::new(component_ref(ConsoleAppender::new()));
        let filter = component_ref(ThresholdFilter::new());
        let err = appender.set_component("encoder", &filter).unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));

        let encoder = component_ref(PatternLayoutEncoder::new());
        appender.set_component("encoder", &encoder).unwrap();
        appender.add_component("filter", &filter).unwrap();
        let attached = with_component(appender.target(), |c: &ConsoleAppender| {
            (c.base().encoder().is_some(), c.base().filters().len())
        });
        assert_eq!(attached, Some((true, 1)));
    }

    #[test]
    fn test_enum_property() {
        let appender = PropertyAccessor::new(component_ref(ConsoleAppender::new()));
        appender.set_property("target", "system.err").unwrap();
        assert_eq!(
            appender.get_property("target"),
            Some(PropertyValue::Enum("System.err"))
        );
        assert!(appender.set_property("target", "printer").is_err());
    }

    #[test]
    fn test_component_cannot_contain_itself() {
        let target = component_ref(SizeCapped::default());
        let accessor = PropertyAccessor::new(target.clone());
        assert!(accessor.add_component("filter", &target).is_err());
    }

    #[test]
    fn test_name_normalization() {
        assert_eq!(decapitalize("FooBar"), "fooBar");
        assert_eq!(decapitalize("URL"), "URL");
        assert_eq!(decapitalize(""), "");
        assert_eq!(capitalize("filter"), "Filter");
    }

    #[test]
    fn test_lifecycle_reachable_through_component() {
        let encoder = component_ref(PatternLayoutEncoder::new());
        let mut guard = encoder.write();
        let lifecycle: &mut dyn LifeCycle = guard.as_lifecycle().unwrap();
        assert!(!lifecycle.is_active());
    }

    #[test]
    fn test_shared_class_name_keeps_separate_descriptors() {
        let plain = PropertyAccessor::new(component_ref(PlainSizeCapped::default()));
        let full = accessor();

        assert!(!plain.can_set_property("maxFileSize"));
        assert_eq!(plain.can_contain_component("filter"), Aggregation::NotFound);
        assert!(full.can_set_property("maxFileSize"));
        assert_eq!(full.can_contain_component("filter"), Aggregation::AsCollection);

        plain.set_property("append", "true").unwrap();
        assert!(matches!(
            plain.set_property("maxFileSize", "10").unwrap_err(),
            PropertyError::NotFound { .. }
        ));
        assert_eq!(
            with_component(plain.target(), |c: &PlainSizeCapped| c.append),
            Some(true)
        );
    }
}
