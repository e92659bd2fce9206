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

//! Name-keyed registries used while interpreting a configuration
//!
//! - [`RuleStore`] maps tag patterns to the actions bound to them
//! - [`ActionRegistry`] turns action class names into shared action instances
//! - [`ClassRegistry`] turns component class names into fresh components

pub mod action_registry;
pub mod class_registry;
pub mod rule_store;

pub use action_registry::{ActionFactory, ActionRegistry};
pub use class_registry::{ClassRegistry, ComponentFactory};
pub use rule_store::RuleStore;
