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

//! String to property value coercion

use super::component::{PropertyValue, ValueType};
use super::level::Level;
use thiserror::Error;

/// Result type for type coercion operations
pub type CoercionResult<T> = Result<T, CoercionError>;

/// Errors that can occur during type coercion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// The value format is invalid for the target type
    #[error("Invalid format '{value}' for type {target_type}")]
    InvalidFormat {
        /// Offending input
        value: String,
        /// Target type name
        target_type: String,
    },
}

/// Type coercion utility for configuration strings
pub struct TypeCoercion;

impl TypeCoercion {
    /// Coerce `value` into `target_type`
    pub fn coerce(value: &str, target_type: &ValueType) -> CoercionResult<PropertyValue> {
        match target_type {
            ValueType::String => Ok(PropertyValue::String(value.to_string())),
            ValueType::Integer => Self::coerce_to_integer(value),
            ValueType::Long => Self::coerce_to_long(value),
            ValueType::Boolean => Self::coerce_to_boolean(value),
            ValueType::Level => Self::coerce_to_level(value),
            ValueType::Enum(tokens) => Self::coerce_to_enum(value, tokens),
        }
    }

    /// Coerce to a 32-bit integer
    pub fn coerce_to_integer(value: &str) -> CoercionResult<PropertyValue> {
        value
            .trim()
            .parse::<i32>()
            .map(PropertyValue::Integer)
            .map_err(|_| invalid(value, ValueType::Integer))
    }

    /// Coerce to a 64-bit integer
    pub fn coerce_to_long(value: &str) -> CoercionResult<PropertyValue> {
        value
            .trim()
            .parse::<i64>()
            .map(PropertyValue::Long)
            .map_err(|_| invalid(value, ValueType::Long))
    }

    /// Coerce to a boolean; only `true` and `false` are accepted, in any case
    pub fn coerce_to_boolean(value: &str) -> CoercionResult<PropertyValue> {
        let token = value.trim();
        if token.eq_ignore_ascii_case("true") {
            Ok(PropertyValue::Boolean(true))
        } else if token.eq_ignore_ascii_case("false") {
            Ok(PropertyValue::Boolean(false))
        } else {
            Err(invalid(value, ValueType::Boolean))
        }
    }

    /// Coerce to a level
    pub fn coerce_to_level(value: &str) -> CoercionResult<PropertyValue> {
        value
            .parse::<Level>()
            .map(PropertyValue::Level)
            .map_err(|_| invalid(value, ValueType::Level))
    }

    /// Coerce to one of `tokens`, returning the canonical spelling
    pub fn coerce_to_enum(
        value: &str,
        tokens: &'static [&'static str],
    ) -> CoercionResult<PropertyValue> {
        let token = value.trim();
        tokens
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(token))
            .map(|candidate| PropertyValue::Enum(*candidate))
            .ok_or_else(|| CoercionError::InvalidFormat {
                value: value.to_string(),
                target_type: format!("one of [{}]", tokens.join(", ")),
            })
    }
}

fn invalid(value: &str, target_type: ValueType) -> CoercionError {
    CoercionError::InvalidFormat {
        value: value.to_string(),
        target_type: target_type.type_name().to_string(),
    }
}
