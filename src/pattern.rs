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

//! Element paths and rule patterns
//!
//! The same type serves as the live nesting path maintained by the interpreter and as
//! the key under which rules are registered. A registered pattern whose first part is
//! [`WILDCARD`] matches any path ending in the remaining parts.

use smallvec::SmallVec;
use std::fmt;

/// The "any depth" marker allowed as the first part of a registered pattern
pub const WILDCARD: &str = "*";

/// Ordered sequence of tag names
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pattern {
    parts: SmallVec<[String; 8]>,
}

impl Pattern {
    /// Create an empty pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `/`-separated pattern such as `configuration/appender` or `*/param`
    pub fn parse(pattern: &str) -> Self {
        pattern
            .split('/')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect()
    }

    /// Append a tag
    pub fn push(&mut self, tag: impl Into<String>) {
        self.parts.push(tag.into());
    }

    /// Remove and return the last tag
    pub fn pop(&mut self) -> Option<String> {
        self.parts.pop()
    }

    /// The last tag, if any
    pub fn peek_last(&self) -> Option<&str> {
        self.parts.last().map(String::as_str)
    }

    /// Tag at `index`
    pub fn get(&self, index: usize) -> Option<&str> {
        self.parts.get(index).map(String::as_str)
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the pattern has no tags
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// All tags in order
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Whether this is a registered wildcard pattern (`*` followed by at least one tag)
    pub fn is_wildcard(&self) -> bool {
        self.parts.len() > 1 && self.parts[0] == WILDCARD
    }

    /// Length of the suffix of `self` matched by the tail of a wildcard `candidate`
    ///
    /// Returns 0 when `candidate` is not a wildcard pattern, when its tail is longer
    /// than `self`, or when any part of the tail differs from the corresponding suffix.
    pub fn tail_match(&self, candidate: &Pattern) -> usize {
        if !candidate.is_wildcard() {
            return 0;
        }
        let tail = &candidate.parts[1..];
        if tail.len() > self.parts.len() {
            return 0;
        }
        let suffix = &self.parts[self.parts.len() - tail.len()..];
        if suffix == tail { tail.len() } else { 0 }
    }
}

impl<S: Into<String>> FromIterator<S> for Pattern {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&str> for Pattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            write!(f, "[{part}]")?;
        }
        Ok(())
    }
}
