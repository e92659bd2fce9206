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

//! `${...}` variable substitution
//!
//! References may nest inside keys (`${a${b}}`) and defaults (`${a:-${b}}`); resolved
//! values are expanded again, with self-referencing chains rejected.

use crate::error::SubstitutionError;

const OPEN: &str = "${";
const CLOSE: char = '}';
const DEFAULT_SEPARATOR: &str = ":-";

/// Source of variable values
pub trait PropertyLookup {
    /// Value of `key`, if defined anywhere
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<F> PropertyLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Expand every `${key}` and `${key:-default}` in `input`
///
/// Undefined keys without a default expand to the empty string.
pub fn substitute(input: &str, lookup: &dyn PropertyLookup) -> Result<String, SubstitutionError> {
    Substitutor {
        lookup,
        resolving: Vec::new(),
    }
    .expand(input)
}

struct Substitutor<'a> {
    lookup: &'a dyn PropertyLookup,
    resolving: Vec<String>,
}

impl Substitutor<'_> {
    fn expand(&mut self, input: &str) -> Result<String, SubstitutionError> {
        if !input.contains(OPEN) {
            return Ok(input.to_string());
        }

        let mut output = String::with_capacity(input.len());
        let mut cursor = 0;
        while let Some(found) = input[cursor..].find(OPEN) {
            let start = cursor + found;
            output.push_str(&input[cursor..start]);

            let end = matching_close(input, start).ok_or_else(|| {
                SubstitutionError::Unterminated {
                    input: input.to_string(),
                    offset: start,
                }
            })?;
            let reference = &input[start + OPEN.len()..end];
            let (key, default) = split_default(reference);

            let key = self.expand(key)?;
            match self.resolve(&key)? {
                Some(value) => output.push_str(&value),
                None => {
                    if let Some(default) = default {
                        let default = self.expand(default)?;
                        output.push_str(&default);
                    }
                }
            }
            cursor = end + CLOSE.len_utf8();
        }
        output.push_str(&input[cursor..]);
        Ok(output)
    }

    fn resolve(&mut self, key: &str) -> Result<Option<String>, SubstitutionError> {
        if self.resolving.iter().any(|k| k == key) {
            let mut chain = self.resolving.clone();
            chain.push(key.to_string());
            return Err(SubstitutionError::Circular {
                chain: chain
                    .iter()
                    .map(|k| format!("${{{k}}}"))
                    .collect::<Vec<_>>()
                    .join(" --> "),
            });
        }
        let Some(raw) = self.lookup.lookup(key) else {
            return Ok(None);
        };
        self.resolving.push(key.to_string());
        let expanded = self.expand(&raw);
        self.resolving.pop();
        expanded.map(Some)
    }
}

/// Byte offset of the `}` closing the reference opened at `start`
fn matching_close(input: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut index = start;
    while index < input.len() {
        let rest = &input[index..];
        if rest.starts_with(OPEN) {
            depth += 1;
            index += OPEN.len();
            continue;
        }
        let c = rest.chars().next()?;
        if c == CLOSE {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
        index += c.len_utf8();
    }
    None
}

/// Split `key:-default` at the first separator outside nested references
fn split_default(reference: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    let mut index = 0;
    while index < reference.len() {
        let rest = &reference[index..];
        if rest.starts_with(OPEN) {
            depth += 1;
            index += OPEN.len();
            continue;
        }
        if depth == 0 && rest.starts_with(DEFAULT_SEPARATOR) {
            return (
                &reference[..index],
                Some(&reference[index + DEFAULT_SEPARATOR.len()..]),
            );
        }
        let Some(c) = rest.chars().next() else { break };
        if c == CLOSE {
            depth = depth.saturating_sub(1);
        }
        index += c.len_utf8();
    }
    (reference, None)
}
