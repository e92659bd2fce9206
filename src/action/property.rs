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

//! Substitution property definitions

use super::{ActionData, Attributes, attribute};
use crate::action::Action;
use crate::context::ExecutionContext;
use crate::diagnostics::DiagnosticCode;
use crate::error::{ActionResult, ConfigError};

/// Where a property definition is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// This run only
    Local,
    /// The logger context, outliving the run
    Context,
}

impl Scope {
    fn parse(ic: &mut ExecutionContext, scope: Option<&str>) -> Self {
        match scope {
            None => Scope::Local,
            Some(s) if s.eq_ignore_ascii_case("local") => Scope::Local,
            Some(s) if s.eq_ignore_ascii_case("context") || s.eq_ignore_ascii_case("system") => {
                Scope::Context
            }
            Some(other) => {
                ic.add_warning(
                    DiagnosticCode::InvalidAttributes,
                    format!("Unknown property scope [{other}], using local scope"),
                );
                Scope::Local
            }
        }
    }
}

/// Defines substitution properties, from `name` + `value` or from a properties `file`
#[derive(Debug, Default)]
pub struct PropertyAction;

impl PropertyAction {
    fn define(ic: &mut ExecutionContext, scope: Scope, key: &str, value: &str) {
        ic.add_property(key, value);
        if scope == Scope::Context {
            ic.with_logger_context_mut(|context| {
                context.put_property(key.trim(), value.trim());
            });
        }
    }

    fn load_file(
        ic: &mut ExecutionContext,
        scope: Scope,
        path: &str,
    ) -> Result<usize, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        let properties = parse_properties(&content);
        for (key, value) in &properties {
            Self::define(ic, scope, key, value);
        }
        Ok(properties.len())
    }
}

impl Action for PropertyAction {
    fn name(&self) -> &'static str {
        "PropertyAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let name = attribute(ic, attributes, "name")?;
        let value = attribute(ic, attributes, "value")?;
        let file = attribute(ic, attributes, "file")?;
        let scope = attribute(ic, attributes, "scope")?;
        let scope = Scope::parse(ic, scope.as_deref());

        match (name, value, file) {
            (Some(name), Some(value), None) => {
                Self::define(ic, scope, &name, &value);
                Ok(None)
            }
            (None, None, Some(file)) => {
                let count = Self::load_file(ic, scope, &file)?;
                ic.add_info(format!("Loaded {count} properties from [{file}]"));
                Ok(None)
            }
            _ => Err(ConfigError::InvalidAttributes {
                element: element.to_string(),
                message: format!(
                    "In <{element}> element, either the \"file\" attribute alone, or the \"name\" and \"value\" attributes must be set"
                ),
            }
            .into()),
        }
    }

    fn end(&self, _ic: &mut ExecutionContext, _element: &str, _data: Option<ActionData>) -> ActionResult {
        Ok(())
    }
}

/// Parse Java-style `.properties` text into key/value pairs in file order
///
/// Supports `=`, `:` and whitespace separators, `#`/`!` comments, trailing-backslash
/// line continuations and the usual escapes including `\uXXXX`.
pub fn parse_properties(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        pairs.push((unescape(key), unescape(value.trim_start())));
    }
    pairs
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..index], &line[index + 1..]),
            c if c.is_whitespace() => {
                let rest = line[index..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..index], rest);
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => output.push('\t'),
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('f') => output.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => output.push(decoded),
                    None => {
                        output.push_str("\\u");
                        output.push_str(&hex);
                    }
                }
            }
            Some(other) => output.push(other),
            None => {}
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_support::{attrs, context_with_root};
    use crate::error::ActionError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_properties() {
        let content = "# comment\n! also comment\n\na=1\nb : two\nc three\nlong = first \\\n    second\nescaped\\=key=x\\ty\nunicode=\\u0041\nempty\n";
        assert_eq!(
            parse_properties(content),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two".to_string()),
                ("c".to_string(), "three".to_string()),
                ("long".to_string(), "first second".to_string()),
                ("escaped=key".to_string(), "x\ty".to_string()),
                ("unicode".to_string(), "A".to_string()),
                ("empty".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_name_and_value() {
        let (mut ic, context) = context_with_root();
        PropertyAction
            .begin(&mut ic, "property", &attrs(&[("name", "dir"), ("value", " /var/log ")]))
            .unwrap();
        PropertyAction
            .begin(
                &mut ic,
                "property",
                &attrs(&[("name", "file"), ("value", "${dir}/app.log"), ("scope", "context")]),
            )
            .unwrap();
        assert_eq!(ic.property("dir"), Some("/var/log"));
        assert_eq!(ic.property("file"), Some("/var/log/app.log"));
        assert_eq!(context.read().property("file"), Some("/var/log/app.log"));
        assert_eq!(context.read().property("dir"), None);
    }

    #[test]
    fn test_attribute_forms_are_exclusive() {
        let (mut ic, _) = context_with_root();
        for pairs in [
            vec![("name", "a"), ("value", "b"), ("file", "x.properties")],
            vec![],
            vec![("name", "a")],
        ] {
            let err = PropertyAction
                .begin(&mut ic, "property", &attrs(&pairs))
                .unwrap_err();
            assert!(matches!(
                err,
                ActionError::Failed(ConfigError::InvalidAttributes { .. })
            ));
        }
    }

    #[test]
    fn test_file_form() {
        let path = std::env::temp_dir().join(format!("joran-props-{}.properties", std::process::id()));
        std::fs::write(&path, "level=WARN\nname = app\n").unwrap();

        let (mut ic, _) = context_with_root();
        PropertyAction
            .begin(
                &mut ic,
                "property",
                &attrs(&[("file", path.to_str().unwrap())]),
            )
            .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(ic.property("level"), Some("WARN"));
        assert_eq!(ic.property("name"), Some("app"));
    }

    #[test]
    fn test_missing_file() {
        let (mut ic, _) = context_with_root();
        let err = PropertyAction
            .begin(&mut ic, "property", &attrs(&[("file", "/nonexistent/joran.properties")]))
            .unwrap_err();
        assert!(matches!(err, ActionError::Failed(ConfigError::Io { .. })));
    }
}
