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

//! Pattern to action bindings

use super::ActionRegistry;
use crate::action::Action;
use crate::error::Result;
use crate::pattern::Pattern;
use indexmap::IndexMap;
use std::sync::Arc;

/// Rules keyed by pattern, each holding its actions in registration order
///
/// Lookup prefers an exact pattern; otherwise the wildcard pattern with the longest
/// matching tail wins, earlier registrations winning ties.
pub struct RuleStore {
    rules: IndexMap<Pattern, Vec<Arc<dyn Action>>>,
    actions: Arc<ActionRegistry>,
}

impl RuleStore {
    /// Create an empty store resolving action class names through `actions`
    pub fn new(actions: Arc<ActionRegistry>) -> Self {
        Self {
            rules: IndexMap::new(),
            actions,
        }
    }

    /// Bind `action` to `pattern`
    pub fn add_rule(&mut self, pattern: Pattern, action: Arc<dyn Action>) {
        log::trace!("Adding rule {pattern} -> {}", action.name());
        self.rules.entry(pattern).or_default().push(action);
    }

    /// Bind the action registered as `class_name` to `pattern`
    ///
    /// Nothing is registered when the class cannot be resolved; the error is handed
    /// back so the caller can report it.
    pub fn add_rule_by_name(&mut self, pattern: Pattern, class_name: &str) -> Result<()> {
        let action = self.actions.resolve(class_name)?;
        self.add_rule(pattern, action);
        Ok(())
    }

    /// Actions bound to `path`, if any rule matches
    pub fn match_actions(&self, path: &Pattern) -> Option<&[Arc<dyn Action>]> {
        if let Some(actions) = self.rules.get(path) {
            return Some(actions);
        }

        let mut best: Option<(usize, &Vec<Arc<dyn Action>>)> = None;
        for (pattern, actions) in self.rules.iter().filter(|(p, _)| p.is_wildcard()) {
            let length = path.tail_match(pattern);
            if length > best.map_or(0, |(longest, _)| longest) {
                best = Some((length, actions));
            }
        }
        best.map(|(_, actions)| actions.as_slice())
    }

    /// Registered patterns in registration order
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.rules.keys()
    }

    /// Number of distinct patterns
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rule is registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The registry used for by-name registration
    pub fn action_registry(&self) -> &Arc<ActionRegistry> {
        &self.actions
    }
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (pattern, actions) in &self.rules {
            let names: Vec<&str> = actions.iter().map(|a| a.name()).collect();
            map.entry(&pattern.to_string(), &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionData, Attributes};
    use crate::context::ExecutionContext;
    use crate::error::ActionResult;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    struct Named(&'static str);

    impl Action for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn begin(
            &self,
            _ic: &mut ExecutionContext,
            _element: &str,
            _attributes: &Attributes,
        ) -> ActionResult<Option<ActionData>> {
            Ok(None)
        }

        fn end(
            &self,
            _ic: &mut ExecutionContext,
            _element: &str,
            _data: Option<ActionData>,
        ) -> ActionResult {
            Ok(())
        }
    }

    fn store(rules: &[(&str, &'static str)]) -> RuleStore {
        let mut store = RuleStore::new(Arc::new(ActionRegistry::new()));
        for (pattern, name) in rules {
            store.add_rule(Pattern::parse(pattern), Arc::new(Named(name)));
        }
        store
    }

    fn matched(store: &RuleStore, path: &str) -> Vec<&'static str> {
        store
            .match_actions(&Pattern::parse(path))
            .map(|actions| actions.iter().map(|a| a.name()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let store = store(&[("*/logger", "wildcard"), ("config/logger", "exact")]);
        assert_eq!(matched(&store, "config/logger"), vec!["exact"]);
        assert_eq!(matched(&store, "other/logger"), vec!["wildcard"]);
    }

    #[rstest]
    #[case("x/a/b", vec!["long"])]
    #[case("x/c/b", vec!["short"])]
    #[case("b", vec!["short"])]
    #[case("x/a", vec![])]
    fn test_longest_wildcard_wins(#[case] path: &str, #[case] expected: Vec<&'static str>) {
        let store = store(&[("*/b", "short"), ("*/a/b", "long")]);
        assert_eq!(matched(&store, path), expected);
    }

    #[test]
    fn test_equivalent_wildcards_share_one_rule() {
        let store = store(&[("*/a/b", "first"), ("*/a/b/", "same"), ("*/x/b", "other")]);
        assert_eq!(matched(&store, "r/a/b"), vec!["first", "same"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_actions_keep_registration_order() {
        let store = store(&[("a", "one"), ("a", "two"), ("a", "three")]);
        assert_eq!(matched(&store, "a"), vec!["one", "two", "three"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_by_name_failure_registers_nothing() {
        let mut store = store(&[]);
        assert!(store
            .add_rule_by_name(Pattern::parse("a/b"), "com.example.Missing")
            .is_err());
        assert!(store.is_empty());
        assert!(store.match_actions(&Pattern::parse("a/b")).is_none());
    }

    #[test]
    fn test_by_name_shares_instances() {
        let mut store = RuleStore::new(Arc::new(ActionRegistry::with_builtins()));
        store
            .add_rule_by_name(Pattern::parse("a/param"), "ParamAction")
            .unwrap();
        store
            .add_rule_by_name(Pattern::parse("b/param"), "ParamAction")
            .unwrap();
        let first = &store.match_actions(&Pattern::parse("a/param")).unwrap()[0];
        let second = &store.match_actions(&Pattern::parse("b/param")).unwrap()[0];
        assert!(Arc::ptr_eq(first, second));
    }
}
