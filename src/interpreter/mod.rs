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

//! The rule-driven interpretation state machine
//!
//! [`Interpreter`] receives document events from the [`sax`] driver, keeps the live
//! element [`Pattern`], resolves the actions for each element and invokes their
//! begin, body and end phases. Skip signals raised by actions suppress dispatch for
//! a subtree (children) or for the rest of a level (siblings) until the element that
//! anchors the skip is closed.

pub mod sax;

use crate::action::{Action, ActionData, ImplicitAction};
use crate::context::ExecutionContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode, Severity, SourceLocation};
use crate::error::ActionError;
use crate::pattern::Pattern;
use crate::registry::RuleStore;
use std::sync::Arc;

pub use sax::{Attributes, ContentHandler, parse_document};

/// Dispatch state of an [`Interpreter`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InterpreterState {
    /// No document in progress
    #[default]
    Idle,
    /// Normal dispatch
    Parsing,
    /// Descendants of the element at this path are not dispatched
    SkippingChildren(Pattern),
    /// The rest of the level below this path is not dispatched
    SkippingSiblings(Pattern),
}

impl InterpreterState {
    /// Check if dispatch is currently suppressed
    pub fn is_skipping(&self) -> bool {
        self.skip_marker().is_some()
    }

    /// Path at which dispatch resumes
    pub fn skip_marker(&self) -> Option<&Pattern> {
        match self {
            InterpreterState::SkippingChildren(marker)
            | InterpreterState::SkippingSiblings(marker) => Some(marker),
            InterpreterState::Idle | InterpreterState::Parsing => None,
        }
    }
}

/// An implicit action plus the applicability check it answers
#[derive(Clone)]
struct ImplicitRule {
    matcher: Arc<dyn ImplicitAction>,
    action: Arc<dyn Action>,
}

/// An action whose begin phase completed for an open element
struct Invocation {
    action: Arc<dyn Action>,
    data: Option<ActionData>,
}

/// Bookkeeping for one open element
#[derive(Default)]
struct ElementFrame {
    invocations: Vec<Invocation>,
    body: String,
}

/// Interprets one configuration document at a time
pub struct Interpreter {
    rules: RuleStore,
    implicit: Vec<ImplicitRule>,
    context: ExecutionContext,
    path: Pattern,
    frames: Vec<ElementFrame>,
    state: InterpreterState,
}

impl Interpreter {
    /// Create an interpreter dispatching through `rules` into `context`
    pub fn new(rules: RuleStore, context: ExecutionContext) -> Self {
        Self {
            rules,
            implicit: Vec::new(),
            context,
            path: Pattern::new(),
            frames: Vec::new(),
            state: InterpreterState::Idle,
        }
    }

    /// Append an implicit action, consulted after those added earlier
    pub fn add_implicit_action<A: ImplicitAction + 'static>(&mut self, action: A) {
        let action = Arc::new(action);
        self.implicit.push(ImplicitRule {
            matcher: action.clone(),
            action,
        });
    }

    /// Interpret a whole document held in memory
    pub fn interpret_str(&mut self, source: &str) {
        parse_document(source, self);
    }

    /// The rule table
    pub fn rule_store(&self) -> &RuleStore {
        &self.rules
    }

    /// The rule table, mutably
    pub fn rule_store_mut(&mut self) -> &mut RuleStore {
        &mut self.rules
    }

    /// Session state
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Session state, mutably
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    /// Consume the interpreter, keeping the session state
    pub fn into_context(self) -> ExecutionContext {
        self.context
    }

    /// Current dispatch state
    pub fn state(&self) -> &InterpreterState {
        &self.state
    }

    /// Live element path
    pub fn path(&self) -> &Pattern {
        &self.path
    }

    fn resolve_actions(&mut self, attributes: &Attributes) -> Vec<Arc<dyn Action>> {
        if let Some(actions) = self.rules.match_actions(&self.path) {
            return actions.to_vec();
        }
        let implicit = self
            .implicit
            .iter()
            .find(|rule| rule.matcher.is_applicable(&self.path, attributes, &self.context))
            .map(|rule| Arc::clone(&rule.action));
        match implicit {
            Some(action) => vec![action],
            None => {
                let tag = self.path.peek_last().unwrap_or_default().to_string();
                self.context.add_warning(
                    DiagnosticCode::UnmatchedElement,
                    format!(
                        "no applicable action for [{tag}], current path is {}",
                        self.path
                    ),
                );
                Vec::new()
            }
        }
    }

    fn skip_children(&mut self) {
        if !matches!(self.state, InterpreterState::SkippingSiblings(_)) {
            log::debug!("Skipping children of {}", self.path);
            self.state = InterpreterState::SkippingChildren(self.path.clone());
        }
    }

    fn skip_siblings(&mut self) {
        let mut marker = self.path.clone();
        marker.pop();
        log::debug!("Skipping siblings of {}, resuming at {marker}", self.path);
        self.state = InterpreterState::SkippingSiblings(marker);
    }

    fn on_begin_error(&mut self, action: &dyn Action, error: ActionError) {
        match error {
            ActionError::SkipChildren => self.skip_children(),
            ActionError::SkipSiblings => self.skip_siblings(),
            ActionError::Failed(error) => {
                self.context.add_diagnostic(
                    Diagnostic::error(error.code(), format!("{} failed in begin()", action.name()))
                        .with_cause(&error),
                );
                self.skip_children();
            }
        }
    }

    fn on_late_error(&mut self, action: &dyn Action, phase: &str, error: ActionError) {
        match error {
            // children are already closed
            ActionError::SkipChildren => {}
            ActionError::SkipSiblings => {
                if !self.state.is_skipping() {
                    self.skip_siblings();
                }
            }
            ActionError::Failed(error) => {
                self.context.add_diagnostic(
                    Diagnostic::error(error.code(), format!("{} failed in {phase}()", action.name()))
                        .with_cause(&error),
                );
            }
        }
    }

    fn install_requested_rules(&mut self) {
        for (pattern, class_name) in self.context.take_rule_requests() {
            match self.rules.add_rule_by_name(pattern.clone(), &class_name) {
                Ok(()) => log::debug!("Added rule {pattern} -> {class_name}"),
                Err(error) => self.context.add_diagnostic(
                    Diagnostic::warning(
                        DiagnosticCode::RuleRegistration,
                        format!("Could not add rule {pattern} -> [{class_name}]"),
                    )
                    .with_cause(error),
                ),
            }
        }
    }

    fn close_frame(&mut self, name: &str, frame: ElementFrame, deliver_body: bool) {
        let ElementFrame {
            mut invocations,
            body,
        } = frame;

        let text = body.trim();
        if deliver_body && !text.is_empty() {
            for invocation in invocations.iter_mut() {
                let action = Arc::clone(&invocation.action);
                if let Err(error) = action.body(&mut self.context, name, text, &mut invocation.data)
                {
                    self.on_late_error(action.as_ref(), "body", error);
                }
                self.install_requested_rules();
            }
        }

        for Invocation { action, data } in invocations {
            if let Err(error) = action.end(&mut self.context, name, data) {
                self.on_late_error(action.as_ref(), "end", error);
            }
            self.install_requested_rules();
        }
    }
}

impl ContentHandler for Interpreter {
    fn set_location(&mut self, location: SourceLocation) {
        self.context.set_location(Some(location));
    }

    fn start_document(&mut self) {
        self.state = InterpreterState::Parsing;
    }

    fn start_element(&mut self, name: &str, attributes: &Attributes) {
        if self.state == InterpreterState::Idle {
            self.state = InterpreterState::Parsing;
        }
        self.path.push(name);

        if self.state.is_skipping() {
            self.frames.push(ElementFrame::default());
            return;
        }

        let actions = self.resolve_actions(attributes);
        let mut frame = ElementFrame {
            invocations: Vec::with_capacity(actions.len()),
            body: String::new(),
        };
        for action in actions {
            match action.begin(&mut self.context, name, attributes) {
                Ok(data) => frame.invocations.push(Invocation { action, data }),
                Err(error) => self.on_begin_error(action.as_ref(), error),
            }
            self.install_requested_rules();
        }
        self.frames.push(frame);
    }

    fn characters(&mut self, text: &str) {
        if self.state.is_skipping() {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.body.push_str(text);
        }
    }

    fn end_element(&mut self, name: &str) {
        let Some(frame) = self.frames.pop() else {
            self.context.add_warning(
                DiagnosticCode::Parser,
                format!("Unbalanced end of element [{name}]"),
            );
            return;
        };

        let deliver_body = match &self.state {
            InterpreterState::SkippingChildren(marker)
            | InterpreterState::SkippingSiblings(marker) => {
                if *marker == self.path {
                    log::debug!("Resuming dispatch at {}", self.path);
                    self.state = InterpreterState::Parsing;
                    true
                } else {
                    false
                }
            }
            InterpreterState::Idle | InterpreterState::Parsing => true,
        };
        self.close_frame(name, frame, deliver_body);
        self.path.pop();
    }

    fn end_document(&mut self) {
        if !self.frames.is_empty() {
            self.context.add_warning(
                DiagnosticCode::Parser,
                format!(
                    "Document ended with {} unclosed element(s), current path is {}",
                    self.frames.len(),
                    self.path
                ),
            );
            while let Some(tag) = self.path.peek_last().map(str::to_string) {
                if self.frames.is_empty() {
                    break;
                }
                self.end_element(&tag);
            }
        }
        self.path = Pattern::new();
        self.frames.clear();
        self.state = InterpreterState::Idle;
    }

    fn warning(&mut self, message: &str) {
        self.context
            .add_diagnostic(Diagnostic::new(Severity::Warning, DiagnosticCode::Parser, message));
    }

    fn error(&mut self, message: &str) {
        self.context
            .add_diagnostic(Diagnostic::new(Severity::Error, DiagnosticCode::Parser, message));
    }

    fn fatal_error(&mut self, message: &str) {
        self.context
            .add_diagnostic(Diagnostic::new(Severity::Fatal, DiagnosticCode::Parser, message));
    }
}

#[cfg(test)]
mod tests;
