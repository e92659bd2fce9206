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

use super::*;
use crate::action::NewRuleAction;
use crate::error::ConfigError;
use crate::model::{ComponentRef, ThresholdFilter, component_ref};
use crate::registry::{ActionRegistry, ClassRegistry};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn record(&self, entry: String) {
        self.0.lock().push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Records every phase; optionally fails for one element
struct Recorder {
    journal: Journal,
    begin_failure: Option<(&'static str, ActionError)>,
    end_failure: Option<(&'static str, ActionError)>,
}

impl Recorder {
    fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            begin_failure: None,
            end_failure: None,
        }
    }

    fn failing_begin(mut self, element: &'static str, error: ActionError) -> Self {
        self.begin_failure = Some((element, error));
        self
    }

    fn failing_end(mut self, element: &'static str, error: ActionError) -> Self {
        self.end_failure = Some((element, error));
        self
    }

    fn shared(self) -> Arc<dyn Action> {
        Arc::new(self)
    }
}

impl Action for Recorder {
    fn name(&self) -> &'static str {
        "Recorder"
    }

    fn begin(
        &self,
        _ic: &mut ExecutionContext,
        element: &str,
        _attributes: &Attributes,
    ) -> crate::error::ActionResult<Option<ActionData>> {
        self.journal.record(format!("begin {element}"));
        match &self.begin_failure {
            Some((target, error)) if *target == element => Err(error.clone()),
            _ => Ok(None),
        }
    }

    fn body(
        &self,
        _ic: &mut ExecutionContext,
        element: &str,
        text: &str,
        _data: &mut Option<ActionData>,
    ) -> crate::error::ActionResult {
        self.journal.record(format!("body {element} {text}"));
        Ok(())
    }

    fn end(
        &self,
        _ic: &mut ExecutionContext,
        element: &str,
        _data: Option<ActionData>,
    ) -> crate::error::ActionResult {
        self.journal.record(format!("end {element}"));
        match &self.end_failure {
            Some((target, error)) if *target == element => Err(error.clone()),
            _ => Ok(()),
        }
    }
}

/// Pushes a fresh component in begin and pops it in end, recording stack depths
struct Pusher {
    journal: Journal,
}

impl Action for Pusher {
    fn name(&self) -> &'static str {
        "Pusher"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        _attributes: &Attributes,
    ) -> crate::error::ActionResult<Option<ActionData>> {
        let component = component_ref(ThresholdFilter::new());
        ic.push_object(component.clone());
        self.journal
            .record(format!("push {element} depth {}", ic.stack_depth()));
        Ok(Some(Box::new(component)))
    }

    fn end(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        data: Option<ActionData>,
    ) -> crate::error::ActionResult {
        let component = crate::action::take_data::<ComponentRef>(data);
        if let Some(component) = component {
            crate::action::pop_expected(ic, &component, "component");
        }
        self.journal
            .record(format!("pop {element} depth {}", ic.stack_depth()));
        Ok(())
    }
}

/// Pushes a component in begin and leaves it on the stack
struct Leaker;

impl Action for Leaker {
    fn name(&self) -> &'static str {
        "Leaker"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        _element: &str,
        _attributes: &Attributes,
    ) -> crate::error::ActionResult<Option<ActionData>> {
        ic.push_object(component_ref(ThresholdFilter::new()));
        Ok(None)
    }

    fn end(
        &self,
        _ic: &mut ExecutionContext,
        _element: &str,
        _data: Option<ActionData>,
    ) -> crate::error::ActionResult {
        Ok(())
    }
}

/// Expects in end a component it never pushed
struct Orphan;

impl Action for Orphan {
    fn name(&self) -> &'static str {
        "Orphan"
    }

    fn begin(
        &self,
        _ic: &mut ExecutionContext,
        _element: &str,
        _attributes: &Attributes,
    ) -> crate::error::ActionResult<Option<ActionData>> {
        Ok(None)
    }

    fn end(
        &self,
        ic: &mut ExecutionContext,
        _element: &str,
        _data: Option<ActionData>,
    ) -> crate::error::ActionResult {
        crate::action::pop_expected(ic, &component_ref(ThresholdFilter::new()), "filter");
        Ok(())
    }
}

/// Implicit action applicable to every element
struct CatchAll {
    label: &'static str,
    journal: Journal,
}

impl Action for CatchAll {
    fn name(&self) -> &'static str {
        self.label
    }

    fn begin(
        &self,
        _ic: &mut ExecutionContext,
        element: &str,
        _attributes: &Attributes,
    ) -> crate::error::ActionResult<Option<ActionData>> {
        self.journal.record(format!("{} {element}", self.label));
        Ok(None)
    }

    fn end(
        &self,
        _ic: &mut ExecutionContext,
        _element: &str,
        _data: Option<ActionData>,
    ) -> crate::error::ActionResult {
        Ok(())
    }
}

impl ImplicitAction for CatchAll {
    fn is_applicable(&self, _path: &Pattern, _attributes: &Attributes, _ic: &ExecutionContext) -> bool {
        true
    }
}

fn interpreter_with<P: AsRef<str>>(
    registry: ActionRegistry,
    rules: Vec<(P, Arc<dyn Action>)>,
) -> Interpreter {
    let mut store = RuleStore::new(Arc::new(registry));
    for (pattern, action) in rules {
        store.add_rule(Pattern::parse(pattern.as_ref()), action);
    }
    let mut context = ExecutionContext::new(Arc::new(ClassRegistry::with_builtins()));
    context.set_use_process_env(false);
    Interpreter::new(store, context)
}

fn interpreter<P: AsRef<str>>(rules: Vec<(P, Arc<dyn Action>)>) -> Interpreter {
    interpreter_with(ActionRegistry::new(), rules)
}

/// `root` plus `*/tag` for each tag, all bound to `action`
fn recording_rules(action: Arc<dyn Action>, tags: &[&str]) -> Vec<(String, Arc<dyn Action>)> {
    std::iter::once("root".to_string())
        .chain(tags.iter().map(|tag| format!("*/{tag}")))
        .map(|pattern| (pattern, action.clone()))
        .collect()
}

#[test]
fn test_skip_children_scope() {
    let journal = Journal::default();
    let action = Recorder::new(&journal)
        .failing_begin("B", ActionError::SkipChildren)
        .shared();
    let mut interpreter = interpreter(recording_rules(action, &["A", "B", "C", "D"]));

    interpreter.interpret_str("<root><A><B><C/></B></A><D/></root>");

    assert_eq!(
        journal.entries(),
        vec![
            "begin root",
            "begin A",
            "begin B",
            "end A",
            "begin D",
            "end D",
            "end root",
        ]
    );
    assert_eq!(interpreter.state(), &InterpreterState::Idle);
    assert!(interpreter.context().diagnostics().is_empty());
}

#[test]
fn test_skip_siblings_scope() {
    let journal = Journal::default();
    let action = Recorder::new(&journal)
        .failing_begin("B", ActionError::SkipSiblings)
        .shared();
    let mut interpreter = interpreter(recording_rules(action, &["A", "B", "D", "X", "E", "F"]));

    interpreter.interpret_str("<root><A><B/><D><X/></D><E/></A><F/></root>");

    assert_eq!(
        journal.entries(),
        vec![
            "begin root",
            "begin A",
            "begin B",
            "end A",
            "begin F",
            "end F",
            "end root",
        ]
    );
}

#[test]
fn test_stack_balance_when_children_are_skipped() {
    let journal = Journal::default();
    let pusher: Arc<dyn Action> = Arc::new(Pusher {
        journal: journal.clone(),
    });
    let skipper = Recorder::new(&Journal::default())
        .failing_begin("B", ActionError::SkipChildren)
        .shared();
    let mut interpreter = interpreter(vec![
        ("root", pusher.clone()),
        ("root/A", pusher.clone()),
        ("root/A/B", pusher.clone()),
        ("root/A/B", skipper),
        ("root/A/B/C", pusher.clone()),
    ]);

    interpreter.interpret_str("<root><A><B><C/></B></A></root>");

    assert_eq!(
        journal.entries(),
        vec![
            "push root depth 1",
            "push A depth 2",
            "push B depth 3",
            "pop B depth 2",
            "pop A depth 1",
            "pop root depth 0",
        ]
    );
    assert_eq!(interpreter.context().stack_depth(), 0);
}

#[test]
fn test_failure_is_recorded_and_skips_children() {
    let journal = Journal::default();
    let action = Recorder::new(&journal)
        .failing_begin("B", ActionError::Failed(ConfigError::Other("boom".to_string())))
        .shared();
    let mut interpreter = interpreter(recording_rules(action, &["B", "C", "D"]));

    interpreter.interpret_str("<root>\n  <B><C/></B>\n  <D/>\n</root>");

    assert_eq!(
        journal.entries(),
        vec!["begin root", "begin B", "begin D", "end D", "end root"]
    );
    let diagnostics = interpreter.context().diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].cause.as_deref(), Some("boom"));
    assert_eq!(diagnostics[0].location.map(|l| l.line), Some(2));
}

#[test]
fn test_skip_siblings_from_end_phase() {
    let journal = Journal::default();
    let action = Recorder::new(&journal)
        .failing_end("B", ActionError::SkipSiblings)
        .shared();
    let mut interpreter = interpreter(recording_rules(action, &["A", "B", "D"]));

    interpreter.interpret_str("<root><A><B/><D/></A><D/></root>");

    assert_eq!(
        journal.entries(),
        vec![
            "begin root",
            "begin A",
            "begin B",
            "end B",
            "end A",
            "begin D",
            "end D",
            "end root",
        ]
    );
}

#[test]
fn test_unmatched_element_children_still_dispatched() {
    let journal = Journal::default();
    let action = Recorder::new(&journal).shared();
    let mut interpreter = interpreter(recording_rules(action, &["A"]));

    interpreter.interpret_str("<root><unknown><A/></unknown></root>");

    assert_eq!(
        journal.entries(),
        vec!["begin root", "begin A", "end A", "end root"]
    );
    let diagnostics = interpreter.context().diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::UnmatchedElement);
    assert_eq!(
        diagnostics[0].message,
        "no applicable action for [unknown], current path is [root][unknown]"
    );
}

#[test]
fn test_first_applicable_implicit_action_wins() {
    let journal = Journal::default();
    let mut interpreter = interpreter(vec![("root", Recorder::new(&journal).shared())]);
    interpreter.add_implicit_action(CatchAll {
        label: "first",
        journal: journal.clone(),
    });
    interpreter.add_implicit_action(CatchAll {
        label: "second",
        journal: journal.clone(),
    });

    interpreter.interpret_str("<root><x/><y/></root>");

    assert_eq!(
        journal.entries(),
        vec!["begin root", "first x", "first y", "end root"]
    );
}

#[test]
fn test_body_is_trimmed_and_suppressed_while_skipping() {
    let journal = Journal::default();
    let action = Recorder::new(&journal)
        .failing_begin("A", ActionError::SkipChildren)
        .shared();
    let mut interpreter = interpreter(recording_rules(action, &["A", "B", "C"]));

    interpreter.interpret_str("<root><A><B> hidden </B></A><C>  shown\n </C><C>   </C></root>");

    assert_eq!(
        journal.entries(),
        vec![
            "begin root",
            "begin A",
            "begin C",
            "body C shown",
            "end C",
            "begin C",
            "end C",
            "end root",
        ]
    );
}

#[test]
fn test_document_can_add_rules() {
    let journal = Journal::default();
    let registry = ActionRegistry::new();
    let recorder = journal.clone();
    registry.register("com.example.Recorder", move || {
        Arc::new(Recorder::new(&recorder)) as Arc<dyn Action>
    });
    let mut interpreter = interpreter_with(
        registry,
        vec![
            ("root", Recorder::new(&Journal::default()).shared()),
            ("root/newRule", Arc::new(NewRuleAction) as Arc<dyn Action>),
        ],
    );

    interpreter.interpret_str(
        r#"<root>
             <custom/>
             <newRule pattern="root/custom" actionClass="com.example.Recorder"/>
             <newRule pattern="root/other" actionClass="com.example.Missing"/>
             <custom/>
           </root>"#,
    );

    assert_eq!(journal.entries(), vec!["begin custom", "end custom"]);
    let codes: Vec<DiagnosticCode> = interpreter
        .context()
        .diagnostics()
        .iter()
        .filter(|d| d.severity >= Severity::Warning)
        .map(|d| d.code.clone())
        .collect();
    assert_eq!(
        codes,
        vec![DiagnosticCode::UnmatchedElement, DiagnosticCode::RuleRegistration]
    );
    assert!(interpreter
        .rule_store()
        .match_actions(&Pattern::parse("root/custom"))
        .is_some());
}

#[test]
fn test_unclosed_elements_are_closed_at_end_of_document() {
    let journal = Journal::default();
    let pusher: Arc<dyn Action> = Arc::new(Pusher {
        journal: journal.clone(),
    });
    let mut interpreter = interpreter(vec![("root", pusher.clone()), ("root/A", pusher)]);

    interpreter.interpret_str("<root><A>");

    assert_eq!(
        journal.entries(),
        vec![
            "push root depth 1",
            "push A depth 2",
            "pop A depth 1",
            "pop root depth 0",
        ]
    );
    assert_eq!(interpreter.state(), &InterpreterState::Idle);
    assert!(interpreter.path().is_empty());
    assert!(
        interpreter
            .context()
            .diagnostics()
            .iter()
            .any(|d| d.severity >= Severity::Warning)
    );
}

#[test]
fn test_malformed_document_is_fatal() {
    let journal = Journal::default();
    let action = Recorder::new(&journal).shared();
    let mut interpreter = interpreter(recording_rules(action, &["A"]));

    interpreter.interpret_str("<root><A></root>");

    assert_eq!(
        interpreter.context().highest_severity(),
        Some(Severity::Fatal)
    );
    assert_eq!(
        journal.entries(),
        vec!["begin root", "begin A", "end A", "end root"]
    );
}

fn stack_discipline_warnings(interpreter: &Interpreter) -> usize {
    interpreter
        .context()
        .diagnostics()
        .iter()
        .filter(|d| d.code == DiagnosticCode::StackDiscipline && d.severity == Severity::Warning)
        .count()
}

#[test]
fn test_foreign_object_on_top_is_not_popped() {
    let journal = Journal::default();
    let pusher: Arc<dyn Action> = Arc::new(Pusher {
        journal: journal.clone(),
    });
    let mut interpreter = interpreter(vec![
        ("root", Recorder::new(&Journal::default()).shared()),
        ("root/A", pusher.clone()),
        ("root/A/B", Arc::new(Leaker) as Arc<dyn Action>),
        ("root/C", pusher),
    ]);

    interpreter.interpret_str("<root><A><B/></A><C/></root>");

    assert_eq!(
        journal.entries(),
        vec![
            "push A depth 1",
            "pop A depth 2",
            "push C depth 3",
            "pop C depth 2",
        ]
    );
    assert_eq!(stack_discipline_warnings(&interpreter), 1);
    assert_eq!(interpreter.context().stack_depth(), 2);
    assert_eq!(interpreter.state(), &InterpreterState::Idle);
}

#[test]
fn test_expected_object_missing_from_empty_stack() {
    let journal = Journal::default();
    let pusher: Arc<dyn Action> = Arc::new(Pusher {
        journal: journal.clone(),
    });
    let mut interpreter = interpreter(vec![
        ("root", Recorder::new(&Journal::default()).shared()),
        ("root/E", Arc::new(Orphan) as Arc<dyn Action>),
        ("root/F", pusher),
    ]);

    interpreter.interpret_str("<root><E/><E/><F/></root>");

    assert_eq!(stack_discipline_warnings(&interpreter), 2);
    assert_eq!(
        journal.entries(),
        vec!["push F depth 1", "pop F depth 0"]
    );
    assert_eq!(interpreter.context().stack_depth(), 0);
}
