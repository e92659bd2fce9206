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

//! Rules added by the document itself

use super::{ActionData, Attributes, required_attribute};
use crate::action::Action;
use crate::context::ExecutionContext;
use crate::error::ActionResult;
use crate::pattern::Pattern;

/// Binds `actionClass` to `pattern` for the remainder of the run
///
/// The binding is installed by the interpreter right after this element's begin phase,
/// so it already applies to the next element.
#[derive(Debug, Default)]
pub struct NewRuleAction;

impl Action for NewRuleAction {
    fn name(&self) -> &'static str {
        "NewRuleAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let pattern = required_attribute(ic, element, attributes, "pattern")?;
        let action_class = required_attribute(ic, element, attributes, "actionClass")?;
        ic.add_info(format!(
            "About to add new rule with pattern [{pattern}] and action [{action_class}]"
        ));
        ic.request_rule(Pattern::parse(&pattern), action_class);
        Ok(None)
    }

    fn end(&self, _ic: &mut ExecutionContext, _element: &str, _data: Option<ActionData>) -> ActionResult {
        Ok(())
    }
}
