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

//! The document root and the context name

use super::{ActionData, Attributes, attribute};
use crate::action::Action;
use crate::context::ExecutionContext;
use crate::error::{ActionError, ActionResult, ConfigError};

/// Handles the root `configuration` element
///
/// `debug="true"` turns on internal status reporting for the run.
#[derive(Debug, Default)]
pub struct ConfigurationAction;

impl Action for ConfigurationAction {
    fn name(&self) -> &'static str {
        "ConfigurationAction"
    }

    fn begin(
        &self,
        ic: &mut ExecutionContext,
        _element: &str,
        attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        let debug = attribute(ic, attributes, "debug")?;
        match debug.as_deref() {
            Some(flag) if flag.eq_ignore_ascii_case("true") => {
                ic.set_debug(true);
                ic.add_info("debug attribute set to true");
            }
            Some(flag) if !flag.eq_ignore_ascii_case("false") => {
                ic.add_info(format!("Ignoring debug attribute value [{flag}]"));
            }
            _ => log::debug!("debug attribute not set"),
        }
        Ok(None)
    }

    fn end(&self, ic: &mut ExecutionContext, _element: &str, _data: Option<ActionData>) -> ActionResult {
        ic.add_info("End of configuration.");
        Ok(())
    }
}

/// Names the logger context from the element text
#[derive(Debug, Default)]
pub struct ContextNameAction;

impl Action for ContextNameAction {
    fn name(&self) -> &'static str {
        "ContextNameAction"
    }

    fn begin(
        &self,
        _ic: &mut ExecutionContext,
        _element: &str,
        _attributes: &Attributes,
    ) -> ActionResult<Option<ActionData>> {
        Ok(None)
    }

    fn body(
        &self,
        ic: &mut ExecutionContext,
        _element: &str,
        text: &str,
        _data: &mut Option<ActionData>,
    ) -> ActionResult {
        let name = ic.subst(text).map_err(ConfigError::from)?;
        let name = name.trim().to_string();
        match ic.with_logger_context_mut(|context| context.set_name(name.clone())) {
            Some(Ok(())) => {
                ic.add_info(format!("Setting logger context name as [{name}]"));
                Ok(())
            }
            Some(Err(message)) => Err(ActionError::Failed(ConfigError::Other(message))),
            None => Err(ActionError::Failed(ConfigError::unexpected_object(
                "no logger context at the bottom of the stack",
            ))),
        }
    }

    fn end(&self, _ic: &mut ExecutionContext, _element: &str, _data: Option<ActionData>) -> ActionResult {
        Ok(())
    }
}
