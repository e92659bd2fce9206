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

//! Logging severity levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tokens that reset a logger's level so it inherits from its ancestors
pub const INHERITED_TOKENS: [&str; 2] = ["INHERITED", "NULL"];

/// Severity level, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Everything is enabled
    All,
    /// Finest-grained events
    Trace,
    /// Debugging events
    Debug,
    /// Informational events
    Info,
    /// Potentially harmful situations
    Warn,
    /// Error events
    Error,
    /// Everything is disabled
    Off,
}

/// Error returned when a level token is not recognized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown level '{0}'")]
pub struct ParseLevelError(pub String);

impl Level {
    /// All levels in ascending order
    pub const ALL: [Level; 7] = [
        Level::All,
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Off,
    ];

    /// Canonical upper-case token
    pub fn as_str(self) -> &'static str {
        match self {
            Level::All => "ALL",
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    /// Whether `token` asks for the level to be inherited
    pub fn is_inherited_token(token: &str) -> bool {
        INHERITED_TOKENS
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(token.trim()))
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("debug", Level::Debug)]
    #[case("WARN", Level::Warn)]
    #[case(" Info ", Level::Info)]
    #[case("off", Level::Off)]
    fn test_parse_case_insensitive(#[case] token: &str, #[case] expected: Level) {
        assert_eq!(token.parse::<Level>(), Ok(expected));
    }

    #[test]
    fn test_parse_unknown() {
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_inherited_tokens() {
        assert!(Level::is_inherited_token("inherited"));
        assert!(Level::is_inherited_token("NULL"));
        assert!(!Level::is_inherited_token("INFO"));
    }
}
