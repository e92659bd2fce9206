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

//! Push-style XML driver
//!
//! Reads a document with `quick-xml` and reports each event to a [`ContentHandler`]
//! together with the line and column the reader has reached. Self-closing elements are
//! reported as a start immediately followed by an end.

use crate::diagnostics::SourceLocation;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use smallvec::SmallVec;

/// Attributes of one element in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: SmallVec<[(String, String); 4]>,
}

impl Attributes {
    /// Create an empty attribute list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Value of the attribute called `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no attributes
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Receiver of document events
pub trait ContentHandler {
    /// Position reached by the reader, reported before each event
    fn set_location(&mut self, _location: SourceLocation) {}

    /// Start of the document
    fn start_document(&mut self) {}

    /// Opening tag
    fn start_element(&mut self, name: &str, attributes: &Attributes);

    /// Character data inside the current element
    fn characters(&mut self, _text: &str) {}

    /// Closing tag
    fn end_element(&mut self, name: &str);

    /// End of the document, also reported after a fatal error
    fn end_document(&mut self) {}

    /// Recoverable oddity in the document
    fn warning(&mut self, _message: &str) {}

    /// Recoverable error in the document
    fn error(&mut self, _message: &str) {}

    /// Unrecoverable error; no further element events follow
    fn fatal_error(&mut self, _message: &str) {}
}

/// Turns byte offsets into line/column positions, scanning forward only
struct LineTracker<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> LineTracker<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance_to(&mut self, offset: usize) -> SourceLocation {
        let offset = offset.min(self.source.len());
        if offset > self.offset {
            let scanned = self.source.get(self.offset..offset).unwrap_or_default();
            for c in scanned.chars() {
                if c == '\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
            }
            self.offset = offset;
        }
        SourceLocation::new(self.line, self.column)
    }
}

/// Drive `handler` through every event of `source`
pub fn parse_document(source: &str, handler: &mut dyn ContentHandler) {
    let mut reader = Reader::from_str(source);
    reader.trim_text(true);
    let mut tracker = LineTracker::new(source);
    let mut buf = Vec::new();

    handler.start_document();
    loop {
        let event = reader.read_event_into(&mut buf);
        let end = reader.buffer_position() as usize;
        let position = match &event {
            Ok(XmlEvent::Start(_) | XmlEvent::Empty(_)) => tag_start(source, end),
            _ => end,
        };
        handler.set_location(tracker.advance_to(position));
        match event {
            Ok(XmlEvent::Start(e)) => {
                let name = element_name(&e);
                let attributes = collect_attributes(&e, handler);
                handler.start_element(&name, &attributes);
            }
            Ok(XmlEvent::Empty(e)) => {
                let name = element_name(&e);
                let attributes = collect_attributes(&e, handler);
                handler.start_element(&name, &attributes);
                handler.end_element(&name);
            }
            Ok(XmlEvent::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                handler.end_element(&name);
            }
            Ok(XmlEvent::Text(e)) => match e.unescape() {
                Ok(text) => handler.characters(&text),
                Err(err) => handler.error(&format!("Malformed character data: {err}")),
            },
            Ok(XmlEvent::CData(e)) => {
                handler.characters(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(XmlEvent::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                handler.fatal_error(&format!("XML parsing error: {err}"));
                break;
            }
        }
        buf.clear();
    }
    handler.end_document();
}

/// Offset of the `<` opening the tag that ends at `end`
///
/// Attribute values cannot hold a raw `<`, so the last one before `end` starts the tag.
fn tag_start(source: &str, end: usize) -> usize {
    source
        .get(..end)
        .and_then(|head| head.rfind('<'))
        .unwrap_or(end)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn collect_attributes(e: &BytesStart<'_>, handler: &mut dyn ContentHandler) -> Attributes {
    let mut attributes = Attributes::new();
    for attribute in e.attributes() {
        match attribute {
            Ok(attribute) => {
                let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
                match attribute.unescape_value() {
                    Ok(value) => attributes.push(name, value),
                    Err(err) => handler.error(&format!("Malformed value of attribute [{name}]: {err}")),
                }
            }
            Err(err) => handler.error(&format!("Malformed attribute: {err}")),
        }
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        locations: Vec<SourceLocation>,
        starts: Vec<(String, usize, usize)>,
    }

    impl ContentHandler for Recorder {
        fn set_location(&mut self, location: SourceLocation) {
            self.locations.push(location);
        }

        fn start_element(&mut self, name: &str, attributes: &Attributes) {
            if let Some(location) = self.locations.last() {
                self.starts
                    .push((name.to_string(), location.line, location.column));
            }
            let attributes: Vec<String> = attributes
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            self.events
                .push(format!("start {name} {}", attributes.join(",")).trim_end().to_string());
        }

        fn characters(&mut self, text: &str) {
            self.events.push(format!("text {text}"));
        }

        fn end_element(&mut self, name: &str) {
            self.events.push(format!("end {name}"));
        }

        fn end_document(&mut self) {
            self.events.push("eof".to_string());
        }

        fn fatal_error(&mut self, _message: &str) {
            self.events.push("fatal".to_string());
        }
    }

    #[test]
    fn test_event_sequence() {
        let mut recorder = Recorder::default();
        parse_document(
            r#"<?xml version="1.0"?>
<configuration debug="true">
  <!-- comment -->
  <property name="a" value="x &amp; y"/>
  <file><![CDATA[<raw>]]></file>
</configuration>"#,
            &mut recorder,
        );
        assert_eq!(
            recorder.events,
            vec![
                "start configuration debug=true",
                "start property name=a,value=x & y",
                "end property",
                "start file",
                "text <raw>",
                "end file",
                "end configuration",
                "eof",
            ]
        );
    }

    #[test]
    fn test_locations_advance() {
        let mut recorder = Recorder::default();
        parse_document("<a>\n  <b/>\n</a>", &mut recorder);
        let lines: Vec<usize> = recorder.locations.iter().map(|l| l.line).collect();
        assert_eq!(lines.first(), Some(&1));
        assert_eq!(lines.last(), Some(&3));
    }

    #[test]
    fn test_mismatched_end_is_fatal() {
        let mut recorder = Recorder::default();
        parse_document("<a><b></a>", &mut recorder);
        assert_eq!(recorder.events, vec!["start a", "start b", "fatal", "eof"]);
    }

    #[test]
    fn test_start_location_is_the_opening_bracket() {
        let mut recorder = Recorder::default();
        parse_document(
            "<configuration>\n  <appender name=\"A\"\n            class=\"Console\">\n    <target/>\n  </appender>\n</configuration>",
            &mut recorder,
        );
        assert_eq!(
            recorder.starts,
            vec![
                ("configuration".to_string(), 1, 1),
                ("appender".to_string(), 2, 3),
                ("target".to_string(), 4, 5),
            ]
        );
    }
}
