//! Progress events emitted by the generation service.
//!
//! Every event is a JSON object carrying a `dataType` discriminator. Payload
//! fields are free-form strings, so each one is kept as [`TextField`] and
//! interpreted later by the metrics reducer rather than here.

use serde_json::Value;

/// Discriminator key present on every event object.
pub const DATA_TYPE_KEY: &str = "dataType";

/// Raw state of one text payload field.
#[derive(Debug, Clone, PartialEq)]
pub enum TextField {
    Text(String),
    /// Field present but not a JSON string.
    NotText,
    Missing,
}

impl TextField {
    fn read(object: &serde_json::Map<String, Value>, key: &str) -> Self {
        match object.get(key) {
            Some(Value::String(s)) => TextField::Text(s.clone()),
            Some(_) => TextField::NotText,
            None => TextField::Missing,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TextField::Text(s) => Some(s),
            TextField::NotText | TextField::Missing => None,
        }
    }
}

impl From<&str> for TextField {
    fn from(s: &str) -> Self {
        TextField::Text(s.to_string())
    }
}

/// Fields of a `summary` event.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryFields {
    /// `coverageIncreased`
    pub coverage_increased: TextField,
    /// `linesCovered`
    pub lines_covered: TextField,
    /// `totalLines`
    pub total_lines: TextField,
    /// `testAdded`
    pub tests_added: TextField,
}

/// One decoded unit of the response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// `calculatedCoverage`: running coverage embedded in a sentence.
    CalculatedCoverage { text: TextField },
    /// `summary`: final figures for the file.
    Summary(SummaryFields),
    /// Any other discriminator, or a value that is not an object.
    Unknown { data_type: Option<String> },
}

impl StreamEvent {
    /// Map one decoded JSON value onto an event. Never fails: anything that
    /// is not a recognized object becomes [`StreamEvent::Unknown`].
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return StreamEvent::Unknown { data_type: None };
        };

        match object.get(DATA_TYPE_KEY).and_then(Value::as_str) {
            Some("calculatedCoverage") => StreamEvent::CalculatedCoverage {
                text: TextField::read(object, "calculatedCoverage"),
            },
            Some("summary") => StreamEvent::Summary(SummaryFields {
                coverage_increased: TextField::read(object, "coverageIncreased"),
                lines_covered: TextField::read(object, "linesCovered"),
                total_lines: TextField::read(object, "totalLines"),
                tests_added: TextField::read(object, "testAdded"),
            }),
            other => StreamEvent::Unknown {
                data_type: other.map(str::to_string),
            },
        }
    }

    /// Discriminator used in log lines.
    pub fn kind(&self) -> &str {
        match self {
            StreamEvent::CalculatedCoverage { .. } => "calculatedCoverage",
            StreamEvent::Summary(_) => "summary",
            StreamEvent::Unknown { data_type } => data_type.as_deref().unwrap_or("unknown"),
        }
    }
}
