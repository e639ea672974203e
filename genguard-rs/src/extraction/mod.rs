//! Structured-content extraction
//!
//! Generation replies are supposed to be JSON but routinely arrive wrapped in
//! prose, inside markdown fences, or with almost-JSON syntax. [`extract`]
//! locates the payload, parses it strictly, falls back to the repair rules in
//! [`repair`] when strict parsing fails, and validates the result against an
//! [`ExtractionSchema`].

pub mod repair;

pub use repair::RepairKind;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{GenGuardError, Result};
use crate::util::preview;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("code fence pattern is valid"));

/// Top-level shape of the expected payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// A JSON array of records
    Array,

    /// A single JSON object
    Record,
}

impl PayloadShape {
    fn delimiters(self) -> (char, char) {
        match self {
            PayloadShape::Array => ('[', ']'),
            PayloadShape::Record => ('{', '}'),
        }
    }
}

/// What a usable payload must look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSchema {
    shape: PayloadShape,
    required_fields: Vec<String>,
    max_items: Option<usize>,
}

impl ExtractionSchema {
    /// An array of records
    pub fn array() -> Self {
        Self {
            shape: PayloadShape::Array,
            required_fields: Vec::new(),
            max_items: None,
        }
    }

    /// A single record
    pub fn record() -> Self {
        Self {
            shape: PayloadShape::Record,
            required_fields: Vec::new(),
            max_items: None,
        }
    }

    /// Require every record to carry these fields
    pub fn require<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Keep at most `max_items` valid records
    pub fn limit(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn shape(&self) -> PayloadShape {
        self.shape
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    fn accepts(&self, record: &Value) -> bool {
        record.as_object().map_or(false, |fields| {
            self.required_fields
                .iter()
                .all(|name| fields.get(name).map_or(false, |value| !value.is_null()))
        })
    }
}

/// Outcome of extracting structured content from a reply
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    /// Strict parsing succeeded
    WellFormed(Vec<Value>),

    /// Parsing succeeded after the listed repairs
    Repaired {
        items: Vec<Value>,
        repairs: Vec<RepairKind>,
    },

    /// No valid records could be recovered; carries the reply as received
    Unrecoverable(String),
}

impl ExtractionResult {
    /// Recovered records, if any
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            ExtractionResult::WellFormed(items) | ExtractionResult::Repaired { items, .. } => Some(items),
            ExtractionResult::Unrecoverable(_) => None,
        }
    }

    /// Repairs that were needed, empty for well-formed and unrecoverable replies
    pub fn repairs(&self) -> &[RepairKind] {
        match self {
            ExtractionResult::Repaired { repairs, .. } => repairs,
            _ => &[],
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ExtractionResult::Unrecoverable(_))
    }

    /// Recovered records, or [`GenGuardError::MalformedOutput`] with the raw reply
    pub fn into_items(self) -> Result<Vec<Value>> {
        match self {
            ExtractionResult::WellFormed(items) | ExtractionResult::Repaired { items, .. } => Ok(items),
            ExtractionResult::Unrecoverable(raw) => Err(GenGuardError::malformed_output(raw)),
        }
    }
}

/// Remove markdown code-fence markers, keeping what they enclose
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").into_owned()
}

/// Slice from the first opening delimiter to the last closing one
fn locate(text: &str, shape: PayloadShape) -> Option<&str> {
    let (open, close) = shape.delimiters();
    let start = text.find(open)?;
    let end = text.rfind(close)?;

    (end > start).then(|| &text[start..=end])
}

/// Extract structured content from a raw reply
pub fn extract(raw: &str, schema: &ExtractionSchema) -> ExtractionResult {
    let unfenced = strip_code_fences(raw);

    let Some(candidate) = locate(&unfenced, schema.shape) else {
        debug!(reply = %preview(raw, 120), "No delimited payload found in reply");
        return ExtractionResult::Unrecoverable(raw.to_string());
    };

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return validate(value, schema, Vec::new(), raw);
    }

    let (repaired, repairs) = repair::apply(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => validate(value, schema, repairs, raw),
        Err(e) => {
            debug!(error = %e, ?repairs, reply = %preview(raw, 120), "Reply still unparsable after repairs");
            ExtractionResult::Unrecoverable(raw.to_string())
        }
    }
}

fn validate(value: Value, schema: &ExtractionSchema, repairs: Vec<RepairKind>, raw: &str) -> ExtractionResult {
    let candidates = match (schema.shape, value) {
        (PayloadShape::Array, Value::Array(elements)) => elements,
        (PayloadShape::Record, record @ Value::Object(_)) => vec![record],
        _ => Vec::new(),
    };

    let total = candidates.len();
    let mut items: Vec<Value> = candidates.into_iter().filter(|item| schema.accepts(item)).collect();
    if items.len() < total {
        debug!(kept = items.len(), dropped = total - items.len(), "Dropped records missing required fields");
    }

    if let Some(max_items) = schema.max_items {
        items.truncate(max_items);
    }

    if items.is_empty() {
        return ExtractionResult::Unrecoverable(raw.to_string());
    }

    if repairs.is_empty() {
        ExtractionResult::WellFormed(items)
    } else {
        ExtractionResult::Repaired { items, repairs }
    }
}
