//! Typed quiz questions

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::extraction::ExtractionSchema;

/// Fields every generated question must carry
pub const QUESTION_FIELDS: [&str; 4] = ["question", "type", "correctAnswer", "explanation"];

/// Schema for an array of at most `count` questions
pub fn question_schema(count: usize) -> ExtractionSchema {
    ExtractionSchema::array().require(QUESTION_FIELDS).limit(count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    #[serde(alias = "multiple_choice", alias = "mcq")]
    MultipleChoice,
    #[serde(alias = "true_false", alias = "boolean")]
    TrueFalse,
    #[serde(alias = "short_answer", alias = "open")]
    ShortAnswer,
}

/// An answer option, either plain text or a labelled record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuizOption {
    Text(String),
    Record(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,

    #[serde(rename = "type")]
    pub kind: QuestionKind,

    #[serde(default, deserialize_with = "options_or_empty")]
    pub options: Vec<QuizOption>,

    /// Correct answer as text; booleans and numbers are rendered as strings
    #[serde(deserialize_with = "scalar_as_string")]
    pub correct_answer: String,

    pub explanation: String,
}

fn options_or_empty<'de, D>(deserializer: D) -> Result<Vec<QuizOption>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<QuizOption>>::deserialize(deserializer)?.unwrap_or_default())
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!("unsupported correctAnswer: {}", other))),
    }
}
