//! Wire format of the generation endpoint

use serde::{Deserialize, Serialize};

use crate::core::Voice;

/// Request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody<'a> {
    pub message: &'a str,

    pub system_prompt: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub generate_audio: bool,
}

/// Reply body; exactly one field is expected to be set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReplyBody {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub audio_url: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}
