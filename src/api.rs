//! JSON bodies exchanged over `POST /api/chat`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const CHAT_PATH: &str = "/api/chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    // Empty messages are let through to the backend.
    #[serde(default)]
    pub message: String,
    // Kept as text so unknown values reach the fallback route instead of failing to parse.
    // Non-string values are treated as absent.
    #[serde(
        default,
        deserialize_with = "lenient_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub mode: Option<String>,
}

fn lenient_mode<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(mode)) => Some(mode),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Either plain text or an object carrying `generated_text`.
    #[serde(default)]
    pub reply: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
