pub mod chat;
use serde::Serialize;

pub const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Sampling parameters sent with every request. Not runtime-configurable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: &'static str,
}

pub const GENERATION_CONFIG: GenerationConfig = GenerationConfig {
    temperature: 1.0,
    top_p: 0.95,
    top_k: 64,
    max_output_tokens: 8192,
    response_mime_type: "text/plain",
};

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: Option<String>,
}
