use async_trait::async_trait;
use log::{ debug, info };
use reqwest::StatusCode;
use serde::{ Deserialize, Serialize };
use url::Url;

use super::{ ChatClient, ChatError, Generation };
use crate::history::{ ApiRole, HistoryEntry };
use crate::llm::{ GenerationConfig, LlmConfig, DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, GENERATION_CONFIG };

/// Finish reasons that mean the candidate ran to its natural end.
const COMPLETE_FINISH_REASONS: [&str; 3] = ["STOP", "MAX_TOKENS", "FINISH_REASON_UNSPECIFIED"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<HistoryEntry>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    prompt_feedback: Option<GooglePromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GoogleCandidate {
    content: Option<GoogleContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize, Debug)]
struct GooglePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GooglePromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    message: String,
}

fn interpret_response(resp: GenerateContentResponse) -> Result<Generation, ChatError> {
    let candidate = match resp.candidates.into_iter().next() {
        Some(c) => c,
        None => {
            return match resp.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => Err(ChatError::Blocked(reason)),
                None => Err(ChatError::EmptyResponse),
            };
        }
    };

    let text: String = candidate.content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "NONE".to_string());
        return Err(ChatError::EmptyCandidate { reason });
    }

    match candidate.finish_reason {
        Some(reason) if !COMPLETE_FINISH_REASONS.contains(&reason.as_str()) => {
            Ok(Generation::Stopped { partial: text, reason })
        }
        _ => Ok(Generation::Complete(text)),
    }
}

fn error_from_status(status: StatusCode, body: &str) -> ChatError {
    let message = serde_json
        ::from_str::<GoogleErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let status = status.as_u16();
    match status {
        401 | 403 => ChatError::Auth { status, message },
        _ => ChatError::Api { status, message },
    }
}

fn endpoint(base_url: &str, model: &str) -> Result<Url, url::ParseError> {
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
    base.join(&format!("v1beta/models/{}:generateContent", model))
}

pub struct GeminiChatClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: Url,
}

impl GeminiChatClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, ChatError> {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let endpoint = endpoint(&base_url, DEFAULT_CHAT_MODEL)?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            model: DEFAULT_CHAT_MODEL.to_string(),
            endpoint,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ChatError> {
        Self::new(config.api_key.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn generate(
        &self,
        history: &[HistoryEntry],
        query: &str
    ) -> Result<Generation, ChatError> {
        let mut contents = history.to_vec();
        contents.push(HistoryEntry::new(ApiRole::User, query));
        let payload = GenerateContentRequest {
            contents,
            generation_config: GENERATION_CONFIG,
        };

        info!(
            "GeminiChatClient::generate() → model={} history_len={}",
            self.model,
            history.len()
        );

        let resp = self.http
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        debug!("Gemini responded with HTTP {} ({} bytes)", status, body.len());

        if !status.is_success() {
            return Err(error_from_status(status, &body));
        }

        let parsed: GenerateContentResponse = serde_json
            ::from_str(&body)
            .map_err(|e| ChatError::Decode(e.to_string()))?;
        interpret_response(parsed)
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn stop_finish_reason_is_complete() {
        let resp = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"4"}]},"finishReason":"STOP"}]}"#
        );
        assert_eq!(interpret_response(resp).unwrap(), Generation::Complete("4".into()));
    }

    #[test]
    fn parts_are_concatenated() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world"}]}}]}"#
        );
        assert_eq!(interpret_response(resp).unwrap(), Generation::Complete("Hello, world".into()));
    }

    #[test]
    fn safety_stop_keeps_partial_text() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"partial answer"}]},"finishReason":"SAFETY"}]}"#
        );
        assert_eq!(interpret_response(resp).unwrap(), Generation::Stopped {
            partial: "partial answer".into(),
            reason: "SAFETY".into(),
        });
    }

    #[test]
    fn stopped_candidate_without_content_is_an_error() {
        let resp = parse(r#"{"candidates":[{"finishReason":"RECITATION"}]}"#);
        assert!(
            matches!(interpret_response(resp), Err(ChatError::EmptyCandidate { reason }) if reason == "RECITATION")
        );
    }

    #[test]
    fn empty_text_part_is_an_error() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":""}]},"finishReason":"SAFETY"}]}"#
        );
        assert!(matches!(interpret_response(resp), Err(ChatError::EmptyCandidate { .. })));
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let resp = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert!(matches!(interpret_response(resp), Err(ChatError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn no_candidates_is_an_error() {
        assert!(matches!(interpret_response(parse("{}")), Err(ChatError::EmptyResponse)));
    }

    #[test]
    fn auth_statuses_map_to_auth_error() {
        let body = r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#;
        match error_from_status(StatusCode::FORBIDDEN, body) {
            ChatError::Auth { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unstructured_error_body_is_kept() {
        match error_from_status(StatusCode::BAD_GATEWAY, " upstream down\n") {
            ChatError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn endpoint_targets_generate_content() {
        let url = endpoint("https://generativelanguage.googleapis.com/", "gemini-1.5-pro").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn request_carries_static_generation_config() {
        let payload = GenerateContentRequest {
            contents: vec![HistoryEntry::new(ApiRole::User, "hi")],
            generation_config: GENERATION_CONFIG,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["generationConfig"]["topK"], 64);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(json["generationConfig"]["responseMimeType"], "text/plain");
        assert_eq!(json["contents"][0]["role"], "user");
    }
}
