use clap::Parser;
use thiserror::Error;
use crate::llm::LlmConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set; export it or add it to .env")]
    MissingApiKey,
    #[error("invalid server address '{0}'")]
    InvalidServerAddr(String),
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Browser chat front-end for the Gemini API", long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// API key for the Gemini API.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the Gemini API (override for proxies)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, the client falls back to the public endpoint
    pub chat_base_url: Option<String>,

    // --- Server Args ---
    /// Host address and port for the WebSocket server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Port for the HTTP server that serves the chat page.
    #[arg(long, env = "HTTP_PORT", default_value = "8501")]
    pub http_port: u16,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

impl Args {
    /// Checks everything that must hold before a session can be created.
    pub fn validate(&self) -> Result<LlmConfig, ConfigError> {
        let api_key = match &self.api_key {
            Some(k) if !k.trim().is_empty() => k.trim().to_string(),
            _ => {
                return Err(ConfigError::MissingApiKey);
            }
        };
        if self.server_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidServerAddr(self.server_addr.clone()));
        }

        Ok(LlmConfig {
            api_key,
            base_url: self.chat_base_url.clone().filter(|u| !u.trim().is_empty()),
        })
    }

    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["streamcraft-chat"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let mut a = args(&[]);
        a.api_key = None;
        assert_eq!(a.validate().unwrap_err(), ConfigError::MissingApiKey);
    }

    #[test]
    fn blank_api_key_is_fatal() {
        let a = args(&["--api-key", "   "]);
        assert_eq!(a.validate().unwrap_err(), ConfigError::MissingApiKey);
    }

    #[test]
    fn valid_key_produces_llm_config() {
        let a = args(&["--api-key", "secret", "--chat-base-url", "http://127.0.0.1:9000"]);
        let config = a.validate().unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.base_url.as_deref(), Some("http://127.0.0.1:9000"));
    }

    #[test]
    fn bad_server_addr_is_rejected() {
        let a = args(&["--api-key", "secret", "--server-addr", "nowhere"]);
        assert_eq!(
            a.validate().unwrap_err(),
            ConfigError::InvalidServerAddr("nowhere".into())
        );
    }

    #[test]
    fn debug_flag_raises_log_level() {
        assert_eq!(args(&["--debug"]).log_filter(), "debug");
        assert_eq!(args(&[]).log_filter(), "info");
    }
}
