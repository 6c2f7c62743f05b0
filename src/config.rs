//! Client configuration: where the backend lives and how requests are shaped.

/// Default backend location for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable consulted by [`ApiConfig::from_env`].
pub const BASE_URL_ENV: &str = "LEXQUERY_API_BASE_URL";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
// Summarization and Q&A run a language model server-side; give them room.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Configuration for the HTTP gateway.
///
/// The identity collaborator is external: when it hands out a bearer
/// credential, attach it here and every request carries it.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Read the base URL from `LEXQUERY_API_BASE_URL`, falling back to the
    /// local development default.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url)
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
