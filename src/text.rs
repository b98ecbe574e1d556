use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::credentials::Credentials;
use crate::utils::http::error_body;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextProvider {
    #[default]
    Gemini,
    OpenAi,
    Anthropic,
}

impl TextProvider {
    pub fn parse(raw: &str) -> Option<TextProvider> {
        match raw.trim() {
            "gemini" => Some(TextProvider::Gemini),
            "openai" => Some(TextProvider::OpenAi),
            "anthropic" => Some(TextProvider::Anthropic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextProvider::Gemini => "gemini",
            TextProvider::OpenAi => "openai",
            TextProvider::Anthropic => "anthropic",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            TextProvider::Gemini => "gemini-2.0-flash",
            TextProvider::OpenAi => "gpt-4o-mini",
            TextProvider::Anthropic => "claude-3-haiku-20240307",
        }
    }
}

impl fmt::Display for TextProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform retry behavior for the text client. Configuration, not
/// per-request state.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total tries, including the first attempt.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    /// Wall-clock bound per attempt; exceeding it aborts the in-flight
    /// call and counts as a retryable failure.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay applied before retrying after failed attempt `n` (1-based):
    /// `base_delay * multiplier^(n-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis((self.base_delay.as_millis() as f64 * factor) as u64)
    }
}

/// Stable failure classification used both for the retry decision and
/// for the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextErrorKind {
    Auth,
    RateLimited,
    Unavailable,
    Timeout,
    Quota,
    Invalid,
    Other,
}

impl TextErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TextErrorKind::RateLimited | TextErrorKind::Unavailable | TextErrorKind::Timeout
        )
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            TextErrorKind::Auth => {
                "The AI service is not configured correctly. Please check your API credentials."
            }
            TextErrorKind::RateLimited => {
                "The AI service rate limit was reached. Please try again shortly."
            }
            TextErrorKind::Unavailable => {
                "The AI service is temporarily unavailable. Please try again in a moment."
            }
            TextErrorKind::Timeout => "The request timed out. Please try a shorter prompt.",
            TextErrorKind::Quota => "The AI usage quota has been exceeded.",
            TextErrorKind::Invalid => "The request was invalid. Please try different input.",
            TextErrorKind::Other => "Content generation failed. Please try again.",
        }
    }
}

/// Tagged error carrying the classification and the raw detail, so
/// callers can always tell success from degradation. The user-facing
/// string lives behind [`TextError::user_message`].
#[derive(Debug, Error)]
#[error("text generation failed: {detail}")]
pub struct TextError {
    pub kind: TextErrorKind,
    pub detail: String,
}

impl TextError {
    fn new(kind: TextErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

/// Maps an HTTP status (when present) and error text onto the fixed
/// taxonomy. Status rows win over substring rows.
fn classify(status: Option<u16>, detail: &str) -> TextErrorKind {
    match status {
        Some(401) | Some(403) => TextErrorKind::Auth,
        Some(429) => TextErrorKind::RateLimited,
        Some(500) | Some(502) | Some(503) => TextErrorKind::Unavailable,
        Some(504) => TextErrorKind::Timeout,
        _ => {
            let lower = detail.to_ascii_lowercase();
            if lower.contains("quota") {
                TextErrorKind::Quota
            } else if lower.contains("invalid") {
                TextErrorKind::Invalid
            } else {
                TextErrorKind::Other
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextRequest {
    pub prompt: String,
    pub provider: TextProvider,
    pub model: Option<String>,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            provider: TextProvider::default(),
            model: None,
        }
    }

    pub fn with_provider(mut self, provider: TextProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextGeneration {
    pub text: String,
    pub provider: TextProvider,
    pub model: String,
}

/// Text-generation client over three interchangeable backends, with a
/// per-attempt timeout, exponential backoff between attempts, and
/// terminal failures aborting the retry budget immediately.
#[derive(Clone)]
pub struct TextClient {
    http: reqwest::Client,
    policy: RetryPolicy,
    gemini_base_url: String,
    openai_base_url: String,
    anthropic_base_url: String,
}

impl TextClient {
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        // No client-level timeout; the policy's per-attempt timeout is
        // the only wall-clock bound.
        Self {
            http: reqwest::Client::new(),
            policy,
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            openai_base_url: OPENAI_BASE_URL.to_string(),
            anthropic_base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_gemini_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.gemini_base_url = base_url.into();
        self
    }

    pub fn with_openai_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.openai_base_url = base_url.into();
        self
    }

    pub fn with_anthropic_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.anthropic_base_url = base_url.into();
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn generate(
        &self,
        request: &TextRequest,
        credentials: &Credentials,
    ) -> Result<TextGeneration, TextError> {
        if request.prompt.trim().is_empty() {
            return Err(TextError::new(
                TextErrorKind::Invalid,
                "prompt must not be empty",
            ));
        }
        let model = request
            .model
            .clone()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| request.provider.default_model().to_string());

        let mut attempt = 1u32;
        loop {
            let outcome = tokio::time::timeout(
                self.policy.attempt_timeout,
                self.invoke(request.provider, &model, &request.prompt, credentials),
            )
            .await;

            let err = match outcome {
                Ok(Ok(text)) => {
                    tracing::info!(provider = %request.provider, model = %model, attempt, "text generated");
                    return Ok(TextGeneration {
                        text,
                        provider: request.provider,
                        model,
                    });
                }
                Ok(Err(err)) => err,
                Err(_) => TextError::new(
                    TextErrorKind::Timeout,
                    format!(
                        "attempt timed out after {}s",
                        self.policy.attempt_timeout.as_secs_f64()
                    ),
                ),
            };

            let retryable = err.kind.is_retryable();
            tracing::warn!(
                provider = %request.provider,
                model = %model,
                attempt,
                retryable,
                error = %err.detail,
                "text generation attempt failed"
            );
            if !retryable || attempt >= self.policy.max_attempts {
                return Err(err);
            }
            tokio::time::sleep(self.policy.backoff_delay(attempt)).await;
            attempt += 1;
        }
    }

    async fn invoke(
        &self,
        provider: TextProvider,
        model: &str,
        prompt: &str,
        credentials: &Credentials,
    ) -> Result<String, TextError> {
        match provider {
            TextProvider::Gemini => self.invoke_gemini(model, prompt, credentials).await,
            TextProvider::OpenAi => self.invoke_openai(model, prompt, credentials).await,
            TextProvider::Anthropic => self.invoke_anthropic(model, prompt, credentials).await,
        }
    }

    async fn invoke_gemini(
        &self,
        model: &str,
        prompt: &str,
        credentials: &Credentials,
    ) -> Result<String, TextError> {
        let api_key = credentials
            .gemini_api_key()
            .ok_or_else(|| TextError::new(TextErrorKind::Auth, "GEMINI_API_KEY is not set"))?;
        let base = self.gemini_base_url.trim_end_matches('/');
        let url = format!("{base}/models/{model}:generateContent");
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let parsed: GeminiTextResponse = parse_response(response).await?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        non_empty_text(text, "gemini")
    }

    async fn invoke_openai(
        &self,
        model: &str,
        prompt: &str,
        credentials: &Credentials,
    ) -> Result<String, TextError> {
        let api_key = credentials
            .openai_api_key()
            .ok_or_else(|| TextError::new(TextErrorKind::Auth, "OPENAI_API_KEY is not set"))?;
        let base = self.openai_base_url.trim_end_matches('/');
        let url = format!("{base}/chat/completions");
        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let parsed: OpenAiChatResponse = parse_response(response).await?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();
        non_empty_text(text, "openai")
    }

    async fn invoke_anthropic(
        &self,
        model: &str,
        prompt: &str,
        credentials: &Credentials,
    ) -> Result<String, TextError> {
        let api_key = credentials
            .anthropic_api_key()
            .ok_or_else(|| TextError::new(TextErrorKind::Auth, "ANTHROPIC_API_KEY is not set"))?;
        let base = self.anthropic_base_url.trim_end_matches('/');
        let url = format!("{base}/v1/messages");
        let body = json!({
            "model": model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let parsed: AnthropicResponse = parse_response(response).await?;

        let text = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        non_empty_text(text, "anthropic")
    }
}

impl Default for TextClient {
    fn default() -> Self {
        Self::new()
    }
}

fn transport_error(err: reqwest::Error) -> TextError {
    let kind = if err.is_timeout() {
        TextErrorKind::Timeout
    } else if err.is_connect() {
        TextErrorKind::Unavailable
    } else {
        TextErrorKind::Other
    };
    TextError::new(kind, err.to_string())
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TextError> {
    let status = response.status();
    if !status.is_success() {
        let body = error_body(response).await;
        let kind = classify(Some(status.as_u16()), &body);
        return Err(TextError::new(kind, format!("http {}: {body}", status.as_u16())));
    }
    response
        .json::<T>()
        .await
        .map_err(|err| TextError::new(TextErrorKind::Other, err.to_string()))
}

fn non_empty_text(text: String, provider: &str) -> Result<String, TextError> {
    if text.trim().is_empty() {
        return Err(TextError::new(
            TextErrorKind::Other,
            format!("{provider} returned an empty response"),
        ));
    }
    Ok(text)
}

#[derive(Debug, Deserialize)]
struct GeminiTextResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    message: Option<OpenAiMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: Option<String>,
}
