use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::credentials::Credentials;
use crate::image::ImageProvider;
use crate::providers::ProviderId;
use crate::types::{GeneratedImage, ImageRequest};
use crate::utils::http::check_status;
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
const DEFAULT_MIME_TYPE: &str = "image/png";

/// Gemini image backend. The only backend in the chain that accepts a
/// reference image, passed as an inline-data part next to the prompt.
#[derive(Clone)]
pub struct GeminiImage {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiImage {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn generate_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/models/{}:generateContent", self.model)
    }
}

impl Default for GeminiImage {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default, rename = "inlineData")]
    inline_data: Option<InlineData>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default, rename = "mimeType")]
    mime_type: Option<String>,
    data: String,
}

#[async_trait]
impl ImageProvider for GeminiImage {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn is_configured(&self, credentials: &Credentials) -> bool {
        credentials.gemini_api_key().is_some()
    }

    async fn generate(
        &self,
        request: &ImageRequest,
        credentials: &Credentials,
    ) -> Result<GeneratedImage> {
        let api_key = credentials
            .gemini_api_key()
            .ok_or(Error::MissingCredential {
                provider: ProviderId::Gemini,
            })?;

        let mut parts = vec![json!({ "text": request.prompt })];
        if let Some(reference) = &request.reference_image {
            parts.push(json!({
                "inlineData": {
                    "mimeType": reference.mime_type,
                    "data": reference.data_base64,
                }
            }));
        }

        let mut generation_config = json!({ "responseModalities": ["IMAGE", "TEXT"] });
        if let Some(ratio) = request.aspect_ratio {
            generation_config["imageConfig"] = json!({ "aspectRatio": ratio.as_str() });
        }

        let body: Value = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": generation_config,
        });

        let response = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed = response.json::<GenerateContentResponse>().await?;

        let parts = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default();

        let mut image: Option<(String, String)> = None;
        let mut description: Option<String> = None;
        for part in parts {
            if let Some(inline) = part.inline_data {
                if image.is_none() {
                    let mime_type = inline
                        .mime_type
                        .filter(|mime| !mime.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
                    image = Some((inline.data, mime_type));
                }
            } else if let Some(text) = part.text {
                let text = text.trim();
                if !text.is_empty() && description.is_none() {
                    description = Some(text.to_string());
                }
            }
        }

        let (image_base64, mime_type) = image.ok_or_else(|| {
            Error::InvalidResponse("gemini response contained no image part".to_string())
        })?;
        Ok(GeneratedImage {
            image_base64,
            mime_type,
            description,
            provider_used: ProviderId::Gemini,
        })
    }
}
