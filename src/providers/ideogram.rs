use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;

use crate::credentials::Credentials;
use crate::image::ImageProvider;
use crate::providers::ProviderId;
use crate::types::{GeneratedImage, ImageRequest};
use crate::utils::http::{check_status, download_limited};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.ideogram.ai";
const RENDERING_SPEED: &str = "DEFAULT";
const DEFAULT_MIME_TYPE: &str = "image/png";

/// Ideogram v3 backend, the text-accurate option in the chain. The API
/// returns a hosted URL, so the adapter downloads the image and
/// re-encodes it to base64 to match the common result shape.
#[derive(Clone)]
pub struct Ideogram {
    http: reqwest::Client,
    base_url: String,
}

impl Ideogram {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
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

    fn generate_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/v1/ideogram-v3/generate")
    }
}

impl Default for Ideogram {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct IdeogramResponse {
    #[serde(default)]
    data: Vec<IdeogramImage>,
}

#[derive(Debug, Deserialize)]
struct IdeogramImage {
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl ImageProvider for Ideogram {
    fn id(&self) -> ProviderId {
        ProviderId::Ideogram
    }

    fn is_configured(&self, credentials: &Credentials) -> bool {
        credentials.ideogram_api_key().is_some()
    }

    async fn generate(
        &self,
        request: &ImageRequest,
        credentials: &Credentials,
    ) -> Result<GeneratedImage> {
        let api_key = credentials
            .ideogram_api_key()
            .ok_or(Error::MissingCredential {
                provider: ProviderId::Ideogram,
            })?;

        if request.reference_image.is_some() {
            tracing::debug!(action = %request.action, "ideogram ignores reference image");
        }

        let aspect_ratio = request.aspect_ratio.unwrap_or_default();
        let body = json!({
            "prompt": request.prompt,
            "aspect_ratio": aspect_ratio.ideogram_format(),
            "rendering_speed": RENDERING_SPEED,
        });

        let response = self
            .http
            .post(self.generate_url())
            .header("Api-Key", api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed = response.json::<IdeogramResponse>().await?;

        let url = parsed
            .data
            .into_iter()
            .find_map(|image| image.url.filter(|url| !url.trim().is_empty()))
            .ok_or_else(|| {
                Error::InvalidResponse("ideogram response contained no image url".to_string())
            })?;

        let download = self.http.get(&url).send().await?;
        let download = check_status(download).await?;
        let mime_type = download
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();
        let bytes = download_limited(download).await?;
        if bytes.is_empty() {
            return Err(Error::InvalidResponse(
                "ideogram image download was empty".to_string(),
            ));
        }

        Ok(GeneratedImage {
            image_base64: BASE64.encode(&bytes),
            mime_type,
            description: None,
            provider_used: ProviderId::Ideogram,
        })
    }
}
