use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::credentials::Credentials;
use crate::image::ImageProvider;
use crate::providers::ProviderId;
use crate::types::{GeneratedImage, ImageRequest};
use crate::utils::http::check_status;
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "imagen-3.0-generate-002";
const DEFAULT_MIME_TYPE: &str = "image/png";

/// Imagen backend via the `:predict` surface. Shares the Gemini API key
/// family, so it is available whenever the Gemini backend is.
#[derive(Clone)]
pub struct Imagen {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl Imagen {
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

    fn predict_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/models/{}:predict", self.model)
    }
}

impl Default for Imagen {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default, rename = "bytesBase64Encoded")]
    bytes_base64_encoded: Option<String>,
    #[serde(default, rename = "mimeType")]
    mime_type: Option<String>,
}

#[async_trait]
impl ImageProvider for Imagen {
    fn id(&self) -> ProviderId {
        ProviderId::Imagen
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
                provider: ProviderId::Imagen,
            })?;

        if request.reference_image.is_some() {
            // The predict surface has no image-conditioning input.
            tracing::debug!(action = %request.action, "imagen ignores reference image");
        }

        let aspect_ratio = request.aspect_ratio.unwrap_or_default();
        let body = json!({
            "instances": [{ "prompt": request.prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": aspect_ratio.as_str(),
            }
        });

        let response = self
            .http
            .post(self.predict_url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed = response.json::<PredictResponse>().await?;

        let prediction = parsed
            .predictions
            .into_iter()
            .find(|prediction| prediction.bytes_base64_encoded.is_some())
            .ok_or_else(|| {
                Error::InvalidResponse("imagen response contained no image".to_string())
            })?;

        let image_base64 = prediction
            .bytes_base64_encoded
            .filter(|data| !data.is_empty())
            .ok_or_else(|| {
                Error::InvalidResponse("imagen returned an empty image payload".to_string())
            })?;
        let mime_type = prediction
            .mime_type
            .filter(|mime| !mime.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        Ok(GeneratedImage {
            image_base64,
            mime_type,
            description: None,
            provider_used: ProviderId::Imagen,
        })
    }
}
