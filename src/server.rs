use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::credentials::Credentials;
use crate::router::ImageRouter;
use crate::routing::{ActionKind, RoutingTable};
use crate::text::{TextClient, TextErrorKind, TextProvider, TextRequest};
use crate::types::{AspectRatio, ImageRequest, ReferenceImage};

/// Shared handler state. Environment reads happen in
/// [`AppState::from_env`] at the composition point; handlers and core
/// logic only see the resolved values.
#[derive(Clone)]
pub struct AppState {
    image_router: Arc<ImageRouter>,
    text_client: Arc<TextClient>,
    credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(image_router: ImageRouter, text_client: TextClient, credentials: Credentials) -> Self {
        Self {
            image_router: Arc::new(image_router),
            text_client: Arc::new(text_client),
            credentials: Arc::new(credentials),
        }
    }

    pub fn from_env() -> crate::Result<Self> {
        let image_router = ImageRouter::with_default_providers(RoutingTable::default())?;
        Ok(Self::new(
            image_router,
            TextClient::new(),
            Credentials::from_env(),
        ))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/ai-generate-image",
            post(generate_image).options(preflight),
        )
        .route("/api/ai-generate", post(generate_text).options(preflight))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateImageBody {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    reference_image_base64: Option<String>,
    #[serde(default)]
    reference_mime_type: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    aspect_ratio: Option<AspectRatio>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateImageResponse {
    image_base64: String,
    mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    provider: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateTextBody {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    club_id: Option<String>,
    #[serde(default)]
    action: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

async fn health() -> Response {
    with_cors(Json(json!({ "status": "ok" })).into_response())
}

async fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type, authorization"),
    );
    response
}

async fn generate_image(
    State(state): State<AppState>,
    Json(body): Json<GenerateImageBody>,
) -> Response {
    if body.prompt.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "prompt is required");
    }
    // Configuration failure, caught before any provider call.
    if state.credentials.gemini_api_key().is_none() {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "GEMINI_API_KEY is not configured",
        );
    }

    let action = ActionKind::classify(body.action.as_deref().unwrap_or_default());
    let mut request = ImageRequest::new(action, body.prompt);
    request.aspect_ratio = body.aspect_ratio;
    if let Some(data_base64) = body
        .reference_image_base64
        .filter(|data| !data.trim().is_empty())
    {
        request.reference_image = Some(ReferenceImage {
            data_base64,
            mime_type: body
                .reference_mime_type
                .filter(|mime| !mime.trim().is_empty())
                .unwrap_or_else(|| "image/png".to_string()),
        });
    }

    match state.image_router.generate(&request, &state.credentials).await {
        Ok(image) => with_cors(
            Json(GenerateImageResponse {
                image_base64: image.image_base64,
                mime_type: image.mime_type,
                description: image.description,
                provider: image.provider_used.to_string(),
            })
            .into_response(),
        ),
        Err(err @ crate::Error::InvalidRequest(_)) => {
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
        Err(err) => error_response(StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

async fn generate_text(
    State(state): State<AppState>,
    Json(body): Json<GenerateTextBody>,
) -> Response {
    if body.prompt.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "prompt is required");
    }
    let provider = match body.provider.as_deref().filter(|raw| !raw.trim().is_empty()) {
        None => TextProvider::default(),
        Some(raw) => match TextProvider::parse(raw) {
            Some(provider) => provider,
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("unknown provider: {raw}"),
                );
            }
        },
    };
    if body.club_id.is_some() || body.action.is_some() {
        tracing::debug!(
            club_id = body.club_id.as_deref().unwrap_or(""),
            action = body.action.as_deref().unwrap_or(""),
            "text generation request metadata"
        );
    }

    let mut request = TextRequest::new(body.prompt).with_provider(provider);
    request.model = body.model;

    match state.text_client.generate(&request, &state.credentials).await {
        Ok(generated) => with_cors(
            Json(json!({
                "text": generated.text,
                "provider": generated.provider.as_str(),
                "model": generated.model,
            }))
            .into_response(),
        ),
        Err(err) => {
            let status = match err.kind {
                TextErrorKind::Auth => StatusCode::UNAUTHORIZED,
                TextErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                TextErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            error_response(status, err.user_message())
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    with_cors(
        (
            status,
            Json(ErrorBody {
                error: message.into(),
            }),
        )
            .into_response(),
    )
}

fn with_cors(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}
