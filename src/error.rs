use thiserror::Error;

use crate::providers::ProviderId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("api error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("routing table error: {0}")]
    Routing(String),
    #[error("provider {provider} has no credentials")]
    MissingCredential { provider: ProviderId },
    #[error(
        "all providers exhausted for {action}: {attempted} attempted, {skipped} skipped, last error: {last}"
    )]
    ProvidersExhausted {
        action: String,
        attempted: usize,
        skipped: usize,
        last: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
