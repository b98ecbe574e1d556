use bytes::Bytes;
use futures_util::StreamExt;

use crate::{Error, Result};

const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;
const MAX_DOWNLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Reads an upstream error body with a hard size cap so a misbehaving
/// backend cannot balloon an error value. Best-effort: a transport
/// error while reading yields a placeholder instead of failing the
/// caller's error path.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    match read_limited(response, MAX_ERROR_BODY_BYTES).await {
        Ok((bytes, truncated)) => {
            let mut body = String::from_utf8_lossy(&bytes).into_owned();
            if truncated {
                body.push_str("...(truncated)");
            }
            body
        }
        Err(err) => format!("(error body unreadable: {err})"),
    }
}

/// Passes a successful response through; turns anything else into
/// `Error::Api` with the truncated body attached.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = error_body(response).await;
    Err(Error::Api { status, body })
}

/// Downloads a response body, failing rather than truncating when the
/// payload exceeds the cap. A transport error mid-stream is an error:
/// a partial image must never surface as a successful download.
pub(crate) async fn download_limited(response: reqwest::Response) -> Result<Bytes> {
    let (bytes, truncated) = read_limited(response, MAX_DOWNLOAD_BYTES).await?;
    if truncated {
        return Err(Error::InvalidResponse(format!(
            "image download exceeded {MAX_DOWNLOAD_BYTES} bytes"
        )));
    }
    Ok(bytes)
}

async fn read_limited(response: reqwest::Response, max_bytes: usize) -> Result<(Bytes, bool)> {
    let mut out = Vec::<u8>::new();
    let mut truncated = false;

    let mut stream = response.bytes_stream();
    while let Some(next) = stream.next().await {
        let chunk = next?;
        let remaining = max_bytes.saturating_sub(out.len());
        if remaining == 0 {
            truncated = true;
            break;
        }
        if chunk.len() <= remaining {
            out.extend_from_slice(chunk.as_ref());
        } else {
            out.extend_from_slice(&chunk.as_ref()[..remaining]);
            truncated = true;
            break;
        }
    }
    Ok((Bytes::from(out), truncated))
}
