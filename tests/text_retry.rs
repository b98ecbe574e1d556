use std::time::{Duration, Instant};

use httpmock::{Method::POST, MockServer};
use pitchside::{Credentials, RetryPolicy, TextClient, TextErrorKind, TextProvider, TextRequest};
use serde_json::json;

fn can_bind_localhost() -> bool {
    match std::net::TcpListener::bind(("127.0.0.1", 0)) {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => false,
        Err(err) => panic!("failed to bind localhost for httpmock tests: {err}"),
    }
}

fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(300),
        backoff_multiplier: 2.0,
        attempt_timeout: Duration::from_secs(2),
    }
}

const GEMINI_PATH: &str = "/models/gemini-2.0-flash:generateContent";

fn gemini_success_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
}

#[tokio::test]
async fn transient_503_is_retried_after_backoff() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(POST).path(GEMINI_PATH);
            then.status(503).body("upstream unavailable");
        })
        .await;

    let client = TextClient::with_policy(quick_policy()).with_gemini_base_url(server.base_url());
    let credentials = Credentials::new().with_gemini_api_key("test-key");
    let request = TextRequest::new("preview Saturday's fixture");

    let started = Instant::now();
    let call = tokio::spawn(async move { client.generate(&request, &credentials).await });

    // Let the first attempt hit the failing mock, then swap in success
    // for the retry.
    tokio::time::sleep(Duration::from_millis(100)).await;
    failing.delete_async().await;
    let success = server
        .mock_async(|when, then| {
            when.method(POST).path(GEMINI_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(gemini_success_body("Big game under the lights."));
        })
        .await;

    let generated = call
        .await
        .expect("task completes")
        .expect("second attempt succeeds");
    assert_eq!(generated.text, "Big game under the lights.");
    assert_eq!(generated.model, "gemini-2.0-flash");
    assert!(
        started.elapsed() >= Duration::from_millis(300),
        "retry must wait at least base_delay, elapsed {:?}",
        started.elapsed()
    );
    success.assert_async().await;
}

#[tokio::test]
async fn attempt_timeout_is_retryable() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    let slow = server
        .mock_async(|when, then| {
            when.method(POST).path(GEMINI_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(gemini_success_body("too late"))
                .delay(Duration::from_millis(800));
        })
        .await;

    let policy = RetryPolicy {
        attempt_timeout: Duration::from_millis(150),
        base_delay: Duration::from_millis(200),
        ..quick_policy()
    };
    let client = TextClient::with_policy(policy).with_gemini_base_url(server.base_url());
    let credentials = Credentials::new().with_gemini_api_key("test-key");
    let request = TextRequest::new("match report for the derby");

    let call = tokio::spawn(async move { client.generate(&request, &credentials).await });

    // First attempt times out at 150ms; replace the slow mock before the
    // retry fires at ~350ms.
    tokio::time::sleep(Duration::from_millis(250)).await;
    slow.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(GEMINI_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(gemini_success_body("Derby day report."));
        })
        .await;

    let generated = call
        .await
        .expect("task completes")
        .expect("retry after timeout succeeds");
    assert_eq!(generated.text, "Derby day report.");
}

#[tokio::test]
async fn auth_failure_aborts_without_retrying() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    let unauthorized = server
        .mock_async(|when, then| {
            when.method(POST).path(GEMINI_PATH);
            then.status(401).body("API key not valid");
        })
        .await;

    let client = TextClient::with_policy(quick_policy()).with_gemini_base_url(server.base_url());
    let credentials = Credentials::new().with_gemini_api_key("bad-key");
    let request = TextRequest::new("caption for the new signing");

    let started = Instant::now();
    let err = client
        .generate(&request, &credentials)
        .await
        .expect_err("401 is terminal");
    assert_eq!(err.kind, TextErrorKind::Auth);
    assert_eq!(err.user_message(), TextErrorKind::Auth.user_message());
    unauthorized.assert_async().await;
    assert!(
        started.elapsed() < Duration::from_millis(300),
        "no backoff delay should be consumed"
    );
}

#[tokio::test]
async fn exhausted_retries_surface_unavailable_kind() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    let failing = server
        .mock_async(|when, then| {
            when.method(POST).path(GEMINI_PATH);
            then.status(503).body("maintenance window");
        })
        .await;

    let policy = RetryPolicy {
        base_delay: Duration::from_millis(10),
        ..quick_policy()
    };
    let client = TextClient::with_policy(policy).with_gemini_base_url(server.base_url());
    let credentials = Credentials::new().with_gemini_api_key("test-key");
    let request = TextRequest::new("season ticket announcement");

    let err = client
        .generate(&request, &credentials)
        .await
        .expect_err("all attempts fail");
    assert_eq!(err.kind, TextErrorKind::Unavailable);
    failing.assert_calls_async(3).await;
}

#[tokio::test]
async fn quota_body_on_unmapped_status_is_terminal() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    let quota = server
        .mock_async(|when, then| {
            when.method(POST).path(GEMINI_PATH);
            then.status(400).body("Quota exceeded for project");
        })
        .await;

    let client = TextClient::with_policy(quick_policy()).with_gemini_base_url(server.base_url());
    let credentials = Credentials::new().with_gemini_api_key("test-key");
    let request = TextRequest::new("transfer news graphic copy");

    let err = client
        .generate(&request, &credentials)
        .await
        .expect_err("quota is terminal");
    assert_eq!(err.kind, TextErrorKind::Quota);
    quota.assert_async().await;
}

#[tokio::test]
async fn missing_key_fails_before_any_network_call() {
    let client = TextClient::with_policy(quick_policy())
        .with_gemini_base_url("http://127.0.0.1:9/unreachable");
    let request = TextRequest::new("matchday hype post");

    let err = client
        .generate(&request, &Credentials::new())
        .await
        .expect_err("no key configured");
    assert_eq!(err.kind, TextErrorKind::Auth);
    assert!(err.detail.contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn openai_uses_bearer_auth_and_default_model() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    let chat = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer sk-test");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "choices": [{ "message": { "content": "Three points secured." } }]
                }));
        })
        .await;

    let client = TextClient::with_policy(quick_policy()).with_openai_base_url(server.base_url());
    let credentials = Credentials::new().with_openai_api_key("sk-test");
    let request = TextRequest::new("full-time summary").with_provider(TextProvider::OpenAi);

    let generated = client
        .generate(&request, &credentials)
        .await
        .expect("openai call succeeds");
    assert_eq!(generated.text, "Three points secured.");
    assert_eq!(generated.provider, TextProvider::OpenAi);
    assert_eq!(generated.model, "gpt-4o-mini");
    chat.assert_async().await;
}

#[tokio::test]
async fn anthropic_joins_content_blocks() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "ak-test")
                .header("anthropic-version", "2023-06-01");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "content": [
                        { "type": "text", "text": "Up the club! " },
                        { "type": "text", "text": "See you Saturday." }
                    ]
                }));
        })
        .await;

    let client = TextClient::with_policy(quick_policy()).with_anthropic_base_url(server.base_url());
    let credentials = Credentials::new().with_anthropic_api_key("ak-test");
    let request = TextRequest::new("fan newsletter intro")
        .with_provider(TextProvider::Anthropic)
        .with_model("claude-3-haiku-20240307");

    let generated = client
        .generate(&request, &credentials)
        .await
        .expect("anthropic call succeeds");
    assert_eq!(generated.text, "Up the club! See you Saturday.");
}
