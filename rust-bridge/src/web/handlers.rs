//! Webhook endpoint handlers.
//!
//! The SNS endpoint processes each notification to completion before
//! answering: SNS retries on non-2xx, so a 500 is only returned when the
//! whole request should be redelivered.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use futures::FutureExt;
use serde::Serialize;
use tracing::{error, info};

use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::RequestError;
use crate::logging::FATAL_TARGET;
use crate::sns::{parse, preview};

/// Characters of the raw body kept in the receipt log entry.
pub const BODY_LOG_LIMIT: usize = 1000;

pub const SUCCESS_BODY: &str = "Request processed successfully";
pub const ERROR_BODY: &str = "Error processing request";
pub const FATAL_BODY: &str = "Fatal error occurred";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// SNS Webhook
// =============================================================================

/// SNS webhook endpoint. Accepts any method; only the body matters.
pub async fn sns_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    handle_request(&state.dispatcher, &body).await
}

/// Process one raw request body and pick the response.
pub async fn handle_request(dispatcher: &Dispatcher, body: &[u8]) -> (StatusCode, &'static str) {
    respond(process(dispatcher, body)).await
}

/// Map the outcome of a request pipeline to a status and body.
///
/// Parse and confirmation failures answer 500 with an error entry; a panic
/// anywhere inside `pipeline` answers 500 with a FATAL entry. Everything
/// else is 200, whatever happened to individual recipients.
pub async fn respond<F>(pipeline: F) -> (StatusCode, &'static str)
where
    F: Future<Output = Result<DispatchOutcome, RequestError>>,
{
    match AssertUnwindSafe(pipeline).catch_unwind().await {
        Ok(Ok(outcome)) => {
            info!(outcome = ?outcome, "request_processed");
            (StatusCode::OK, SUCCESS_BODY)
        }
        Ok(Err(e)) => {
            error!(error = %e, "request_failed");
            (StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY)
        }
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(target: FATAL_TARGET, error = %reason, "request_panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, FATAL_BODY)
        }
    }
}

async fn process(dispatcher: &Dispatcher, body: &[u8]) -> Result<DispatchOutcome, RequestError> {
    let text = String::from_utf8_lossy(body);
    info!(
        body_length = body.len(),
        body_preview = %preview(&text, BODY_LOG_LIMIT),
        "sns_webhook_received"
    );

    let envelope = parse(body)?;
    Ok(dispatcher.dispatch(envelope).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{AuditFormat, AuditLog};
    use crate::mautic::MauticClient;
    use reqwest::Client;
    use tracing_subscriber::layer::SubscriberExt;
    use wiremock::matchers::{any, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_dispatcher(mautic_url: &str) -> Dispatcher {
        let http = Client::new();
        Dispatcher::new(http.clone(), MauticClient::new(http, mautic_url, "api", "secret"))
    }

    #[tokio::test]
    async fn test_empty_body_returns_500() {
        let dispatcher = create_dispatcher("http://127.0.0.1:1");

        let (status, body) = handle_request(&dispatcher, b"").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, ERROR_BODY);
    }

    #[tokio::test]
    async fn test_invalid_json_returns_500() {
        let dispatcher = create_dispatcher("http://127.0.0.1:1");

        let (status, _) = handle_request(&dispatcher, b"{\"Type\": ").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_subscription_confirmation_issues_one_get() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscribe"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = create_dispatcher("http://127.0.0.1:1");
        let body = serde_json::json!({
            "Type": "SubscriptionConfirmation",
            "SubscribeURL": format!("{}/subscribe", mock_server.uri()),
        })
        .to_string();

        let (status, response) = handle_request(&dispatcher, body.as_bytes()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, SUCCESS_BODY);
    }

    #[tokio::test]
    async fn test_unreachable_subscription_url_returns_500() {
        let dispatcher = create_dispatcher("http://127.0.0.1:1");
        let body = br#"{"Type":"SubscriptionConfirmation","SubscribeURL":"http://127.0.0.1:1/subscribe"}"#;

        let (status, response) = handle_request(&dispatcher, body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response, ERROR_BODY);
    }

    #[tokio::test]
    async fn test_bounce_example() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .and(query_param("search", "a@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "contacts": { "12": { "id": 12 } }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/contacts/12/dnc/email/add"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = create_dispatcher(&mock_server.uri());
        let body = br#"{"Type":"Notification","Message":"{\"notificationType\":\"Bounce\",\"bounce\":{\"bounceType\":\"Permanent\",\"bouncedRecipients\":[{\"emailAddress\":\"a@example.com\"}]}}"}"#;

        let (status, _) = handle_request(&dispatcher, body).await;

        assert_eq!(status, StatusCode::OK);
        let requests = mock_server.received_requests().await.unwrap();
        let dnc: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(dnc["reason"], 1);
    }

    #[tokio::test]
    async fn test_recipient_failures_still_return_200() {
        let dispatcher = create_dispatcher("http://127.0.0.1:1");
        let body = br#"{"Type":"Notification","Message":"{\"notificationType\":\"Complaint\",\"complaint\":{\"complainedRecipients\":[{\"emailAddress\":\"a@example.com\"},{\"emailAddress\":\"b@example.com\"}]}}"}"#;

        let (status, response) = handle_request(&dispatcher, body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response, SUCCESS_BODY);
    }

    #[tokio::test]
    async fn test_unknown_type_returns_200_without_calls() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let dispatcher = create_dispatcher(&mock_server.uri());

        let (status, _) = handle_request(&dispatcher, br#"{"Type":"Mystery"}"#).await;
        assert_eq!(status, StatusCode::OK);

        let body = br#"{"Type":"Notification","Message":"{\"notificationType\":\"Delivery\"}"}"#;
        let (status, _) = handle_request(&dispatcher, body).await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn exploding_pipeline() -> Result<DispatchOutcome, RequestError> {
        panic!("contact store exploded")
    }

    #[tokio::test]
    async fn test_panic_returns_fatal_500() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("sns-log.txt"), 1024 * 1024);
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .event_format(AuditFormat)
                .with_writer(log.clone()),
        );
        // current_thread runtime: the thread-local default covers the whole test
        let _guard = tracing::subscriber::set_default(subscriber);

        let (status, body) = respond(exploding_pipeline()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, FATAL_BODY);

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("[FATAL] request_panicked"));
        assert!(contents.contains("contact store exploded"));
    }

    #[tokio::test]
    async fn test_respond_maps_errors_and_success() {
        let (status, body) = respond(async { Ok(DispatchOutcome::Ignored) }).await;
        assert_eq!((status, body), (StatusCode::OK, SUCCESS_BODY));

        let (status, body) =
            respond(async { Err(RequestError::from(crate::error::ParseError::Empty)) }).await;
        assert_eq!((status, body), (StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY));
    }
}
