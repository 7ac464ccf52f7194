//! Request ID middleware
//!
//! Assigns a `X-Request-Id` UUID to every HTTP request, threads it into
//! a `tracing::Span` so downstream log lines carry the ID, and echoes
//! it back in the response header.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for the request correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// New-type wrapper for the request ID, stored in request extensions.
///
/// Extract in handlers: `Extension(RequestId(id)): Extension<RequestId>`
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// A caller-supplied ID is kept, so a booking flow spanning several
/// requests can be correlated end to end. Anything else gets a fresh
/// UUID v4.
fn correlation_id(request: &Request<Body>) -> String {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = correlation_id(&request);
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    );

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
