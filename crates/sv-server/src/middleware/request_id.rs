//! Correlation IDs for assembly requests.
//!
//! A caller-supplied `x-request-id` is honoured when it is short and
//! printable; otherwise a fresh UUID is minted. The ID is stored in the
//! request extensions, attached to every log line of the job through a
//! tracing span, echoed on the response and copied into error bodies.

use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client-supplied ID we will carry into logs.
const MAX_CLIENT_ID_LEN: usize = 128;

/// The correlation ID of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Use the client's header value if acceptable, else mint one.
    fn resolve(header: Option<&HeaderValue>) -> Self {
        let client = header
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= MAX_CLIENT_ID_LEN)
            .filter(|v| v.chars().all(|c| c.is_ascii_graphic()));

        match client {
            Some(id) => Self(id.to_string()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn request_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    let id = RequestId::resolve(request.headers().get(&X_REQUEST_ID));
    request.extensions_mut().insert(id.clone());

    let span = tracing::info_span!("request", request_id = %id.as_str());
    let mut response = next.run(request).instrument(span).await;

    if let Ok(val) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), val);
    }

    response
}
