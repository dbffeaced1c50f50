//! Quota response rendering.
//!
//! # Responsibilities
//! - Always answer 200, whatever the authentication outcome
//! - Carry the decision in the `user` and `ratelimit-remaining` headers

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

use crate::authority::{QuotaDecision, RATELIMIT_REMAINING, USER};

/// Build the 200 response for a quota decision.
///
/// A principal that cannot be represented as a header value is reported as
/// anonymous.
pub fn quota_response(decision: &QuotaDecision, body: String) -> Response {
    let user = HeaderValue::from_str(&decision.principal).unwrap_or_else(|_| {
        tracing::warn!(principal = ?decision.principal, "Principal not header-safe, reporting anonymous");
        HeaderValue::from_static("")
    });

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(USER, user);
    response
}
