//! Per-route request metrics.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::http::request::request_id;
use crate::observability::metrics;

/// Records status and latency against the matched route template.
///
/// Must be installed with `route_layer` so `MatchedPath` is populated.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let id = request_id(&request).to_owned();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    tracing::debug!(request_id = %id, route = %route, status, elapsed = ?start.elapsed(), "Request completed");
    metrics::record_request(&route, status, start);
    response
}
