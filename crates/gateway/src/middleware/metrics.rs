//! Per-request metrics

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use bracu_loop_common::metrics::RequestMetrics;

/// Count and time every routed request, labelled by route template
pub async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let timer = RequestMetrics::start(request.method().as_str(), &endpoint);
    let response = next.run(request).await;
    timer.finish(response.status().as_u16());

    response
}
