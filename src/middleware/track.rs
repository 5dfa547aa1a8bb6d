use std::time::Instant;

use axum::{extract::Request, extract::State, middleware::Next, response::Response};

use crate::state::AppState;

/// Records latency and 5xx outcomes for every request into the metrics
/// collector.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state
        .metrics
        .record_request(start.elapsed(), response.status().is_server_error());
    response
}
