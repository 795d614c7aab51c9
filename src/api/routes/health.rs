//! Health check endpoint

/// GET /health
///
/// Liveness only; no dependency is checked
pub async fn health_check() -> &'static str {
    "OK"
}
