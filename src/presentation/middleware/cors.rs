//! CORS Middleware Configuration
//!
//! Defaults to a restrictive policy (no cross-origin requests allowed)
//! unless origins are explicitly configured.

use axum::http::{header, Method};
use tower_http::cors::CorsLayer;

use crate::config::CorsSettings;

/// Create CORS layer from settings.
///
/// If no valid origins are configured this returns a policy that only allows
/// same-origin requests, so a misconfigured deployment fails closed.
pub fn create_cors_layer(settings: &CorsSettings) -> CorsLayer {
    let origins: Vec<_> = settings
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!(
            "No valid CORS origins configured. Cross-origin requests will be blocked. \
             Configure 'cors.allowed_origins' to allow specific origins."
        );
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
    } else {
        tracing::info!(
            origins = ?settings.allowed_origins,
            "CORS configured with {} allowed origins",
            origins.len()
        );
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
                header::ORIGIN,
            ])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    }
}
