use axum::http::{header, HeaderName};
use tower_http::cors::{Any, CorsLayer};

pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Any origin may call the API; export and resume downloads expose their file name.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any)
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static(WEBHOOK_SIGNATURE_HEADER),
        ])
}
