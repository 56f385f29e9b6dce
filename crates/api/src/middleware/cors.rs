use tower_http::cors::{Any, CorsLayer};

/// Build the CORS layer. The marketing frontend and dashboard may be served
/// from other origins, so every origin is allowed.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}
