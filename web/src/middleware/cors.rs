use axum::http::{header, HeaderValue, Method};
use log::*;
use service::config::Config;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Configure CORS from the `allowed_origins` setting.
///
/// `*` (or an empty list) allows any origin; otherwise only the listed origins
/// receive responses. Entries that are not valid header values are skipped.
pub fn setup_cors(config: &Config) -> CorsLayer {
    let allow_origin = if config.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| {
                let trimmed = origin.trim();
                HeaderValue::from_str(trimmed)
                    .inspect_err(|_| warn!("Ignoring invalid CORS origin {trimmed:?}"))
                    .ok()
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::CACHE_CONTROL,
            header::HeaderName::from_static("last-event-id"),
        ])
}
