use http::request::Parts as ReqParts;
use http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS for the web client. `*` allows any origin, anything else is matched as an origin suffix
/// (e.g. `.example.com`).
pub fn cors(allowed: &str) -> CorsLayer {
    let allow_origin = if allowed == "*" {
        AllowOrigin::any()
    } else {
        let suffix = allowed.to_owned();
        AllowOrigin::predicate(move |org: &HeaderValue, _: &ReqParts| {
            org.as_bytes().ends_with(suffix.as_bytes())
        })
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(allow_origin)
}
