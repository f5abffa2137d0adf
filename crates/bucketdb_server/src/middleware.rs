//! HTTP middleware.

use crate::error::ApiError;
use axum::{
    body::HttpBody,
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;

/// Rejects requests that carry a body not declared as UTF-8 JSON.
///
/// A missing charset is accepted; any other charset is not.
pub async fn require_json_content_type(request: Request, next: Next) -> Response {
    let has_body = request.body().size_hint().exact() != Some(0);
    if has_body && !is_json(request.headers()) {
        return ApiError::UnsupportedMediaType.into_response();
    }
    next.run(request).await
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return false;
    };
    let Ok(value) = value.to_str() else {
        return false;
    };
    let Ok(media) = value.parse::<mime::Mime>() else {
        return false;
    };
    media.essence_str() == mime::APPLICATION_JSON.essence_str()
        && media
            .get_param(mime::CHARSET)
            .map_or(true, |charset| charset.as_str().eq_ignore_ascii_case("utf-8"))
}

/// Turns a handler panic into a 500 with the standard error body.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::internal(format!("handler panicked: {message}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn accepts_json() {
        assert!(is_json(&headers("application/json")));
        assert!(is_json(&headers("application/json; charset=UTF-8")));
        assert!(is_json(&headers("Application/JSON")));
    }

    #[test]
    fn rejects_other_types() {
        assert!(!is_json(&HeaderMap::new()));
        assert!(!is_json(&headers("text/plain")));
        assert!(!is_json(&headers("application/json; charset=latin1")));
        assert!(!is_json(&headers("not a media type")));
    }

    #[test]
    fn panic_becomes_internal_error() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
