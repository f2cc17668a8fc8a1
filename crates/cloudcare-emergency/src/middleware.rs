use axum::{
    Json,
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cloudcare_api::ErrorResponse;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// Request ID middleware: generates or propagates X-Request-Id header.
// A generated id is written back onto the request so the access-log span
// and handlers see the same value the client receives.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let req_id_value = match req.headers().get(&header_name) {
        Some(value) => value.clone(),
        None => match HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            Ok(value) => {
                req.headers_mut().insert(header_name.clone(), value.clone());
                value
            }
            Err(_) => return next.run(req).await,
        },
    };

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

// Content negotiation middleware: accept JSON (and the event stream) for
// Accept, and require JSON for POST/PUT/PATCH bodies.
pub async fn content_negotiation(req: Request<Body>, next: Next) -> Response {
    let accepts_hdr = req
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok());
    let accept_ok = accepts_hdr
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("application/json")
                || v.contains("text/event-stream")
                || v.contains("*/*")
        })
        .unwrap_or(true); // if missing, treat as ok per HTTP defaults

    if !accept_ok {
        return error_response(
            StatusCode::NOT_ACCEPTABLE,
            "not_acceptable",
            "Only application/json or text/event-stream can be served",
        );
    }

    let method = req.method().clone();
    let has_body = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|len| len > 0)
        .unwrap_or_else(|| req.headers().contains_key(header::TRANSFER_ENCODING));
    let needs_body_type = method == Method::POST
        || ((method == Method::PUT || method == Method::PATCH) && has_body);

    if needs_body_type {
        let content_ok = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false);
        if !content_ok {
            return error_response(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                "Content-Type must be application/json",
            );
        }
    }

    next.run(req).await
}

fn error_response(status: StatusCode, error: &str, detail: &str) -> Response {
    (
        status,
        Json(ErrorResponse::new(error, Some(detail.to_string()))),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::to_bytes, http::HeaderMap, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    fn echo_app() -> Router {
        async fn echo(headers: HeaderMap) -> String {
            headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        }
        Router::new()
            .route("/echo", get(echo))
            .layer(from_fn(request_id))
    }

    #[tokio::test]
    async fn generated_request_id_is_visible_downstream() {
        let resp = echo_app()
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let sent = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let seen = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(Uuid::parse_str(&sent).is_ok());
        assert_eq!(seen, sent.as_bytes());
    }

    #[tokio::test]
    async fn incoming_request_id_is_preserved() {
        let resp = echo_app()
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header(REQUEST_ID_HEADER, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.headers().get(REQUEST_ID_HEADER).unwrap(), "req-42");
        let seen = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(seen, "req-42".as_bytes());
    }
}
