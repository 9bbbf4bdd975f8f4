//! Request ID middleware for request tracing.
//!

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header name for request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID stored in request extensions for downstream access.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Middleware that ensures every request has a unique request ID.
///
/// An incoming `x-request-id` header is kept (if it is non-empty and at most
/// 128 bytes); otherwise a UUID v4 is generated. The ID is stored in request
/// extensions and echoed on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Router, routing::get};
    use tokio::net::TcpListener;

    async fn echo(Extension(RequestId(id)): Extension<RequestId>) -> String {
        id
    }

    async fn spawn_app() -> String {
        let app = Router::new()
            .route("/", get(echo))
            .layer(axum::middleware::from_fn(request_id_middleware));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_generates_id_when_missing() {
        let url = spawn_app().await;
        let response = reqwest::get(&url).await.unwrap();

        let header = response.headers().get(REQUEST_ID_HEADER).unwrap().clone();
        let body = response.text().await.unwrap();
        assert!(Uuid::parse_str(header.to_str().unwrap()).is_ok());
        assert_eq!(header.to_str().unwrap(), body);
    }

    #[tokio::test]
    async fn test_keeps_incoming_id() {
        let url = spawn_app().await;
        let response = reqwest::Client::new()
            .get(&url)
            .header(REQUEST_ID_HEADER, "abc-123")
            .send()
            .await
            .unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "abc-123");
        assert_eq!(response.text().await.unwrap(), "abc-123");
    }
}
