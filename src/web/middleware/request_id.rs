//! Per-request tracing spans with upstream-aware request IDs.
//!
//! Prefers the `X-Railway-Request-Id` header so logs correlate with the edge
//! proxy, then a client-supplied `X-Request-Id`, and finally a fresh ULID.
//! The resolved ID is echoed back in the `X-Request-Id` response header.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::Instrument;

static RAILWAY_REQUEST_ID: &str = "x-railway-request-id";
pub static REQUEST_ID: &str = "x-request-id";

fn resolve_request_id(headers: &HeaderMap) -> String {
    [RAILWAY_REQUEST_ID, REQUEST_ID]
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

#[derive(Clone)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Debug,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let req_id = resolve_request_id(req.headers());

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!("request", req_id = %req_id);
        let start = Instant::now();
        let header_value = HeaderValue::from_str(&req_id).ok();

        let future = {
            let _entered = span.enter();
            self.inner.call(req)
        };

        Box::pin(
            async move {
                let mut result = future.await;
                let duration_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        match status {
                            200..=399 => {
                                tracing::debug!(method = %method, path = %path, status, duration_ms, "Response");
                            }
                            400..=499 => {
                                tracing::info!(method = %method, path = %path, status, duration_ms, "Response");
                            }
                            _ => {
                                tracing::warn!(method = %method, path = %path, status, duration_ms, "Response");
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(method = %method, path = %path, error = ?e, duration_ms, "Request failed");
                    }
                }

                if let Ok(ref mut response) = result
                    && let Some(value) = header_value
                {
                    response.headers_mut().insert(REQUEST_ID, value);
                }

                result
            }
            .instrument(span),
        )
    }
}
