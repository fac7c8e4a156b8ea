//! Security headers applied to every response.
//!
//! All endpoints return JSON, so the CSP denies everything. HSTS is only
//! added behind Railway (detected via `X-Railway-Request-Id`).

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use std::task::{Context, Poll};
use tower::{Layer, Service};

static XFO: HeaderValue = HeaderValue::from_static("DENY");
static XCTO: HeaderValue = HeaderValue::from_static("nosniff");
static REFERRER: HeaderValue = HeaderValue::from_static("no-referrer");
static CSP: HeaderValue = HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'");
static HSTS: HeaderValue = HeaderValue::from_static("max-age=31536000; includeSubDomains");

#[derive(Clone)]
pub struct SecurityHeadersLayer;

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService { inner }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
}

impl<S, B> Service<Request> for SecurityHeadersService<S>
where
    S: Service<Request, Response = Response<B>> + Send + 'static,
    S::Future: Send + 'static,
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
        let behind_railway = req.headers().contains_key("x-railway-request-id");
        let future = self.inner.call(req);

        Box::pin(async move {
            let mut response = future.await?;
            let headers = response.headers_mut();

            headers.insert("x-frame-options", XFO.clone());
            headers.insert("x-content-type-options", XCTO.clone());
            headers.insert("referrer-policy", REFERRER.clone());
            headers.insert("content-security-policy", CSP.clone());
            if behind_railway {
                headers.insert("strict-transport-security", HSTS.clone());
            }

            Ok(response)
        })
    }
}
