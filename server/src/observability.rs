use std::{
    sync::Arc,
    task::{Context as TaskContext, Poll},
    time::Duration,
};

use axum::{
    extract::MatchedPath,
    http::{HeaderValue, Request, Response, header::HeaderName},
};
use tower::{Layer, Service};
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::{Level, Span, event, field};
use uuid::Uuid;

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request-scoped metadata attached as an extension before routing runs.
#[derive(Clone, Debug)]
pub struct RequestContext {
    inner: Arc<RequestContextInner>,
}

#[derive(Debug)]
struct RequestContextInner {
    request_id: String,
}

impl RequestContext {
    fn new(request_id: String) -> Self {
        Self {
            inner: Arc::new(RequestContextInner { request_id }),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.inner.request_id
    }
}

pub fn request_context_layer() -> RequestContextLayer {
    RequestContextLayer
}

#[derive(Clone, Default)]
pub struct RequestContextLayer;

#[derive(Clone)]
pub struct RequestContextMiddleware<S> {
    inner: S,
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextMiddleware { inner }
    }
}

impl<S, B> Service<Request<B>> for RequestContextMiddleware<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let (request_id, missing_header) = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| (value.to_string(), false))
            .unwrap_or_else(|| (Uuid::new_v4().to_string(), true));

        if missing_header {
            if let Ok(header_value) = HeaderValue::from_str(&request_id) {
                request
                    .headers_mut()
                    .insert(REQUEST_ID_HEADER.clone(), header_value);
            }
        }

        request
            .extensions_mut()
            .insert(RequestContext::new(request_id));

        self.inner.call(request)
    }
}

pub fn http_make_span() -> HttpMakeSpan {
    HttpMakeSpan
}

#[derive(Clone, Default)]
pub struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.request_id().to_owned())
            .unwrap_or_else(|| "unknown".to_string());
        let method = request.method().to_string();
        let target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().to_string());
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|mp| mp.as_str().to_string())
            .unwrap_or_else(|| target.clone());

        tracing::info_span!(
            "http_request",
            http.request.method = %method,
            http.route = %route,
            http.target = %target,
            http.response.status_code = field::Empty,
            request_id = %request_id,
            user_id = field::Empty,
            session_id = field::Empty,
        )
    }
}

/// Attach the resolved identity to the active request span once the
/// authorization stage has run.
pub fn record_authenticated_identity(user_id: Option<&str>, session_id: Option<&str>) {
    let span = Span::current();
    if span.is_disabled() {
        return;
    }

    if let Some(user_id) = user_id {
        span.record("user_id", field::display(user_id));
    }

    if let Some(session_id) = session_id {
        span.record("session_id", field::display(session_id));
    }
}

/// Response logger that escalates the log level for 4xx/5xx responses.
pub fn response_logger() -> ResponseLogger {
    ResponseLogger
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseLogger;

impl<B> OnResponse<B> for ResponseLogger {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status();

        span.record("http.response.status_code", field::display(status.as_u16()));

        if status.is_server_error() {
            event!(
                parent: span,
                Level::ERROR,
                http.response.status_code = status.as_u16(),
                latency_ms = latency.as_millis() as u64,
                "request completed"
            );
        } else if status.is_client_error() {
            event!(
                parent: span,
                Level::WARN,
                http.response.status_code = status.as_u16(),
                latency_ms = latency.as_millis() as u64,
                "request completed"
            );
        } else {
            event!(
                parent: span,
                Level::INFO,
                http.response.status_code = status.as_u16(),
                latency_ms = latency.as_millis() as u64,
                "request completed"
            );
        }
    }
}
