//! A recording transport for unit tests.

use std::{
    convert::Infallible,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use futures::TryStreamExt as _;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};

use crate::http::{HttpClient, HttpResponse, RedirectPolicy, RequestBody};

#[derive(Debug, snafu::Snafu)]
#[snafu(display("mock error"))]
pub(crate) struct MockError {
    retryable: bool,
}

impl MockError {
    pub fn new(retryable: bool) -> Self {
        Self { retryable }
    }
}

impl crate::Error for MockError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SentRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub policy: RedirectPolicy,
}

/// Answers every request with a fixed response.
///
/// A `delay_ms=N` query parameter on the request URL delays the answer by
/// `N` milliseconds.
#[derive(Debug)]
pub(crate) struct MockClient {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    failure: Option<bool>,
    panics: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<SentRequest>>,
}

impl MockClient {
    pub fn ok(body: &'static str) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    pub fn with_status(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body.as_bytes()),
            failure: None,
            panics: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(retryable: bool) -> Self {
        Self {
            failure: Some(retryable),
            ..Self::ok("")
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::ok("")
        }
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> SentRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

fn delay(uri: &Uri) -> Option<Duration> {
    uri.query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("delay_ms="))
        .and_then(|ms| ms.parse().ok())
        .map(Duration::from_millis)
}

impl HttpClient for MockClient {
    type Error = MockError;
    type Response = MockResponse;

    async fn execute(
        &self,
        request: Request<RequestBody>,
        redirects: RedirectPolicy,
    ) -> Result<Self::Response, Self::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (parts, body) = request.into_parts();
        let body = match body {
            RequestBody::Empty => Vec::new(),
            RequestBody::Full(bytes) => bytes.to_vec(),
            RequestBody::Streaming { stream, .. } => {
                let chunks: Vec<Bytes> = stream
                    .try_collect()
                    .await
                    .map_err(|_| MockError { retryable: false })?;
                chunks.concat()
            }
        };

        self.requests.lock().unwrap().push(SentRequest {
            method: parts.method,
            uri: parts.uri.clone(),
            headers: parts.headers,
            body,
            policy: redirects,
        });

        if self.panics {
            std::panic::panic_any("transport crashed");
        }

        if let Some(retryable) = self.failure {
            return Err(MockError { retryable });
        }

        if let Some(delay) = delay(&parts.uri) {
            tokio::time::sleep(delay).await;
        }

        Ok(MockResponse {
            status: self.status,
            headers: self.headers.clone(),
            url: parts.uri.to_string(),
            body: self.body.clone(),
        })
    }
}

#[derive(Debug)]
pub(crate) struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: String,
    body: Bytes,
}

impl HttpResponse for MockResponse {
    type Error = Infallible;

    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    async fn body(self) -> Result<Bytes, Self::Error> {
        Ok(self.body)
    }
}
