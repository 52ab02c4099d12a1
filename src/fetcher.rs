//! The fetch entry point.
//!
//! [`Fetcher::fetch`] returns a [`FetchHandle`] immediately and runs the
//! request on its own tokio task. Concurrent fetches share only the
//! transport; every request and response buffer belongs to exactly one task.

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::future::try_join_all;
use snafu::ResultExt as _;
use tokio::task::JoinHandle;
use tracing::{Instrument as _, debug_span, warn};

use crate::{
    execute::{FetchError, WorkerSnafu, execute},
    http::{HttpClient, HttpResponse},
    params::FetchParams,
    response::FetchResponse,
};

/// The error type of fetches made through a client of type `C`.
pub type ClientFetchError<C> =
    FetchError<<C as HttpClient>::Error, <<C as HttpClient>::Response as HttpResponse>::Error>;

/// Issues fetches through a shared transport.
#[derive(Debug)]
pub struct Fetcher<C> {
    http_client: Arc<C>,
}

impl<C> Clone for Fetcher<C> {
    fn clone(&self) -> Self {
        Self {
            http_client: Arc::clone(&self.http_client),
        }
    }
}

impl<C: HttpClient + 'static> Fetcher<C> {
    /// Creates a fetcher using `http_client` as its transport.
    pub fn new(http_client: C) -> Self {
        Self {
            http_client: Arc::new(http_client),
        }
    }

    /// Starts a fetch of `url`.
    ///
    /// The request runs on a newly spawned task; the returned handle resolves
    /// once the response (including its body) has been received. Missing
    /// parameters behave like [`FetchParams::default`].
    ///
    /// Fetches cannot be cancelled: dropping the handle detaches the task,
    /// which still runs to completion.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn fetch(
        &self,
        url: impl Into<String>,
        params: impl Into<Option<FetchParams>>,
    ) -> FetchHandle<ClientFetchError<C>> {
        let url = url.into();
        let params = params.into().unwrap_or_default();
        let http_client = Arc::clone(&self.http_client);
        let span = debug_span!("fetch", url = %url);

        let task = tokio::spawn(
            async move { execute(http_client.as_ref(), &url, params.normalize()).await }
                .instrument(span),
        );

        FetchHandle { task }
    }
}

#[cfg(feature = "http-client-reqwest-0_13")]
impl Fetcher<crate::http::ReqwestTransport> {
    /// Creates a fetcher backed by a default-configured [`ReqwestTransport`](crate::http::ReqwestTransport).
    ///
    /// # Errors
    ///
    /// Returns an error if the `reqwest` client cannot be built.
    pub fn reqwest() -> Result<Self, reqwest::Error> {
        crate::http::ReqwestTransport::builder()
            .build()
            .map(Self::new)
    }
}

/// A pending fetch.
///
/// Resolves to the response, or to the error that ended the fetch.
#[derive(Debug)]
#[must_use = "a fetch handle does nothing unless awaited"]
pub struct FetchHandle<E> {
    task: JoinHandle<Result<FetchResponse, E>>,
}

impl<Req: crate::Error, Resp: crate::Error> Future for FetchHandle<FetchError<Req, Resp>> {
    type Output = Result<FetchResponse, FetchError<Req, Resp>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| {
            joined
                .inspect_err(|err| warn!(error = %err, "fetch task failed"))
                .context(WorkerSnafu)?
        })
    }
}

/// Waits for every fetch, returning the responses in the order of `handles`.
///
/// Fetches still complete in whatever order the network allows. The first
/// error is returned; the remaining fetches keep running detached.
///
/// # Errors
///
/// Returns the error of the first fetch observed to fail.
pub async fn fetch_all<Req: crate::Error, Resp: crate::Error>(
    handles: impl IntoIterator<Item = FetchHandle<FetchError<Req, Resp>>>,
) -> Result<Vec<FetchResponse>, FetchError<Req, Resp>> {
    try_join_all(handles).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::TryFutureExt as _;

    use super::*;
    use crate::{Error as _, body::Body, testing::MockClient};

    #[tokio::test]
    async fn test_fetch_resolves_with_response() {
        let fetcher = Fetcher::new(MockClient::ok("hello"));
        let mut response = fetcher.fetch("http://example.com/", None).await.unwrap();

        assert!(response.ok);
        assert_eq!(response.text().unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_fetch_returns_before_completion() {
        let fetcher = Fetcher::new(MockClient::ok(""));
        let handle = fetcher.fetch("http://example.com/?delay_ms=50", None);

        assert!(!handle.task.is_finished());
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_body() {
        let fetcher = Fetcher::new(MockClient::ok(""));
        let params = FetchParams::builder().body(Body::from_any((), 0)).build();

        let err = fetcher.fetch("http://example.com/", params).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidBody { .. }));
        assert_eq!(fetcher.http_client.calls(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_is_worker_error() {
        let fetcher = Fetcher::new(MockClient::panicking());
        let err = fetcher.fetch("http://example.com/", None).await.unwrap_err();

        assert!(matches!(err, FetchError::Worker { .. }));
        assert!(!err.is_retryable());
        assert_eq!(fetcher.http_client.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_input_order() {
        let fetcher = Fetcher::new(MockClient::ok(""));
        // Later requests finish first.
        let handles = (0..4).map(|i| {
            let delay = (4 - i) * 20;
            fetcher.fetch(format!("http://example.com/{i}?delay_ms={delay}"), None)
        });

        let responses = fetch_all(handles).await.unwrap();
        let urls: Vec<_> = responses.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "http://example.com/0?delay_ms=80",
                "http://example.com/1?delay_ms=60",
                "http://example.com/2?delay_ms=40",
                "http://example.com/3?delay_ms=20",
            ]
        );
        assert_eq!(fetcher.http_client.calls(), 4);
    }

    #[tokio::test]
    async fn test_fetch_all_returns_first_error() {
        let fetcher = Fetcher::new(MockClient::ok(""));
        let bad = FetchParams::builder().body(Body::from_any(1_u8, 1)).build();
        let handles = vec![
            fetcher.fetch("http://example.com/?delay_ms=10", None),
            fetcher.fetch("http://example.com/", bad),
        ];

        assert!(matches!(
            fetch_all(handles).await,
            Err(FetchError::InvalidBody { .. })
        ));
    }

    #[tokio::test]
    async fn test_handles_chain() {
        let fetcher = Fetcher::new(MockClient::ok("chained"));
        let text = fetcher
            .fetch("http://example.com/", None)
            .map_ok(|mut response| response.text())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(text, "chained");
    }

    #[tokio::test]
    async fn test_handle_can_be_wrapped_in_timeout() {
        let fetcher = Fetcher::new(MockClient::ok(""));
        let handle = fetcher.fetch("http://example.com/?delay_ms=500", None);

        let timed_out = tokio::time::timeout(Duration::from_millis(10), handle).await;
        assert!(timed_out.is_err());
    }
}
