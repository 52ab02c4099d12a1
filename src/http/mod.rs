//! HTTP transport abstractions.
//!
//! This module defines traits that decouple the library from any specific HTTP
//! implementation. Connection pooling, TLS and redirect following all live
//! behind [`HttpClient`]; the library only builds requests and interprets
//! responses.

#[cfg(feature = "http-client-reqwest-0_13")]
mod reqwest_0_13;

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;
use http::{HeaderMap, Request, StatusCode};

#[cfg(feature = "http-client-reqwest-0_13")]
pub use reqwest_0_13::{DEFAULT_MAX_REDIRECTS, ReqwestTransport};

/// A stream of request body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

/// The body of a transport-level request.
pub enum RequestBody {
    /// No body.
    Empty,
    /// A body whose content is fully known up front.
    Full(Bytes),
    /// A body produced incrementally.
    ///
    /// When `length` is set the request carries a matching `Content-Length`
    /// header; otherwise the transport is free to use chunked encoding.
    Streaming {
        /// The body chunks.
        stream: BodyStream,
        /// The declared length of the body, if known.
        length: Option<u64>,
    },
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Streaming { length, .. } => f
                .debug_struct("Streaming")
                .field("length", length)
                .finish_non_exhaustive(),
        }
    }
}

/// How the transport should treat redirect responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Perform exactly one request and hand back any 3xx response as-is.
    Manual,
    /// Follow redirects transparently, up to the transport's hop limit.
    Follow,
}

/// Defines the common interface for HTTP requests.
pub trait HttpClient: Send + Sync {
    /// The error type returned by the client for a failed request.
    type Error: crate::Error;

    /// The associated response type returned by this HTTP client.
    type Response: HttpResponse;

    /// Executes an HTTP request and returns an owned response.
    ///
    /// # Arguments
    ///
    /// * `request`: The `http::Request` to be executed.
    /// * `redirects`: Whether redirect responses are followed or returned.
    ///
    /// # Returns
    ///
    /// A `Future` that resolves to a `Result` containing the `Self::Response` on success,
    /// or `Self::Error` on failure.
    fn execute(
        &self,
        request: Request<RequestBody>,
        redirects: RedirectPolicy,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send;
}

/// Defines the common interface for HTTP responses.
pub trait HttpResponse: Send + Sync {
    /// The error type when getting the response body.
    type Error: crate::Error;

    /// Returns the HTTP status code of the response.
    fn status(&self) -> StatusCode;

    /// Returns the response's HTTP headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the URL this response was served from.
    fn url(&self) -> String;

    /// Consumes the response and asynchronously returns its body as `bytes::Bytes`.
    ///
    /// # Returns
    ///
    /// A `Future` that resolves to a `Result` containing the response body on success,
    /// or an error if reading the body fails.
    fn body(self) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;
}
