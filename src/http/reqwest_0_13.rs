use bon::bon;
use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use reqwest::redirect::Policy;

use super::{HttpClient, HttpResponse, RedirectPolicy, RequestBody};

/// The number of redirect hops followed by default.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// An [`HttpClient`] backed by `reqwest`.
///
/// `reqwest` fixes its redirect policy per client, so the transport keeps two
/// clients built from the same configuration: one that never follows
/// redirects and one that follows up to `max_redirects` hops.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    direct: reqwest::Client,
    following: reqwest::Client,
}

#[bon]
impl ReqwestTransport {
    /// Builds a transport.
    ///
    /// # Errors
    ///
    /// Returns an error if `reqwest` cannot initialize a client (for example
    /// when the TLS backend fails to load).
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_MAX_REDIRECTS)] max_redirects: usize,
        #[builder(into)] user_agent: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = |policy: Policy| {
            let mut builder = reqwest::Client::builder().redirect(policy);
            if let Some(user_agent) = &user_agent {
                builder = builder.user_agent(user_agent.clone());
            }
            builder.build()
        };

        Ok(Self {
            direct: client(Policy::none())?,
            following: client(Policy::limited(max_redirects))?,
        })
    }
}

impl HttpClient for ReqwestTransport {
    /// The response type is `reqwest::Response`.
    type Response = reqwest::Response;
    /// The error type is `reqwest::Error`.
    type Error = reqwest::Error;

    /// Executes an `http::Request` using one of the wrapped clients.
    ///
    /// This method converts the generic `http::Request<RequestBody>` into a
    /// `reqwest::Request` and then sends it. Streaming bodies are handed to
    /// `reqwest` as-is, so any `Content-Length` header set by the caller is
    /// what goes on the wire.
    async fn execute(
        &self,
        request: Request<RequestBody>,
        redirects: RedirectPolicy,
    ) -> Result<Self::Response, Self::Error> {
        let client = match redirects {
            RedirectPolicy::Manual => &self.direct,
            RedirectPolicy::Follow => &self.following,
        };

        let (parts, body) = request.into_parts();
        let builder = client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Full(bytes) => builder.body(bytes),
            RequestBody::Streaming { stream, .. } => {
                builder.body(reqwest::Body::wrap_stream(stream))
            }
        };

        client.execute(builder.build()?).await
    }
}

impl HttpResponse for reqwest::Response {
    type Error = reqwest::Error;

    /// Returns the HTTP status code of the `reqwest::Response`.
    fn status(&self) -> StatusCode {
        self.status()
    }

    /// Returns the `reqwest::Response`'s headers.
    fn headers(&self) -> &HeaderMap {
        self.headers()
    }

    /// Returns the final URL, after any redirects `reqwest` followed.
    fn url(&self) -> String {
        self.url().to_string()
    }

    /// Consumes the `reqwest::Response` and asynchronously returns its body as `bytes::Bytes`.
    ///
    /// This method leverages `reqwest::Response::bytes()` to read the full body.
    async fn body(self) -> Result<Bytes, Self::Error> {
        self.bytes().await
    }
}

impl crate::Error for reqwest::Error {
    fn is_retryable(&self) -> bool {
        self.is_connect() || self.is_timeout()
    }
}
