//! Request execution.
//!
//! Turns normalized parameters into a transport request, dispatches it and
//! collects the outcome into a [`FetchResponse`].

use std::collections::HashMap;

use http::{
    HeaderName, HeaderValue, Request, Uri,
    header::{CACHE_CONTROL, CONTENT_LENGTH},
    uri::InvalidUri,
};
use snafu::prelude::*;
use tracing::{debug, instrument, warn};

use crate::{
    http::{HttpClient, HttpResponse, RedirectPolicy, RequestBody},
    params::{CacheMode, RedirectMode, RequestParams},
    response::FetchResponse,
};

/// Executes a single fetch.
///
/// Invalid URLs, headers and bodies are rejected before the transport is
/// called. Transport failures are returned as-is; nothing is retried.
#[instrument(skip_all, fields(method = %params.method, url = %url))]
pub(crate) async fn execute<C: HttpClient>(
    http_client: &C,
    url: &str,
    params: RequestParams,
) -> Result<FetchResponse, FetchError<C::Error, <C::Response as HttpResponse>::Error>> {
    let uri = url.parse::<Uri>().context(InvalidUrlSnafu { url })?;

    let (mut parts, ()) = Request::new(()).into_parts();
    parts.method = params.method;
    parts.uri = uri;

    for (name, value) in &params.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(http::Error::from)
            .context(InvalidHeaderSnafu { name })?;
        let header_value = HeaderValue::from_str(value)
            .map_err(http::Error::from)
            .context(InvalidHeaderSnafu { name })?;
        parts.headers.insert(header_name, header_value);
    }

    if params.cache != CacheMode::Default {
        parts.headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static(params.cache.as_str()),
        );
    }

    let body = match params.body {
        None => RequestBody::Empty,
        Some(body) => match body.into_request_body() {
            Ok(body) => body,
            Err(value) => {
                warn!(%value, "rejecting unsupported request body");
                return InvalidBodySnafu { value }.fail();
            }
        },
    };

    if let RequestBody::Streaming {
        length: Some(length),
        ..
    } = &body
    {
        parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(*length));
    }

    let policy = match params.redirect {
        RedirectMode::Error => RedirectPolicy::Manual,
        RedirectMode::Follow => RedirectPolicy::Follow,
    };

    debug!(?policy, ?body, "dispatching request");
    let response = http_client
        .execute(Request::from_parts(parts, body), policy)
        .await
        .context(TransportSnafu)?;

    let status = response.status();
    let redirected = params.redirect == RedirectMode::Error && status.is_redirection();
    let url = response.url();

    let mut headers = HashMap::with_capacity(response.headers().keys_len());
    for (name, value) in response.headers() {
        headers.insert(
            name.as_str().to_owned(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let body = response.body().await.context(ResponseBodySnafu)?;
    debug!(%status, redirected, len = body.len(), "request completed");

    Ok(FetchResponse::new(status, redirected, url, headers, body))
}

/// Errors that can occur during a fetch.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FetchError<HttpReqErr: crate::Error, HttpRespErr: crate::Error> {
    /// The URL could not be parsed.
    #[snafu(display("Invalid URL {url:?}"))]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// The underlying error.
        source: InvalidUri,
    },
    /// A request header name or value is not valid HTTP.
    #[snafu(display("Invalid request header {name:?}"))]
    InvalidHeader {
        /// The name of the rejected header.
        name: String,
        /// The underlying error.
        source: http::Error,
    },
    /// The request body is not one of the supported variants.
    #[snafu(display("Invalid body: {value}"))]
    InvalidBody {
        /// Diagnostic rendering of the rejected value.
        value: String,
    },
    /// The transport failed to perform the request.
    #[snafu(display("Failed to make HTTP request"))]
    Transport {
        /// The underlying error.
        source: HttpReqErr,
    },
    /// The transport failed while reading the response body.
    #[snafu(display("Failed to read response body"))]
    ResponseBody {
        /// The underlying error.
        source: HttpRespErr,
    },
    /// The task running the fetch panicked.
    #[snafu(display("Fetch task failed"))]
    Worker {
        /// The underlying error.
        source: tokio::task::JoinError,
    },
}

impl<HttpReqErr: crate::Error, HttpRespErr: crate::Error> crate::Error
    for FetchError<HttpReqErr, HttpRespErr>
{
    fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidUrl { .. }
            | Self::InvalidHeader { .. }
            | Self::InvalidBody { .. }
            | Self::Worker { .. } => false,
            Self::Transport { source } => source.is_retryable(),
            Self::ResponseBody { source } => source.is_retryable(),
        }
    }
}
