//! Request parameters and their normalization.
//!
//! Parameters arrive as loose strings. Normalization never fails: anything
//! unrecognized degrades to a safe default (`GET`, follow redirects, default
//! cache mode) instead of producing an error.

use std::{collections::HashMap, fmt};

use bon::Builder;
use http::Method;

use crate::body::Body;

/// The methods a fetch may use. Anything else is sent as `GET`.
const METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

/// Parses a method name case-insensitively, falling back to `GET`.
///
/// Only ASCII letters are folded. A name that matches a method only under
/// Unicode case mapping, such as `"poſt"` (long s), is not recognized and
/// becomes `GET`.
#[must_use]
pub fn normalize_method(method: &str) -> Method {
    let upper = method.to_ascii_uppercase();
    METHODS
        .into_iter()
        .find(|known| known.as_str() == upper)
        .unwrap_or(Method::GET)
}

/// Cache mode of a fetch.
///
/// Anything other than [`CacheMode::Default`] is passed through verbatim as
/// the request's `Cache-Control` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CacheMode {
    /// No `Cache-Control` header is added.
    #[default]
    Default,
    /// `Cache-Control: no-cache`.
    NoCache,
    /// `Cache-Control: no-store`.
    NoStore,
}

impl CacheMode {
    /// Parses a cache mode, falling back to [`CacheMode::Default`].
    #[must_use]
    pub fn normalize(mode: &str) -> Self {
        match mode {
            "no-cache" => Self::NoCache,
            "no-store" => Self::NoStore,
            _ => Self::Default,
        }
    }

    /// The literal name of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::NoCache => "no-cache",
            Self::NoStore => "no-store",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Redirect handling of a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RedirectMode {
    /// Redirects are followed transparently by the transport.
    #[default]
    Follow,
    /// A single request is made; redirect responses are returned as-is and
    /// flagged as redirected.
    Error,
}

impl RedirectMode {
    /// Parses a redirect mode, falling back to [`RedirectMode::Follow`].
    #[must_use]
    pub fn normalize(mode: &str) -> Self {
        match mode {
            "error" => Self::Error,
            _ => Self::Follow,
        }
    }

    /// The literal name of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RedirectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a fetch, as supplied by the caller.
///
/// ```
/// use oneshot_fetch::FetchParams;
///
/// let params = FetchParams::builder()
///     .method("delete")
///     .cache("no-store")
///     .redirect("error")
///     .build();
/// ```
#[derive(Debug, Default, Builder)]
pub struct FetchParams {
    /// The request method, case-insensitive.
    #[builder(into)]
    pub method: Option<String>,
    /// `follow` or `error`.
    #[builder(into)]
    pub redirect: Option<String>,
    /// `default`, `no-cache` or `no-store`.
    #[builder(into)]
    pub cache: Option<String>,
    /// The request body.
    #[builder(into)]
    pub body: Option<Body>,
    /// Request headers, applied verbatim.
    #[builder(default)]
    pub headers: HashMap<String, String>,
}

impl FetchParams {
    /// Coerces the parameters into their normalized form.
    #[must_use]
    pub fn normalize(self) -> RequestParams {
        RequestParams {
            method: normalize_method(self.method.as_deref().unwrap_or_default()),
            redirect: RedirectMode::normalize(self.redirect.as_deref().unwrap_or_default()),
            cache: CacheMode::normalize(self.cache.as_deref().unwrap_or_default()),
            body: self.body,
            headers: self.headers,
        }
    }
}

/// Normalized parameters of a fetch.
#[derive(Debug)]
pub struct RequestParams {
    /// One of the nine standard methods.
    pub method: Method,
    /// How redirects are handled.
    pub redirect: RedirectMode,
    /// The cache mode.
    pub cache: CacheMode,
    /// The request body.
    pub body: Option<Body>,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

impl From<RequestParams> for FetchParams {
    fn from(params: RequestParams) -> Self {
        Self {
            method: Some(params.method.as_str().to_owned()),
            redirect: Some(params.redirect.as_str().to_owned()),
            cache: Some(params.cache.as_str().to_owned()),
            body: params.body,
            headers: params.headers,
        }
    }
}
