//! Fetch responses.
//!
//! A [`FetchResponse`] owns its body until the first materialization call
//! ([`raw`](FetchResponse::raw), [`text`](FetchResponse::text),
//! [`json`](FetchResponse::json) or [`reader`](FetchResponse::reader)) moves it
//! out. Every later call fails with [`BodyError::AlreadyConsumed`].

use std::{collections::HashMap, io::Cursor};

use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;
use snafu::prelude::*;

/// The completed response of a fetch.
#[derive(Debug)]
pub struct FetchResponse {
    /// Whether the status is in `200..300`.
    pub ok: bool,
    /// Whether the response is a redirect that was not followed.
    pub redirected: bool,
    /// The response status.
    pub status: StatusCode,
    /// The reason phrase for `status`.
    pub status_text: String,
    /// The URL the response was served from.
    pub url: String,
    /// Response headers. Repeated headers keep their last value.
    pub headers: HashMap<String, String>,
    body: ConsumeOnce,
}

impl FetchResponse {
    pub(crate) fn new(
        status: StatusCode,
        redirected: bool,
        url: String,
        headers: HashMap<String, String>,
        body: Bytes,
    ) -> Self {
        Self {
            ok: status.is_success(),
            redirected,
            status,
            status_text: status_text(status).to_owned(),
            url,
            headers,
            body: ConsumeOnce(Some(body)),
        }
    }

    /// Returns true once the body has been materialized.
    #[must_use]
    pub fn body_used(&self) -> bool {
        self.body.0.is_none()
    }

    /// Takes the body as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::AlreadyConsumed`] if the body was already taken.
    pub fn raw(&mut self) -> Result<Bytes, BodyError> {
        self.body.take()
    }

    /// Takes the body as text.
    ///
    /// The body is decoded as UTF-8; invalid sequences are replaced with
    /// `U+FFFD`.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::AlreadyConsumed`] if the body was already taken.
    pub fn text(&mut self) -> Result<String, BodyError> {
        let body = self.body.take()?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Takes the body and deserializes it from JSON.
    ///
    /// A failed parse still consumes the body.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::AlreadyConsumed`] if the body was already taken,
    /// or [`BodyError::Decode`] if it is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let body = self.body.take()?;
        serde_json::from_slice(&body).context(DecodeSnafu)
    }

    /// Takes the body as a seekable reader.
    ///
    /// # Errors
    ///
    /// Returns [`BodyError::AlreadyConsumed`] if the body was already taken.
    pub fn reader(&mut self) -> Result<Cursor<Bytes>, BodyError> {
        self.body.take().map(Cursor::new)
    }
}

#[derive(Debug)]
struct ConsumeOnce(Option<Bytes>);

impl ConsumeOnce {
    fn take(&mut self) -> Result<Bytes, BodyError> {
        self.0.take().context(AlreadyConsumedSnafu)
    }
}

fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Status Code")
}

/// Errors when materializing a response body.
#[derive(Debug, Snafu)]
pub enum BodyError {
    /// The body was already taken by an earlier call.
    #[snafu(display("Response body already used"))]
    AlreadyConsumed,
    /// The body could not be decoded.
    #[snafu(display("Failed to decode response body"))]
    Decode {
        /// The underlying error.
        source: serde_json::Error,
    },
}

impl crate::Error for BodyError {
    fn is_retryable(&self) -> bool {
        false
    }
}
