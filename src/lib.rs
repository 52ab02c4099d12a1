//! A fetch-style, single-shot asynchronous HTTP request abstraction.
//!
//! [`Fetcher::fetch`] takes a URL and a loose set of [`FetchParams`], returns
//! a [`FetchHandle`] immediately, and resolves it with a [`FetchResponse`]
//! once the request completes. Invalid method, cache or redirect strings are
//! silently replaced by their defaults; invalid bodies reject the handle
//! before anything is sent.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use oneshot_fetch::{FetchParams, Fetcher};
//!
//! let fetcher = Fetcher::reqwest()?;
//! let params = FetchParams::builder().method("post").body("hello").build();
//! let mut response = fetcher.fetch("http://localhost:8080/", params).await?;
//! let text = response.text()?;
//! println!("{} {text}", response.status);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]

pub mod body;
mod error;
mod execute;
mod fetcher;
pub mod http;
pub mod params;
pub mod response;
#[cfg(test)]
mod testing;

pub use body::{Body, BodyReader, BodySink, BodyWriter};
pub use error::{BoxedError, Error};
pub use execute::FetchError;
pub use fetcher::{ClientFetchError, FetchHandle, Fetcher, fetch_all};
pub use params::{CacheMode, FetchParams, RedirectMode, RequestParams};
pub use response::{BodyError, FetchResponse};

pub use bytes::Bytes;
