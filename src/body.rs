//! Request bodies.
//!
//! A [`Body`] is one of four supported representations: text, raw bytes, a
//! readable stream with a declared length, or a push-style writer callback.
//! Callers normally pick the variant through a typed constructor;
//! [`Body::from_any`] classifies values whose type is only known at runtime.

use std::{any::Any, fmt, io, panic::AssertUnwindSafe};

use bytes::{Bytes, BytesMut};
use futures::{FutureExt as _, future::BoxFuture, stream};
use tokio::{
    io::{AsyncRead, AsyncReadExt as _},
    sync::mpsc,
};
use tracing::warn;

use crate::http::{BodyStream, RequestBody};

const READ_CHUNK_SIZE: usize = 8 * 1024;
const WRITER_CHANNEL_CAPACITY: usize = 8;

/// A readable stream usable as a request body.
pub type BodyReader = Box<dyn AsyncRead + Send + Sync + Unpin>;

type WriterFn = Box<dyn FnOnce(BodySink) -> BoxFuture<'static, io::Result<()>> + Send>;

/// A push-style body producer.
///
/// The callback receives a [`BodySink`] and writes the body to it chunk by
/// chunk. It runs on its own task once the request is dispatched; the body
/// ends when the callback returns. Returning an error or panicking aborts the
/// request.
pub struct BodyWriter(WriterFn);

impl BodyWriter {
    /// Wraps a callback that writes the request body.
    pub fn new<F, Fut>(write: F) -> Self
    where
        F: FnOnce(BodySink) -> Fut + Send + 'static,
        Fut: Future<Output = io::Result<()>> + Send + 'static,
    {
        Self(Box::new(move |sink| Box::pin(write(sink))))
    }

    fn into_stream(self) -> BodyStream {
        let (tx, rx) = mpsc::channel(WRITER_CHANNEL_CAPACITY);
        let errors = tx.clone();
        let write = self.0;

        tokio::spawn(async move {
            let err = match AssertUnwindSafe(write(BodySink { tx })).catch_unwind().await {
                Ok(Ok(())) => return,
                Ok(Err(err)) => err,
                Err(_) => io::Error::other("request body writer panicked"),
            };
            // The body must end in an error, never a clean EOF, or the
            // transport sends the truncated body as complete.
            warn!(error = %err, "request body writer failed");
            let _ = errors.send(Err(err)).await;
        });

        Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        }))
    }
}

impl fmt::Debug for BodyWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BodyWriter(..)")
    }
}

/// The sending half handed to a [`BodyWriter`] callback.
#[derive(Debug)]
pub struct BodySink {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl BodySink {
    /// Sends one chunk of the request body.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::BrokenPipe`] once the transport has stopped
    /// reading the body, e.g. because the connection failed.
    pub async fn write(&self, chunk: impl Into<Bytes>) -> io::Result<()> {
        self.tx.send(Ok(chunk.into())).await.map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "request body is no longer read")
        })
    }
}

/// A request body.
pub enum Body {
    /// A value that is not a supported body; `value` names what was supplied.
    Unsupported {
        /// Diagnostic rendering of the rejected value.
        value: String,
    },
    /// A text body.
    Text(String),
    /// A raw byte body.
    Raw(Bytes),
    /// A streamed body of known length.
    Stream {
        /// The source of the body.
        reader: BodyReader,
        /// The number of bytes read from `reader` and sent.
        length: u64,
    },
    /// A body produced by a push-style callback.
    Writer(BodyWriter),
}

impl Body {
    /// A text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A raw byte body.
    pub fn raw(bytes: impl Into<Bytes>) -> Self {
        Self::Raw(bytes.into())
    }

    /// A body read from `reader`, sent with a `Content-Length` of `length`.
    ///
    /// Streams of unknown (zero) length cannot be sent without chunked
    /// encoding and produce [`Body::Unsupported`].
    pub fn stream(reader: impl AsyncRead + Send + Sync + Unpin + 'static, length: u64) -> Self {
        Self::from_reader(Box::new(reader), length)
    }

    /// A body produced by `write`.
    pub fn writer<F, Fut>(write: F) -> Self
    where
        F: FnOnce(BodySink) -> Fut + Send + 'static,
        Fut: Future<Output = io::Result<()>> + Send + 'static,
    {
        Self::Writer(BodyWriter::new(write))
    }

    /// Classifies an arbitrary value as a body.
    ///
    /// Checks run in a fixed order: text (`String`, `&'static str`), raw
    /// bytes (`Vec<u8>`, [`Bytes`], `&'static [u8]`), a [`BodyReader`], then
    /// a [`BodyWriter`]. Byte slices are checked before readers because they
    /// also implement [`AsyncRead`]. `declared_length` only applies to
    /// readers. Anything else is [`Body::Unsupported`].
    ///
    /// Only these exact types match. A byte-string literal such as `b"abc"`
    /// is a `&[u8; 3]` and must be passed as `&b"abc"[..]`, or converted with
    /// [`Body::from`] instead.
    pub fn from_any<T: Any + Send>(value: T, declared_length: u64) -> Self {
        let type_name = std::any::type_name::<T>();
        let value: Box<dyn Any + Send> = Box::new(value);

        let value = match value.downcast::<String>() {
            Ok(text) => return Self::Text(*text),
            Err(value) => value,
        };
        let value = match value.downcast::<&'static str>() {
            Ok(text) => return Self::Text((*text).to_owned()),
            Err(value) => value,
        };
        let value = match value.downcast::<Vec<u8>>() {
            Ok(bytes) => return Self::Raw(Bytes::from(*bytes)),
            Err(value) => value,
        };
        let value = match value.downcast::<Bytes>() {
            Ok(bytes) => return Self::Raw(*bytes),
            Err(value) => value,
        };
        let value = match value.downcast::<&'static [u8]>() {
            Ok(bytes) => return Self::Raw(Bytes::from_static(*bytes)),
            Err(value) => value,
        };
        let value = match value.downcast::<BodyReader>() {
            Ok(reader) => return Self::from_reader(*reader, declared_length),
            Err(value) => value,
        };
        match value.downcast::<BodyWriter>() {
            Ok(writer) => Self::Writer(*writer),
            Err(_) => Self::Unsupported {
                value: type_name.to_owned(),
            },
        }
    }

    fn from_reader(reader: BodyReader, length: u64) -> Self {
        if length == 0 {
            return Self::Unsupported {
                value: "stream of unknown length".to_owned(),
            };
        }
        Self::Stream { reader, length }
    }

    /// Returns true if this body will be rejected when sent.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Converts the body into its transport form.
    ///
    /// Returns the diagnostic rendering of the value for unsupported bodies.
    pub(crate) fn into_request_body(self) -> Result<RequestBody, String> {
        match self {
            Self::Unsupported { value } => Err(value),
            Self::Text(text) => Ok(RequestBody::Full(Bytes::from(text))),
            Self::Raw(bytes) => Ok(RequestBody::Full(bytes)),
            Self::Stream { reader, length } => Ok(RequestBody::Streaming {
                stream: reader_stream(reader, length),
                length: Some(length),
            }),
            Self::Writer(writer) => Ok(RequestBody::Streaming {
                stream: writer.into_stream(),
                length: None,
            }),
        }
    }
}

fn reader_stream(reader: BodyReader, length: u64) -> BodyStream {
    Box::pin(stream::try_unfold(reader.take(length), |mut reader| async move {
        let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);
        let read = reader.read_buf(&mut buf).await?;
        Ok::<_, io::Error>((read > 0).then(|| (buf.freeze(), reader)))
    }))
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported { value } => f
                .debug_struct("Unsupported")
                .field("value", value)
                .finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Raw(bytes) => f.debug_tuple("Raw").field(bytes).finish(),
            Self::Stream { length, .. } => f
                .debug_struct("Stream")
                .field("length", length)
                .finish_non_exhaustive(),
            Self::Writer(writer) => f.debug_tuple("Writer").field(writer).finish(),
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Raw(Bytes::from_static(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Body {
    fn from(bytes: &'static [u8; N]) -> Self {
        Self::Raw(Bytes::from_static(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Raw(bytes.into())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Raw(bytes)
    }
}
