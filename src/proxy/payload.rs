// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message payloads and the streaming body that carries them upstream.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, TryStreamExt};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Size of the chunks a [`PayloadBody`] is streamed in.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// The byte content of an exchange.
///
/// Cloning is cheap (reference counted), which is what makes the outbound
/// body repeatable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    bytes: Bytes,
}

impl Payload {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Number of bytes held.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Lossy UTF-8 view, handy for logging and tests.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Replace the content by draining `stream` chunk by chunk.
    pub async fn fill_from<S, E>(&mut self, stream: S) -> Result<u64, E>
    where
        S: Stream<Item = Result<Bytes, E>>,
    {
        let mut sink = BytesMut::new();
        let mut stream = std::pin::pin!(stream);
        while let Some(chunk) = stream.try_next().await? {
            sink.extend_from_slice(&chunk);
        }
        self.bytes = sink.freeze();
        Ok(self.size())
    }
}

impl From<&'static str> for Payload {
    fn from(s: &'static str) -> Self {
        Self::new(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

/// Outbound request body wrapping an exchange payload.
///
/// The length is always known up front, the body can be produced any number
/// of times, and it is written out in [`CHUNK_SIZE`] pieces rather than as a
/// single buffer.
#[derive(Debug, Clone)]
pub struct PayloadBody {
    payload: Payload,
}

impl PayloadBody {
    pub fn new(payload: Payload) -> Self {
        Self { payload }
    }

    pub fn content_length(&self) -> u64 {
        self.payload.size()
    }

    pub fn is_repeatable(&self) -> bool {
        true
    }

    pub fn is_streaming(&self) -> bool {
        true
    }

    /// The payload as a stream of chunks.  Each call starts from the beginning.
    pub fn chunks(&self) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
        let bytes = self.payload.as_bytes().clone();
        let len = bytes.len();
        stream::iter(
            (0..len)
                .step_by(CHUNK_SIZE)
                .map(move |start| Ok(bytes.slice(start..(start + CHUNK_SIZE).min(len)))),
        )
    }

    /// Write every chunk to `out`.
    pub async fn write_to<W>(&self, out: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0u64;
        let mut chunks = std::pin::pin!(self.chunks());
        while let Some(chunk) = chunks.try_next().await? {
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;
        Ok(written)
    }

    /// Convert into a streaming reqwest body.
    pub fn to_reqwest_body(&self) -> reqwest::Body {
        reqwest::Body::wrap_stream(self.chunks())
    }
}
