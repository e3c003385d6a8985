//! # AFC Client
//!
//! [`AfcClient`] owns the byte channel to an AFC service and performs one
//! request/reply round trip at a time.
//!
//! Replies carry no correlation id, so they are matched to requests purely by
//! order. Every round trip therefore holds the connection lock from the first
//! byte sent until the reply is decoded, and a multi-frame write holds it for
//! all of its frames.
//!
//! ## Cancellation
//! The client's [`CancellationToken`] is checked before each round trip,
//! between write chunks and before each read iteration. A frame that has
//! started sending is always completed and its reply consumed. If a caller
//! drops an operation future between send and reply, or a reply times out,
//! the connection is marked desynchronized and every later call fails with
//! [`ProtocolError::Desynchronized`].
//!
//! ## Example
//! ```rust,no_run
//! use afc_client::AfcClient;
//!
//! # async fn example(stream: tokio::net::TcpStream) -> afc_client::error::Result<()> {
//! let client = AfcClient::new(stream);
//! for name in client.list_directory("/").await? {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```

mod fs;
mod transfer;
mod walk;

pub use walk::WalkEntry;

use std::io::SeekFrom;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::core::codec::AfcCodec;
use crate::core::request::{Request, WriteChunks};
use crate::core::response::{self, Frame};
use crate::error::{ProtocolError, Result};
use crate::protocol::{seek_parameters, FileHandle, LockMode, OpenMode};
use crate::utils::metrics::Metrics;

/// Data length requested by one read frame: the smaller of what the caller
/// still needs and the configured per-request maximum.
pub fn clamp_read_size(requested: usize, max_read_size: usize) -> usize {
    requested.min(max_read_size)
}

struct Connection<S> {
    framed: Framed<S, AfcCodec>,
    /// Set while a request is on the wire without its reply consumed.
    desynchronized: bool,
}

/// Client for one AFC service connection.
pub struct AfcClient<S> {
    connection: Mutex<Connection<S>>,
    config: ClientConfig,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
}

impl<S> AfcClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already established channel to the AFC service.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, ClientConfig::default())
    }

    pub fn with_config(stream: S, config: ClientConfig) -> Self {
        let codec = AfcCodec::new(config.max_frame_length);
        Self {
            connection: Mutex::new(Connection {
                framed: Framed::new(stream, codec),
                desynchronized: false,
            }),
            config,
            metrics: Arc::new(Metrics::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token, e.g. with a child of an application-wide one.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Token that cancels this client's operations at the next safe point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Give the channel back. Bytes already buffered from the device are dropped.
    pub fn into_inner(self) -> S {
        self.connection.into_inner().framed.into_inner()
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ProtocolError::Cancelled);
        }
        Ok(())
    }

    /// Send one frame and receive one frame on an already locked connection.
    async fn exchange(&self, conn: &mut Connection<S>, request: Request) -> Result<Frame> {
        if conn.desynchronized {
            return Err(ProtocolError::Desynchronized);
        }

        let operation = request.opcode();
        let frame_length = request.frame_length();

        conn.desynchronized = true;
        conn.framed.send(request).await?;
        self.metrics.frame_sent(frame_length);
        debug!(?operation, bytes = frame_length, "Request sent");

        let received =
            match tokio::time::timeout(self.config.response_timeout, conn.framed.next()).await {
                Err(_) => {
                    self.metrics.round_trip_abandoned();
                    return Err(ProtocolError::Timeout);
                }
                Ok(None) => return Err(ProtocolError::ConnectionClosed),
                Ok(Some(Err(e))) => {
                    self.metrics.protocol_error();
                    conn.desynchronized = e.breaks_framing();
                    return Err(e);
                }
                Ok(Some(Ok(frame))) => frame,
            };

        conn.desynchronized = false;
        self.metrics.frame_received(received.header.this_length);
        debug!(
            operation = ?received.operation(),
            bytes = received.header.this_length,
            "Reply received"
        );
        Ok(received)
    }

    fn observe<T>(&self, decoded: Result<T>) -> Result<T> {
        match &decoded {
            Err(ProtocolError::Status(_)) => self.metrics.status_error(),
            Err(_) => self.metrics.protocol_error(),
            Ok(_) => {}
        }
        decoded
    }

    /// One full round trip, decoded by `decode`.
    async fn request<T, F>(&self, request: Request, decode: F) -> Result<T>
    where
        F: FnOnce(Frame) -> Result<T>,
    {
        self.check_cancelled()?;
        let mut conn = self.connection.lock().await;
        let frame = self.exchange(&mut conn, request).await?;
        drop(conn);
        self.observe(decode(frame))
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn open(&self, path: &str, mode: OpenMode) -> Result<FileHandle> {
        let request = Request::Open {
            mode,
            path: path.to_string(),
        };
        self.request(request, response::decode_handle).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn close(&self, handle: FileHandle) -> Result<()> {
        self.request(Request::Close { handle }, response::expect_success)
            .await
    }

    /// Issue a single read request filling at most `dest.len()` bytes.
    ///
    /// The requested length is capped by [`clamp_read_size`]. Returns the
    /// number of bytes the device sent; zero means end of file.
    pub async fn read_into(&self, handle: FileHandle, dest: &mut [u8]) -> Result<usize> {
        let size = clamp_read_size(dest.len(), self.config.max_read_size);
        let request = Request::Read {
            handle,
            size: size as u64,
        };
        let dest = &mut dest[..size];
        self.request(request, |frame| response::decode_read_into(frame, dest))
            .await
    }

    /// Read exactly `len` bytes, issuing as many read requests as needed.
    ///
    /// Fails with [`ProtocolError::EndOfStream`] when the device reports end
    /// of file first.
    #[instrument(skip(self), level = "debug")]
    pub async fn read(&self, handle: FileHandle, len: usize) -> Result<Vec<u8>> {
        let mut dest = vec![0u8; len];
        let mut total = 0;
        while total < len {
            let read = self.read_into(handle, &mut dest[total..]).await?;
            if read == 0 {
                break;
            }
            total += read;
        }

        if total != len {
            return Err(ProtocolError::EndOfStream {
                expected: len,
                received: total,
            });
        }
        Ok(dest)
    }

    /// Write `data` using the configured chunk size.
    pub async fn write(&self, handle: FileHandle, data: impl Into<Bytes>) -> Result<()> {
        self.write_chunked(handle, data, self.config.write_chunk_size)
            .await
    }

    /// Write `data` as frames of at most `chunk_size` data bytes.
    ///
    /// Every frame repeats the handle and carries the length of the whole
    /// logical write. The device acknowledges each frame; the first failing
    /// status aborts the remaining frames.
    #[instrument(skip(self, data), level = "debug")]
    pub async fn write_chunked(
        &self,
        handle: FileHandle,
        data: impl Into<Bytes>,
        chunk_size: usize,
    ) -> Result<()> {
        let data = data.into();
        let chunks = WriteChunks::new(handle, data.clone(), chunk_size)?;
        debug!(
            data_size = data.len(),
            chunks = chunks.chunk_count(),
            "Writing data in chunks"
        );

        self.check_cancelled()?;
        let mut conn = self.connection.lock().await;
        for (index, chunk) in chunks.enumerate() {
            self.check_cancelled()?;
            debug!(index, "Writing chunk");
            let frame = self.exchange(&mut conn, chunk).await?;
            self.observe(response::expect_success(frame))?;
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn seek(&self, handle: FileHandle, pos: SeekFrom) -> Result<()> {
        let (whence, offset) = seek_parameters(pos)?;
        let request = Request::Seek {
            handle,
            whence,
            offset,
        };
        self.request(request, response::expect_success).await
    }

    /// Current position of `handle`.
    #[instrument(skip(self), level = "debug")]
    pub async fn tell(&self, handle: FileHandle) -> Result<u64> {
        let order = self.config.tell_byte_order;
        self.request(Request::Tell { handle }, |frame| {
            response::decode_tell(frame, order)
        })
        .await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn lock(&self, handle: FileHandle, mode: LockMode) -> Result<()> {
        self.request(Request::Lock { handle, mode }, response::expect_success)
            .await
    }

    /// Truncate or extend the open file to `size` bytes.
    #[instrument(skip(self), level = "debug")]
    pub async fn set_file_size(&self, handle: FileHandle, size: u64) -> Result<()> {
        self.request(Request::SetFileSize { handle, size }, response::expect_success)
            .await
    }
}
