//! # AFC Client
//!
//! Async client for the Apple File Conduit (AFC) protocol, the file access
//! service exposed by iOS devices.
//!
//! The crate speaks AFC over any ordered byte channel implementing
//! [`tokio::io::AsyncRead`] + [`tokio::io::AsyncWrite`]. Establishing that
//! channel (usbmux, lockdown, remote service discovery) is left to the caller;
//! [`config::LOCKDOWN_SERVICE_NAME`] and [`config::RSD_SERVICE_NAME`] name the
//! services to start.
//!
//! ## Layers
//! - [`core`]: header codec, request encoding, reply decoding and the
//!   `tokio_util` framing codec
//! - [`protocol`]: typed vocabulary such as [`FileHandle`] and [`FileInfo`]
//! - [`service`]: [`AfcClient`], the round-trip engine with file and tree operations
//! - [`utils`]: path helpers, metrics and logging setup
//!
//! ## Example
//! ```rust,no_run
//! use afc_client::{AfcClient, OpenMode};
//! use futures::TryStreamExt;
//!
//! # async fn example(stream: tokio::net::TcpStream) -> afc_client::error::Result<()> {
//! let client = AfcClient::new(stream);
//!
//! let handle = client.open("/Downloads/notes.txt", OpenMode::WriteOnly).await?;
//! client.write(handle, &b"hello"[..]).await?;
//! client.close(handle).await?;
//!
//! let paths: Vec<String> = client.list("/Downloads", Some(1)).try_collect().await?;
//! println!("{paths:?}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

pub use config::{AfcConfig, ClientConfig, LoggingConfig};
pub use error::{AfcError, ProtocolError, Result};
pub use protocol::{FileHandle, FileInfo, FileType, LinkType, LockMode, OpenMode, TellByteOrder};
pub use service::{clamp_read_size, AfcClient, WalkEntry};
