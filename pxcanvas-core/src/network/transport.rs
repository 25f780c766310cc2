//! Byte-stream transport to one pixelflut server.
//!
//! [`Transport`] is the seam the canvas client talks through; the
//! production implementation is [`FramedTransport`] over a TCP stream,
//! tests plug in in-memory streams or scripted mocks.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::codec::{DEFAULT_MAX_FRAME, DEFAULT_MAX_LINE, LineCodec};
use crate::error::PixelflutError;

// ── Transport ────────────────────────────────────────────────────

/// Line-oriented request/response channel.
#[async_trait]
pub trait Transport: Send {
    /// Write `line` followed by `\n`.
    async fn send_line(&mut self, line: &[u8]) -> Result<(), PixelflutError>;

    /// Receive one control line, newline stripped.
    async fn recv_line(&mut self) -> Result<BytesMut, PixelflutError>;

    /// Receive one (possibly huge) framed payload up to the sentinel.
    async fn recv_frame(&mut self) -> Result<BytesMut, PixelflutError>;

    /// Receive one control line if it arrives within `within`.
    async fn try_recv_line(&mut self, within: Duration) -> Result<Option<BytesMut>, PixelflutError>;

    /// Flush and shut down the write half.
    async fn close(&mut self) -> Result<(), PixelflutError>;
}

// ── FramedTransport ──────────────────────────────────────────────

/// [`Transport`] over any async byte stream, framed by [`LineCodec`].
pub struct FramedTransport<S> {
    framed: Framed<S, LineCodec>,
    read_timeout: Duration,
    max_line: usize,
    max_frame: usize,
}

/// The transport used for real connections.
pub type TcpTransport = FramedTransport<TcpStream>;

impl<S> FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established stream.
    pub fn new(stream: S, read_timeout: Duration) -> Self {
        Self {
            framed: Framed::new(stream, LineCodec::new(DEFAULT_MAX_LINE)),
            read_timeout,
            max_line: DEFAULT_MAX_LINE,
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    /// Override the line and frame caps.
    pub fn with_limits(mut self, max_line: usize, max_frame: usize) -> Self {
        self.max_line = max_line;
        self.max_frame = max_frame.max(max_line);
        self.framed.codec_mut().set_max_length(max_line);
        self
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn get_ref(&self) -> &S {
        self.framed.get_ref()
    }

    async fn next_line(&mut self, limit: usize, within: Duration) -> Result<BytesMut, PixelflutError> {
        self.framed.codec_mut().set_max_length(limit);
        let next = tokio::time::timeout(within, self.framed.next()).await;
        self.framed.codec_mut().set_max_length(self.max_line);

        match next {
            Err(_) => Err(PixelflutError::Timeout(within)),
            Ok(None) => Err(PixelflutError::Disconnected),
            Ok(Some(line)) => line,
        }
    }
}

impl TcpTransport {
    /// Resolve and connect to `info`, bounded by `connect_timeout`.
    pub async fn connect(
        info: &ConnectionInfo,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, PixelflutError> {
        let addr = info.to_string();
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|_| PixelflutError::Timeout(connect_timeout))??;
        stream.set_nodelay(true)?;
        debug!("connected to {addr}");
        Ok(Self::new(stream, read_timeout))
    }
}

#[async_trait]
impl<S> Transport for FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_line(&mut self, line: &[u8]) -> Result<(), PixelflutError> {
        self.framed.send(Bytes::copy_from_slice(line)).await
    }

    async fn recv_line(&mut self) -> Result<BytesMut, PixelflutError> {
        let (limit, within) = (self.max_line, self.read_timeout);
        self.next_line(limit, within).await
    }

    async fn recv_frame(&mut self) -> Result<BytesMut, PixelflutError> {
        let (limit, within) = (self.max_frame, self.read_timeout);
        let frame = self.next_line(limit, within).await?;
        debug!("received frame of {} bytes", frame.len());
        Ok(frame)
    }

    async fn try_recv_line(&mut self, within: Duration) -> Result<Option<BytesMut>, PixelflutError> {
        let limit = self.max_line;
        match self.next_line(limit, within).await {
            Ok(line) => Ok(Some(line)),
            Err(PixelflutError::Timeout(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn close(&mut self) -> Result<(), PixelflutError> {
        SinkExt::<Bytes>::close(&mut self.framed).await
    }
}

// ── ConnectionInfo ───────────────────────────────────────────────

/// Remote endpoint of a canvas server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    host: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
