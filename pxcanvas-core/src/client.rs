//! The canvas client: size handshake, pixel get/set and snapshots over
//! one [`Transport`].
//!
//! A client is single-owner. The protocol has no request ids, so two
//! operations must never interleave on one connection; callers that
//! share a client across tasks serialise access themselves.
//!
//! A reply that misses its deadline is still owed. It is read and
//! thrown away before the next read, which keeps every answer paired
//! with its own request after a timeout.

use std::collections::VecDeque;

use bytes::BytesMut;
use tracing::{debug, info, trace, warn};

use crate::color::Color;
use crate::config::{ClientConfig, EchoPolicy};
use crate::error::PixelflutError;
use crate::message::{Request, Response, StateEncoding};
use crate::network::{TcpTransport, Transport};
use crate::snapshot::{PixelBuffer, SnapshotDecoder};
use crate::state::ClientPhase;

// ── WriteAck ─────────────────────────────────────────────────────

/// Outcome of a pixel write.
///
/// None of these is an error: by the time an echo could be read the
/// write has already happened on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteAck {
    /// Sent without waiting ([`EchoPolicy::Ignore`]).
    Sent,
    /// No echo arrived within the echo timeout.
    Silent,
    /// The server echoed the write as expected.
    Echoed,
    /// The server answered with something else.
    Mismatch { expected: String, received: String },
}

impl WriteAck {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, WriteAck::Mismatch { .. })
    }
}

/// What a request waits for after being sent.
#[derive(Debug, Clone, Copy)]
enum Reply {
    Line,
    Frame,
}

/// A reply the server still owes for a request whose wait ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owed {
    Line,
    Frame,
    Echo,
}

impl From<Reply> for Owed {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Line => Owed::Line,
            Reply::Frame => Owed::Frame,
        }
    }
}

// ── CanvasClient ─────────────────────────────────────────────────

/// Client for one remote canvas.
pub struct CanvasClient<T> {
    config: ClientConfig,
    phase: ClientPhase,
    transport: Option<T>,
    size: Option<(u32, u32)>,
    decoder: Option<SnapshotDecoder>,
    /// Late replies to discard before the next read, oldest first.
    owed: VecDeque<Owed>,
    /// Set once an owed write echo never arrived.
    echoes_missing: bool,
}

impl<T: Transport> CanvasClient<T> {
    /// A disconnected client.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            phase: ClientPhase::Disconnected,
            transport: None,
            size: None,
            decoder: None,
            owed: VecDeque::new(),
            echoes_missing: false,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn phase(&self) -> &ClientPhase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase.is_ready()
    }

    /// Negotiated `(width, height)`; `None` unless ready.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Run the size handshake over an already-open transport.
    pub async fn attach(&mut self, transport: T) -> Result<(u32, u32), PixelflutError> {
        self.phase.begin_connect()?;
        self.negotiate(transport).await
    }

    async fn negotiate(&mut self, transport: T) -> Result<(u32, u32), PixelflutError> {
        if let Err(e) = self.phase.begin_negotiate() {
            self.teardown();
            return Err(e);
        }
        self.transport = Some(transport);

        let result = self.exchange_raw(&Request::Size, Reply::Line).await;
        let size = result.and_then(|line| match Response::parse(line.freeze())? {
            Response::Size { width, height } => Ok((width, height)),
            other => Err(PixelflutError::Protocol(format!(
                "expected SIZE, got {} response",
                other.kind()
            ))),
        });

        match size {
            Ok((width, height)) => {
                self.phase.complete_negotiation()?;
                self.size = Some((width, height));
                self.decoder = Some(SnapshotDecoder::new(width, height));
                info!("canvas size {width}x{height}");
                Ok((width, height))
            }
            Err(e) => {
                self.teardown();
                Err(e)
            }
        }
    }

    /// Read one pixel.
    pub async fn get_pixel(&mut self, x: u32, y: u32) -> Result<Color, PixelflutError> {
        let line = self.exchange(&Request::GetPixel { x, y }, Reply::Line).await?;
        match Response::parse(line.freeze())? {
            Response::Pixel { x: rx, y: ry, color } if rx == x && ry == y => Ok(color),
            Response::Pixel { x: rx, y: ry, .. } => Err(PixelflutError::Protocol(format!(
                "received color for {rx},{ry} even though {x},{y} was requested"
            ))),
            other => Err(PixelflutError::Protocol(format!(
                "expected PX, got {} response",
                other.kind()
            ))),
        }
    }

    /// Write one pixel.
    ///
    /// Under [`EchoPolicy::Expect`] an unexpected echo is logged and
    /// reported as [`WriteAck::Mismatch`], never as an error. An echo
    /// that shows up after [`WriteAck::Silent`] is discarded later.
    pub async fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> Result<WriteAck, PixelflutError> {
        let request = Request::SetPixel { x, y, color };
        if self.config.echo == EchoPolicy::Ignore {
            self.send(&request).await?;
            return Ok(WriteAck::Sent);
        }

        self.phase.require_ready()?;
        self.drain_owed().await?;
        self.send(&request).await?;

        let within = self.config.echo_timeout();
        let echo = match self.transport.as_mut() {
            Some(transport) => transport.try_recv_line(within).await,
            None => return Err(PixelflutError::InvalidState("client is not ready")),
        };
        let Some(line) = self.settle(echo)? else {
            if !self.echoes_missing {
                self.owed.push_back(Owed::Echo);
            }
            return Ok(WriteAck::Silent);
        };
        self.echoes_missing = false;

        let accepted = request.accepted_echoes();
        if accepted.iter().any(|echo| echo.as_bytes() == &line[..]) {
            return Ok(WriteAck::Echoed);
        }

        let received = String::from_utf8_lossy(&line).into_owned();
        let expected = accepted.into_iter().next().unwrap_or_default();
        warn!("unexpected echo for '{request}': '{received}'");
        Ok(WriteAck::Mismatch { expected, received })
    }

    /// Fetch the whole canvas.
    pub async fn snapshot(&mut self, encoding: StateEncoding) -> Result<PixelBuffer, PixelflutError> {
        self.fetch_snapshot(&Request::State(encoding)).await
    }

    /// Fetch the whole canvas with the configured default encoding.
    pub async fn snapshot_default(&mut self) -> Result<PixelBuffer, PixelflutError> {
        let encoding = self.config.encoding;
        self.snapshot(encoding).await
    }

    /// Fetch the whole canvas with the legacy `BINARY` command.
    pub async fn snapshot_legacy(&mut self) -> Result<PixelBuffer, PixelflutError> {
        self.fetch_snapshot(&Request::Binary).await
    }

    async fn fetch_snapshot(&mut self, request: &Request) -> Result<PixelBuffer, PixelflutError> {
        let expected = request.snapshot_encoding().unwrap_or_default();
        let frame = self.exchange(request, Reply::Frame).await?;

        let (encoding, body) = match Response::parse(frame.freeze())? {
            Response::State { encoding, body } => (encoding, body),
            other => {
                return Err(PixelflutError::Protocol(format!(
                    "expected STATE, got {} response",
                    other.kind()
                )));
            }
        };
        if encoding != expected {
            return Err(PixelflutError::Protocol(format!(
                "requested {expected} snapshot, server sent {encoding}"
            )));
        }

        let decoder = self
            .decoder
            .as_mut()
            .ok_or(PixelflutError::InvalidState("client is not ready"))?;
        let buffer = decoder.decode(encoding, &body)?;
        debug!("decoded {encoding} snapshot of {} pixels", buffer.len());
        Ok(buffer)
    }

    /// Ask the server for help text.
    ///
    /// The answer has no terminator of its own; lines are collected
    /// until the server stays quiet for `help_idle_ms`.
    pub async fn help(&mut self, topic: Option<&str>) -> Result<String, PixelflutError> {
        let request = Request::Help(topic.map(str::to_string));
        let first = self.exchange(&request, Reply::Line).await?;

        let mut text = String::from_utf8_lossy(&first).into_owned();
        let idle = self.config.help_idle();
        loop {
            let next = match self.transport.as_mut() {
                Some(transport) => transport.try_recv_line(idle).await,
                None => break,
            };
            match self.settle(next)? {
                Some(line) => {
                    text.push('\n');
                    text.push_str(&String::from_utf8_lossy(&line));
                }
                None => break,
            }
        }
        Ok(text)
    }

    /// Drop the connection. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("error while closing transport: {e}");
            }
        }
        self.teardown();
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn send(&mut self, request: &Request) -> Result<(), PixelflutError> {
        self.phase.require_ready()?;
        let transport = self
            .transport
            .as_mut()
            .ok_or(PixelflutError::InvalidState("client is not ready"))?;

        trace!("-> {request}");
        let line = request.to_string();
        let result = transport.send_line(line.as_bytes()).await;
        self.settle(result)
    }

    async fn exchange(&mut self, request: &Request, reply: Reply) -> Result<BytesMut, PixelflutError> {
        self.phase.require_ready()?;
        self.exchange_raw(request, reply).await
    }

    async fn exchange_raw(&mut self, request: &Request, reply: Reply) -> Result<BytesMut, PixelflutError> {
        self.drain_owed().await?;
        let transport = self
            .transport
            .as_mut()
            .ok_or(PixelflutError::InvalidState("client has no transport"))?;

        debug!("-> {request}");
        let line = request.to_string();
        let result = async {
            transport.send_line(line.as_bytes()).await?;
            match reply {
                Reply::Line => transport.recv_line().await,
                Reply::Frame => transport.recv_frame().await,
            }
        }
        .await;

        // The request is on the wire; its answer may still come.
        if matches!(result, Err(PixelflutError::Timeout(_))) {
            self.owed.push_back(Owed::from(reply));
        }
        self.settle(result)
    }

    /// Read and discard replies that arrived after their deadline, so
    /// the next read gets the answer to its own request.
    ///
    /// A missing line or frame leaves the stream position unknown and
    /// drops the connection. A missing echo means the server does not
    /// echo; echoes are no longer waited for until one shows up.
    async fn drain_owed(&mut self) -> Result<(), PixelflutError> {
        while let Some(owed) = self.owed.front().copied() {
            let transport = self
                .transport
                .as_mut()
                .ok_or(PixelflutError::InvalidState("client is not ready"))?;
            let late = match owed {
                Owed::Line | Owed::Echo => transport.recv_line().await,
                Owed::Frame => transport.recv_frame().await,
            };

            match late {
                Ok(reply) => {
                    debug!("discarded late {owed:?} reply of {} bytes", reply.len());
                    self.owed.pop_front();
                }
                Err(PixelflutError::Timeout(after)) if owed == Owed::Echo => {
                    warn!("no write echo within {after:?}, not waiting for echoes any more");
                    self.echoes_missing = true;
                    self.owed.retain(|o| *o != Owed::Echo);
                }
                Err(PixelflutError::Timeout(after)) => {
                    warn!("late {owed:?} reply still missing after {after:?}, dropping connection");
                    self.teardown();
                    return Err(PixelflutError::Disconnected);
                }
                Err(e) => return self.settle(Err(e)),
            }
        }
        Ok(())
    }

    /// Tear the connection down on fatal errors, pass everything through.
    fn settle<R>(&mut self, result: Result<R, PixelflutError>) -> Result<R, PixelflutError> {
        if let Err(e) = &result {
            if e.is_fatal() {
                warn!("connection lost: {e}");
                self.teardown();
            }
        }
        result
    }

    fn teardown(&mut self) {
        self.transport = None;
        self.size = None;
        self.decoder = None;
        self.owed.clear();
        self.echoes_missing = false;
        self.phase.force_disconnect();
    }
}

impl CanvasClient<TcpTransport> {
    /// Connect to the configured server and negotiate the canvas size.
    pub async fn connect(&mut self) -> Result<(u32, u32), PixelflutError> {
        self.phase.begin_connect()?;
        let info = self.config.connection_info();
        debug!("connecting to {info}");

        let transport = TcpTransport::connect(
            &info,
            self.config.connect_timeout(),
            self.config.read_timeout(),
        )
        .await;

        match transport {
            Ok(transport) => {
                let transport =
                    transport.with_limits(self.config.max_line_bytes, self.config.max_frame_bytes);
                self.negotiate(transport).await
            }
            Err(e) => {
                self.teardown();
                Err(e)
            }
        }
    }

    /// Build a client and connect it in one step.
    pub async fn connect_with(config: ClientConfig) -> Result<Self, PixelflutError> {
        let mut client = Self::new(config);
        client.connect().await?;
        Ok(client)
    }
}

// ── Tests ────────────────────────────────────────────────────────
