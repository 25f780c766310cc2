//! # pxcanvas-core
//!
//! Client library for drawing on and reading back a remote pixelflut
//! canvas.
//!
//! This crate contains:
//! - **Codec**: `LineCodec`, newline framing with a hard length cap
//! - **Network**: the `Transport` seam and its TCP implementation
//! - **Messages**: `Request` / `Response` lines, `StateEncoding`, `Color`
//! - **Snapshot**: base64 payload decoding and column-major → row-major remap
//! - **Client**: `CanvasClient`, size handshake plus pixel and snapshot calls
//! - **Poller**: `SnapshotPoller`, latest-snapshot hand-off over a watch channel
//! - **Error**: `PixelflutError`, typed, `thiserror`-based error hierarchy

pub mod client;
pub mod codec;
pub mod color;
pub mod config;
pub mod error;
pub mod message;
pub mod network;
pub mod poller;
pub mod snapshot;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::{CanvasClient, WriteAck};
pub use codec::LineCodec;
pub use color::Color;
pub use config::{ClientConfig, EchoPolicy};
pub use error::{DecodeError, PixelflutError};
pub use message::{Request, Response, StateEncoding};
pub use network::{ConnectionInfo, FramedTransport, TcpTransport, Transport};
pub use poller::{PollStats, SnapshotPoller, SnapshotSlot};
pub use snapshot::{PixelBuffer, SnapshotDecoder};
pub use state::ClientPhase;
