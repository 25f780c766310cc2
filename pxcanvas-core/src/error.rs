//! Domain-specific error types for the pixelflut client.
//!
//! All fallible operations return `Result<T, PixelflutError>`.
//! Snapshot decoding failures are grouped under [`DecodeError`] so a
//! caller can tell a corrupt payload apart from a broken connection.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the pixelflut client.
#[derive(Debug, Error)]
pub enum PixelflutError {
    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error (refused, DNS, reset).
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The peer closed the stream before a complete line arrived.
    #[error("disconnected by peer")]
    Disconnected,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Protocol Errors ──────────────────────────────────────────
    /// A response line did not match the expected grammar.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A frame grew past the configured cap without a sentinel.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A color token was not 6 or 8 hex digits.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// The operation is not valid in the client's current phase.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    // ── Snapshot Errors ──────────────────────────────────────────
    /// The snapshot payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl PixelflutError {
    /// Errors after which the same operation may simply be retried on
    /// the same connection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PixelflutError::Timeout(_) | PixelflutError::Protocol(_) | PixelflutError::Decode(_)
        )
    }

    /// Errors that tear down the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PixelflutError::Connection(_)
                | PixelflutError::Disconnected
                | PixelflutError::FrameTooLarge { .. }
        )
    }

    /// Build a [`PixelflutError::Protocol`] quoting the offending line.
    pub fn unexpected(what: &str, line: &[u8]) -> Self {
        const MAX_QUOTE: usize = 80;
        let text = String::from_utf8_lossy(&line[..line.len().min(MAX_QUOTE)]);
        let ellipsis = if line.len() > MAX_QUOTE { "..." } else { "" };
        PixelflutError::Protocol(format!("{what}: '{text}{ellipsis}'"))
    }
}

// ── DecodeError ──────────────────────────────────────────────────

/// Typed failure of the snapshot decoder.
///
/// Any of these discards the whole snapshot; no partial buffer is
/// ever returned.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body was not valid standard base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded byte count is not a multiple of the channel count.
    #[error("payload of {len} bytes is not a multiple of {channels} channels")]
    ChannelMismatch { len: usize, channels: usize },

    /// A 4-channel snapshot carried a non-zero alpha byte.
    #[error("non-zero alpha {value:#04x} at pixel {index}")]
    NonZeroAlpha { index: usize, value: u8 },

    /// The pixel count does not match the negotiated canvas size.
    #[error("expected {expected} pixels, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for PixelflutError {
    fn from(s: String) -> Self {
        PixelflutError::Other(s)
    }
}

impl From<&str> for PixelflutError {
    fn from(s: &str) -> Self {
        PixelflutError::Other(s.to_string())
    }
}

impl From<base64::DecodeError> for PixelflutError {
    fn from(e: base64::DecodeError) -> Self {
        PixelflutError::Decode(DecodeError::Base64(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = PixelflutError::FrameTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e: PixelflutError = DecodeError::NonZeroAlpha { index: 3, value: 0x10 }.into();
        assert!(e.to_string().contains("0x10"));
        assert!(e.to_string().contains("pixel 3"));
    }

    #[test]
    fn from_string() {
        let e: PixelflutError = "something broke".into();
        assert!(matches!(e, PixelflutError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let e: PixelflutError = io_err.into();
        assert!(matches!(e, PixelflutError::Connection(_)));
        assert!(e.is_fatal());
        assert!(!e.is_retryable());
    }

    #[test]
    fn classification() {
        assert!(PixelflutError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(PixelflutError::Protocol("x".into()).is_retryable());
        assert!(PixelflutError::Disconnected.is_fatal());
        assert!(!PixelflutError::InvalidState("not ready").is_fatal());
    }

    #[test]
    fn unexpected_quotes_and_truncates() {
        let long = vec![b'A'; 200];
        let e = PixelflutError::unexpected("bad SIZE", &long);
        let text = e.to_string();
        assert!(text.contains("bad SIZE"));
        assert!(text.ends_with("...'"));

        let e = PixelflutError::unexpected("bad SIZE", b"SIZE 10");
        assert!(e.to_string().contains("'SIZE 10'"));
    }
}
