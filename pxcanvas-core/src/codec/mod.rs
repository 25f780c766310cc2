//! Newline framing for the pixelflut protocol.
//!
//! Every response, including a multi-megabyte `STATE` snapshot, is one
//! line terminated by `\n`. The decoder keeps accumulating raw chunks
//! until it sees the sentinel and never assumes a single read delivers
//! a whole line. A hard cap bounds how much a misbehaving server can
//! make us buffer.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::PixelflutError;

/// Default cap for control lines (`SIZE`, `PX`, `HELP`).
pub const DEFAULT_MAX_LINE: usize = 64 * 1024;

/// Default cap for snapshot frames.
pub const DEFAULT_MAX_FRAME: usize = 64 * 1024 * 1024;

const SENTINEL: u8 = b'\n';

/// Line codec with an adjustable length cap.
///
/// `Framed` grows its read buffer in read-sized steps; the decoder only
/// scans bytes it has not scanned before, so a large frame arriving in
/// many small reads costs linear time overall.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    /// Bytes of the current buffer already known not to contain `\n`.
    scanned: usize,
}

impl LineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            scanned: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Change the cap for the next frame.
    pub fn set_max_length(&mut self, max_length: usize) {
        self.max_length = max_length;
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE)
    }
}

impl Decoder for LineCodec {
    type Item = BytesMut;
    type Error = PixelflutError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let search_end = src.len().min(self.max_length.saturating_add(1));
        let found = src[self.scanned.min(search_end)..search_end]
            .iter()
            .position(|&b| b == SENTINEL)
            .map(|off| self.scanned + off);

        match found {
            Some(pos) => {
                self.scanned = 0;
                let mut line = src.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                Ok(Some(line))
            }
            None if src.len() > self.max_length => Err(PixelflutError::FrameTooLarge {
                size: src.len(),
                max: self.max_length,
            }),
            None => {
                self.scanned = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                // An unterminated tail is not a response.
                src.clear();
                self.scanned = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Bytes> for LineCodec {
    type Error = PixelflutError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.contains(&SENTINEL) {
            return Err(PixelflutError::unexpected("command contains a newline", &item));
        }
        dst.reserve(item.len() + 1);
        dst.extend_from_slice(&item);
        dst.put_u8(SENTINEL);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_complete_line() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"SIZE 10 20\nPX"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&line[..], b"SIZE 10 20");
        assert_eq!(&buf[..], b"PX");
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn accumulates_partial_chunks() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::new();
        for chunk in [&b"STATE rgb"[..], b"64 AAAA", b"BBBB"] {
            buf.extend_from_slice(chunk);
            assert!(codec.decode(&mut buf).unwrap().is_none());
        }
        buf.extend_from_slice(b"\n");
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&line[..], b"STATE rgb64 AAAABBBB");
        assert!(buf.is_empty());
    }

    #[test]
    fn strips_carriage_return() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"SIZE 1 1\r\n"[..]);
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"SIZE 1 1");
    }

    #[test]
    fn empty_line() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"\n"[..]);
        assert!(codec.decode(&mut buf).unwrap().unwrap().is_empty());
    }

    #[test]
    fn enforces_cap() {
        let mut codec = LineCodec::new(8);
        let mut buf = BytesMut::from(&b"0123456789"[..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, PixelflutError::FrameTooLarge { size: 10, max: 8 }));
    }

    #[test]
    fn line_exactly_at_cap_is_accepted() {
        let mut codec = LineCodec::new(4);
        let mut buf = BytesMut::from(&b"ABCD\n"[..]);
        assert_eq!(&codec.decode(&mut buf).unwrap().unwrap()[..], b"ABCD");
    }

    #[test]
    fn raising_cap_between_frames() {
        let mut codec = LineCodec::new(4);
        codec.set_max_length(64);
        let mut buf = BytesMut::from(&b"STATE rgb64 AAAA\n"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_some());
        assert_eq!(codec.max_length(), 64);
    }

    #[test]
    fn eof_discards_unterminated_tail() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"SIZE 1"[..]);
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn encodes_with_sentinel() {
        let mut codec = LineCodec::default();
        let mut dst = BytesMut::new();
        codec.encode(Bytes::from_static(b"PX 1 2"), &mut dst).unwrap();
        assert_eq!(&dst[..], b"PX 1 2\n");
    }

    #[test]
    fn rejects_embedded_newline() {
        let mut codec = LineCodec::default();
        let mut dst = BytesMut::new();
        assert!(codec.encode(Bytes::from_static(b"PX\n1"), &mut dst).is_err());
        assert!(dst.is_empty());
    }
}
