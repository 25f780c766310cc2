//! `STATE` payload decoder.
//!
//! Turns the base64 body of a snapshot response into a row-major
//! [`PixelBuffer`]. On the wire the pixels are column-major: pixel
//! `(x, y)` is element `x * height + y`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::DecodeError;
use crate::message::StateEncoding;
use crate::snapshot::buffer::{PixelBuffer, RGB_CHANNELS};

// ── SnapshotDecoder ──────────────────────────────────────────────

/// Decoder bound to one negotiated canvas size.
///
/// Keeps a scratch buffer for the base64 stage so repeated polling does
/// not reallocate it on every snapshot.
#[derive(Debug)]
pub struct SnapshotDecoder {
    width: u32,
    height: u32,
    scratch: Vec<u8>,
}

impl SnapshotDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scratch: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Decode a base64 body.
    pub fn decode(
        &mut self,
        encoding: StateEncoding,
        body: &[u8],
    ) -> Result<PixelBuffer, DecodeError> {
        self.scratch.clear();
        STANDARD.decode_vec(body, &mut self.scratch)?;
        let buf = remap(self.width, self.height, encoding, &self.scratch);
        if self.scratch.capacity() > body.len() * 2 {
            // Canvas shrank or one-off huge payload.
            self.scratch.shrink_to(body.len());
        }
        buf
    }

    /// Decode already base64-decoded wire bytes.
    pub fn decode_raw(&self, encoding: StateEncoding, raw: &[u8]) -> Result<PixelBuffer, DecodeError> {
        remap(self.width, self.height, encoding, raw)
    }
}

/// Validate `raw` and reorder it from column-major to row-major,
/// dropping the alpha channel.
fn remap(
    width: u32,
    height: u32,
    encoding: StateEncoding,
    raw: &[u8],
) -> Result<PixelBuffer, DecodeError> {
    let channels = encoding.channels();

    // 1. Whole pixels only.
    if raw.len() % channels != 0 {
        return Err(DecodeError::ChannelMismatch {
            len: raw.len(),
            channels,
        });
    }

    // 2. Alpha must be zero everywhere.
    let color_offset = match encoding.alpha_offset() {
        Some(alpha) => {
            if let Some((index, px)) = raw
                .chunks_exact(channels)
                .enumerate()
                .find(|(_, px)| px[alpha] != 0)
            {
                return Err(DecodeError::NonZeroAlpha {
                    index,
                    value: px[alpha],
                });
            }
            if alpha == 0 { 1 } else { 0 }
        }
        None => 0,
    };

    // 3. Exactly one pixel per canvas cell.
    let (w, h) = (width as usize, height as usize);
    let expected = w * h;
    let actual = raw.len() / channels;
    if actual != expected {
        return Err(DecodeError::DimensionMismatch { expected, actual });
    }

    // 4. Column-major → row-major, walking the wire bytes in order.
    let mut out = vec![0u8; expected * RGB_CHANNELS];
    for (i, px) in raw.chunks_exact(channels).enumerate() {
        let (x, y) = (i / h, i % h);
        let dst = (y * w + x) * RGB_CHANNELS;
        out[dst..dst + RGB_CHANNELS].copy_from_slice(&px[color_offset..color_offset + RGB_CHANNELS]);
    }

    Ok(PixelBuffer::from_parts_unchecked(width, height, out))
}

// ── Tests ────────────────────────────────────────────────────────
