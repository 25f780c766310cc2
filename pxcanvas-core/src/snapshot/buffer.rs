//! Decoded canvas snapshots.

/// Bytes per pixel in a [`PixelBuffer`].
pub const RGB_CHANNELS: usize = 3;

// ── PixelBuffer ──────────────────────────────────────────────────

/// A complete canvas snapshot in row-major RGB order.
///
/// Pixel `(x, y)` lives at byte offset `(y * width + x) * 3`. Every
/// snapshot call produces a fresh, independent buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap row-major RGB bytes.
    ///
    /// Returns `None` if `data` is not exactly `width * height * 3`
    /// bytes long.
    pub fn from_row_major(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * RGB_CHANNELS;
        (data.len() == expected).then_some(Self { width, height, data })
    }

    pub(crate) fn from_parts_unchecked(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize * RGB_CHANNELS);
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (`width * height`).
    pub fn len(&self) -> usize {
        self.data.len() / RGB_CHANNELS
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The RGB value at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
        let px = &self.data[offset..offset + RGB_CHANNELS];
        Some([px[0], px[1], px[2]])
    }

    /// Raw row-major RGB bytes, ready for an image or texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Iterate over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let stride = (self.width as usize * RGB_CHANNELS).max(1);
        self.data.chunks_exact(stride)
    }

    /// The same pixels in wire (column-major) order.
    ///
    /// Pixel `(x, y)` lands at pixel index `x * height + y`. This is the
    /// exact inverse of the remap applied when decoding.
    pub fn to_column_major(&self) -> Vec<u8> {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut out = vec![0u8; self.data.len()];
        for y in 0..h {
            for x in 0..w {
                let src = (y * w + x) * RGB_CHANNELS;
                let dst = (x * h + y) * RGB_CHANNELS;
                out[dst..dst + RGB_CHANNELS].copy_from_slice(&self.data[src..src + RGB_CHANNELS]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(PixelBuffer::from_row_major(2, 2, vec![0; 11]).is_none());
        assert!(PixelBuffer::from_row_major(2, 2, vec![0; 12]).is_some());
    }

    #[test]
    fn pixel_lookup_and_bounds() {
        let data = (0u8..12).collect();
        let buf = PixelBuffer::from_row_major(2, 2, data).unwrap();
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.pixel(1, 0), Some([3, 4, 5]));
        assert_eq!(buf.pixel(0, 1), Some([6, 7, 8]));
        assert_eq!(buf.pixel(2, 0), None);
        assert_eq!(buf.pixel(0, 2), None);
    }

    #[test]
    fn rows_have_row_stride() {
        let buf = PixelBuffer::from_row_major(3, 2, vec![7; 18]).unwrap();
        let rows: Vec<_> = buf.rows().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() == 9));
    }

    #[test]
    fn column_major_of_non_square() {
        // 3x1 canvas: row-major and column-major coincide per pixel index.
        let buf = PixelBuffer::from_row_major(3, 1, (0u8..9).collect()).unwrap();
        assert_eq!(buf.to_column_major(), (0u8..9).collect::<Vec<_>>());

        // 1x3 canvas: the same.
        let buf = PixelBuffer::from_row_major(1, 3, (0u8..9).collect()).unwrap();
        assert_eq!(buf.to_column_major(), (0u8..9).collect::<Vec<_>>());
    }

    #[test]
    fn empty_canvas() {
        let buf = PixelBuffer::from_row_major(0, 0, Vec::new()).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.rows().count(), 0);
        assert!(buf.to_column_major().is_empty());
    }
}
