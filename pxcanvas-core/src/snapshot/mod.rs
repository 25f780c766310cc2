//! Canvas snapshot decoding.
//!
//! | Module    | Purpose                                             |
//! |-----------|-----------------------------------------------------|
//! | `decoder` | base64 → validated, row-major RGB                   |
//! | `buffer`  | The decoded [`PixelBuffer`] and its accessors       |

pub mod buffer;
pub mod decoder;

pub use buffer::PixelBuffer;
pub use decoder::SnapshotDecoder;
