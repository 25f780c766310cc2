//! Multi-step operations behind the CLI subcommands.

use std::path::Path;

use pxcanvas_core::{CanvasClient, Color, PixelBuffer, PixelflutError, Transport};
use tracing::{debug, warn};

/// Result of a [`fill_rect`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Pixels written.
    pub written: u64,
    /// Writes whose echo did not match.
    pub mismatched: u64,
}

/// Paint a `w`×`h` rectangle at `(x, y)`, clipped to the canvas.
pub async fn fill_rect<T: Transport>(
    client: &mut CanvasClient<T>,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    color: Color,
) -> Result<FillReport, PixelflutError> {
    let (width, height) = client
        .size()
        .ok_or(PixelflutError::InvalidState("client is not ready"))?;

    let x_end = x.saturating_add(w).min(width);
    let y_end = y.saturating_add(h).min(height);
    if x_end <= x || y_end <= y {
        warn!("rectangle {w}x{h}+{x}+{y} lies outside the {width}x{height} canvas");
        return Ok(FillReport::default());
    }

    let mut report = FillReport::default();
    for py in y..y_end {
        for px in x..x_end {
            let ack = client.set_pixel(px, py, color).await?;
            report.written += 1;
            if ack.is_mismatch() {
                report.mismatched += 1;
            }
        }
    }
    debug!("filled {} pixels", report.written);
    Ok(report)
}

/// Write the snapshot as raw row-major RGB bytes.
pub async fn write_rgb(path: &Path, buffer: &PixelBuffer) -> std::io::Result<()> {
    tokio::fs::write(path, buffer.as_bytes()).await
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pxcanvas_core::{ClientConfig, FramedTransport};
    use std::time::Duration;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn fill_is_clipped_to_canvas() {
        let mock = Builder::new()
            .write(b"SIZE\n")
            .read(b"SIZE 3 2\n")
            .write(b"PX 2 0 FF0000\n")
            .write(b"PX 2 1 FF0000\n")
            .build();
        let mut client = CanvasClient::new(ClientConfig::default());
        client
            .attach(FramedTransport::new(mock, Duration::from_secs(1)))
            .await
            .unwrap();

        let report = fill_rect(&mut client, 2, 0, 5, 5, Color::rgb(0xFF, 0, 0))
            .await
            .unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.mismatched, 0);
    }

    #[tokio::test]
    async fn fill_outside_canvas_writes_nothing() {
        let mock = Builder::new().write(b"SIZE\n").read(b"SIZE 3 2\n").build();
        let mut client = CanvasClient::new(ClientConfig::default());
        client
            .attach(FramedTransport::new(mock, Duration::from_secs(1)))
            .await
            .unwrap();

        let report = fill_rect(&mut client, 10, 10, 2, 2, Color::rgb(1, 1, 1))
            .await
            .unwrap();
        assert_eq!(report, FillReport::default());
    }

    #[tokio::test]
    async fn fill_requires_ready_client() {
        let mut client: CanvasClient<FramedTransport<tokio_test::io::Mock>> =
            CanvasClient::new(ClientConfig::default());
        let err = fill_rect(&mut client, 0, 0, 1, 1, Color::rgb(0, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, PixelflutError::InvalidState(_)));
    }

    #[tokio::test]
    async fn rgb_dump_is_row_major() {
        let buffer = PixelBuffer::from_row_major(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let path = std::env::temp_dir().join(format!("pxcanvas-dump-{}.rgb", std::process::id()));

        write_rgb(&path, &buffer).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4, 5, 6]);
        std::fs::remove_file(&path).ok();
    }
}
