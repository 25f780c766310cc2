//! Continuous snapshot polling.
//!
//! Repeatedly fetches the canvas and publishes the newest buffer on a
//! `tokio::sync::watch` channel. The channel holds a single value, so a
//! slow consumer simply skips snapshots it never looked at; nothing is
//! queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::CanvasClient;
use crate::error::PixelflutError;
use crate::message::StateEncoding;
use crate::network::Transport;
use crate::snapshot::PixelBuffer;

// ── PollStats ────────────────────────────────────────────────────

/// Polling statistics exposed to the consumer.
#[derive(Debug, Clone, Default)]
pub struct PollStats {
    /// Current smoothed snapshots per second.
    pub fps: f64,
    /// Snapshots decoded since start.
    pub total_snapshots: u64,
    /// Decoded RGB bytes since start.
    pub total_bytes: u64,
    /// Snapshot requests that hit the read deadline.
    pub timeouts: u64,
    /// Last snapshot width.
    pub width: u32,
    /// Last snapshot height.
    pub height: u32,
    /// Duration of the last successful fetch and decode.
    pub last_fetch: Duration,
}

/// Latest published snapshot; `None` until the first one arrives.
pub type SnapshotSlot = Option<Arc<PixelBuffer>>;

// ── SnapshotPoller ───────────────────────────────────────────────

/// Owns a ready [`CanvasClient`] and polls it for snapshots.
pub struct SnapshotPoller<T> {
    client: CanvasClient<T>,
    encoding: StateEncoding,
    interval: Duration,
    max_snapshots: Option<u64>,
    running: Arc<AtomicBool>,
    frame_tx: watch::Sender<SnapshotSlot>,
    frame_rx: watch::Receiver<SnapshotSlot>,
    stats_tx: watch::Sender<PollStats>,
    stats_rx: watch::Receiver<PollStats>,
}

impl<T: Transport> SnapshotPoller<T> {
    /// Poll `client` with its configured encoding and interval.
    pub fn new(client: CanvasClient<T>) -> Self {
        let encoding = client.config().encoding;
        let interval = client.config().poll_interval();
        let (frame_tx, frame_rx) = watch::channel(None);
        let (stats_tx, stats_rx) = watch::channel(PollStats::default());
        Self {
            client,
            encoding,
            interval,
            max_snapshots: None,
            running: Arc::new(AtomicBool::new(true)),
            frame_tx,
            frame_rx,
            stats_tx,
            stats_rx,
        }
    }

    pub fn with_encoding(mut self, encoding: StateEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stop by itself after `count` snapshots.
    pub fn with_limit(mut self, count: u64) -> Self {
        self.max_snapshots = Some(count);
        self
    }

    /// Receiver yielding the newest snapshot whenever one is published.
    pub fn frame_receiver(&self) -> watch::Receiver<SnapshotSlot> {
        self.frame_rx.clone()
    }

    pub fn stats_receiver(&self) -> watch::Receiver<PollStats> {
        self.stats_rx.clone()
    }

    /// A cloneable stop flag; storing `false` ends [`run`](Self::run)
    /// after the snapshot in flight.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run the polling loop until stopped, the limit is reached, or a
    /// non-timeout error occurs.
    ///
    /// Timeouts are counted and the loop carries on after the usual
    /// pause; every other error is returned as is, including the
    /// `Disconnected` raised when a timed-out snapshot never arrives.
    /// The client is never reconnected here.
    pub async fn run(&mut self) -> Result<(), PixelflutError> {
        let mut stats = PollStats::default();
        let mut fps_samples: Vec<Duration> = Vec::with_capacity(64);
        let mut last_frame_time = Instant::now();

        while self.is_running() {
            if self
                .max_snapshots
                .is_some_and(|max| stats.total_snapshots >= max)
            {
                break;
            }

            let started = Instant::now();
            let buffer = match self.client.snapshot(self.encoding).await {
                Ok(buffer) => buffer,
                Err(PixelflutError::Timeout(after)) => {
                    stats.timeouts += 1;
                    warn!("snapshot timed out after {after:?}");
                    let _ = self.stats_tx.send(stats.clone());
                    self.pause().await;
                    continue;
                }
                Err(e) => {
                    self.stop();
                    return Err(e);
                }
            };

            stats.total_snapshots += 1;
            stats.total_bytes += buffer.as_bytes().len() as u64;
            stats.width = buffer.width();
            stats.height = buffer.height();
            stats.last_fetch = started.elapsed();

            // Publish; an unread previous snapshot is overwritten.
            let _ = self.frame_tx.send(Some(Arc::new(buffer)));

            let now = Instant::now();
            fps_samples.push(now.duration_since(last_frame_time));
            last_frame_time = now;
            if fps_samples.len() > 30 {
                fps_samples.remove(0);
            }
            let avg_secs: f64 =
                fps_samples.iter().map(|d| d.as_secs_f64()).sum::<f64>() / fps_samples.len() as f64;
            stats.fps = if avg_secs > 0.0 { 1.0 / avg_secs } else { 0.0 };

            let _ = self.stats_tx.send(stats.clone());
            debug!(
                "snapshot #{} in {:?}",
                stats.total_snapshots, stats.last_fetch
            );

            self.pause().await;
        }

        Ok(())
    }

    /// Wait one poll interval unless stopped.
    async fn pause(&self) {
        if !self.interval.is_zero() && self.is_running() {
            tokio::time::sleep(self.interval).await;
        }
    }

    pub fn client(&self) -> &CanvasClient<T> {
        &self.client
    }

    /// Give the client back, e.g. to issue writes between polling runs.
    pub fn into_client(self) -> CanvasClient<T> {
        self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::network::FramedTransport;
    use tokio::io::DuplexStream;

    #[tokio::test]
    async fn stop_before_run_returns_immediately() {
        let client: CanvasClient<FramedTransport<DuplexStream>> =
            CanvasClient::new(ClientConfig::default());
        let mut poller = SnapshotPoller::new(client);
        poller.stop();

        poller.run().await.unwrap();
        assert!(poller.frame_receiver().borrow().is_none());
        assert_eq!(poller.stats_receiver().borrow().total_snapshots, 0);
    }

    #[tokio::test]
    async fn not_ready_client_ends_the_loop() {
        let client: CanvasClient<FramedTransport<DuplexStream>> =
            CanvasClient::new(ClientConfig::default());
        let mut poller = SnapshotPoller::new(client).with_interval(Duration::ZERO);

        let err = poller.run().await.unwrap_err();
        assert!(matches!(err, PixelflutError::InvalidState(_)));
        assert!(!poller.is_running());
    }
}
