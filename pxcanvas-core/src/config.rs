//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::{DEFAULT_MAX_FRAME, DEFAULT_MAX_LINE};
use crate::message::StateEncoding;
use crate::network::ConnectionInfo;

/// How the client treats a server's answer to a pixel write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EchoPolicy {
    /// Fire and forget; never read after a write.
    #[default]
    Ignore,
    /// Wait up to `echo_timeout_ms` for an echo and compare it.
    Expect,
}

/// Settings for one [`CanvasClient`](crate::CanvasClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or IP.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-response read deadline in milliseconds.
    pub read_timeout_ms: u64,
    /// Cap for `SIZE` / `PX` / `HELP` lines.
    pub max_line_bytes: usize,
    /// Cap for one `STATE` frame.
    pub max_frame_bytes: usize,
    /// Write acknowledgement handling.
    pub echo: EchoPolicy,
    /// How long to wait for a write echo under [`EchoPolicy::Expect`].
    pub echo_timeout_ms: u64,
    /// Quiet period that ends a multi-line `HELP` answer.
    pub help_idle_ms: u64,
    /// Default snapshot encoding.
    pub encoding: StateEncoding,
    /// Pause between snapshots when polling.
    pub poll_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1234,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            max_line_bytes: DEFAULT_MAX_LINE,
            max_frame_bytes: DEFAULT_MAX_FRAME,
            echo: EchoPolicy::Ignore,
            echo_timeout_ms: 200,
            help_idle_ms: 250,
            encoding: StateEncoding::Rgb64,
            poll_interval_ms: 100,
        }
    }
}

impl ClientConfig {
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.host.clone(), self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn help_idle(&self) -> Duration {
        Duration::from_millis(self.help_idle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
