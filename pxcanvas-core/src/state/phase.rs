//! Lifecycle of a canvas client connection.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::time::Instant;

use crate::error::PixelflutError;

// ── ClientPhase ──────────────────────────────────────────────────

/// The current phase of a canvas client.
///
/// ```text
///  Disconnected ──► Connecting ──► Negotiating ──► Ready
///       ▲                │               │            │
///       └────────────────┴───────────────┴────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClientPhase {
    /// No transport. Initial / terminal state.
    #[default]
    Disconnected,

    /// Establishing the byte stream.
    Connecting,

    /// Stream is up; waiting for the `SIZE` answer.
    Negotiating,

    /// Canvas size known; pixel and snapshot traffic allowed.
    Ready {
        /// When the client entered the `Ready` state.
        since: Instant,
    },
}

impl std::fmt::Display for ClientPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Negotiating => write!(f, "Negotiating"),
            Self::Ready { .. } => write!(f, "Ready"),
        }
    }
}

impl ClientPhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the client has been `Ready`, `None` in any other phase.
    pub fn ready_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Ready { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), PixelflutError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(PixelflutError::InvalidState(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// Valid from: `Connecting`.
    pub fn begin_negotiate(&mut self) -> Result<(), PixelflutError> {
        match self {
            Self::Connecting => {
                *self = Self::Negotiating;
                Ok(())
            }
            _ => Err(PixelflutError::InvalidState(
                "cannot negotiate: not in Connecting state",
            )),
        }
    }

    /// Valid from: `Negotiating`.
    pub fn complete_negotiation(&mut self) -> Result<(), PixelflutError> {
        match self {
            Self::Negotiating => {
                *self = Self::Ready {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(PixelflutError::InvalidState(
                "cannot complete negotiation: not in Negotiating state",
            )),
        }
    }

    /// Fails unless `Ready`.
    pub fn require_ready(&self) -> Result<(), PixelflutError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(PixelflutError::InvalidState("client is not ready"))
        }
    }

    /// Reset to `Disconnected` regardless of current state.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = ClientPhase::Disconnected;

        phase.begin_connect().unwrap();
        assert_eq!(phase, ClientPhase::Connecting);

        phase.begin_negotiate().unwrap();
        assert_eq!(phase, ClientPhase::Negotiating);

        phase.complete_negotiation().unwrap();
        assert!(phase.is_ready());
        assert!(phase.ready_duration().is_some());
        phase.require_ready().unwrap();

        phase.force_disconnect();
        assert!(phase.is_disconnected());
    }

    #[test]
    fn invalid_transition_connect_when_ready() {
        let mut phase = ClientPhase::Ready {
            since: Instant::now(),
        };
        assert!(phase.begin_connect().is_err());
    }

    #[test]
    fn invalid_transition_negotiate_from_disconnected() {
        let mut phase = ClientPhase::Disconnected;
        assert!(phase.begin_negotiate().is_err());
        assert!(phase.complete_negotiation().is_err());
    }

    #[test]
    fn not_ready_is_invalid_state() {
        for phase in [
            ClientPhase::Disconnected,
            ClientPhase::Connecting,
            ClientPhase::Negotiating,
        ] {
            assert!(matches!(
                phase.require_ready(),
                Err(PixelflutError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn display_format() {
        assert_eq!(ClientPhase::Disconnected.to_string(), "Disconnected");
        assert_eq!(ClientPhase::Connecting.to_string(), "Connecting");
        assert_eq!(ClientPhase::Negotiating.to_string(), "Negotiating");
        assert_eq!(
            ClientPhase::Ready {
                since: Instant::now()
            }
            .to_string(),
            "Ready"
        );
    }

    #[test]
    fn default_phase_is_disconnected() {
        assert!(ClientPhase::default().is_disconnected());
    }
}
