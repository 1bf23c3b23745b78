//! Push Channel Abstraction
//!
//! A long-lived, bidirectional text channel scoped to a folder-listing feed.
//! Hosts supply the transport (typically a WebSocket); reconnection and
//! backoff, if any, live in the host implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::error::Result;

/// Readiness of a push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Closing => "closing",
            ChannelState::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ChannelState::Open)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An established (or establishing) push channel.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Current readiness.
    fn state(&self) -> ChannelState;

    /// Receiver notified on every readiness transition.
    fn watch_state(&self) -> watch::Receiver<ChannelState>;

    /// Send a text frame. Fails if the channel is not open.
    async fn send_text(&self, text: String) -> Result<()>;

    /// Subscribe to incoming text frames, in arrival order.
    fn subscribe(&self) -> broadcast::Receiver<String>;
}

/// Factory for push channels.
pub trait PushConnector: Send + Sync {
    /// Start connecting to `url`.
    ///
    /// Returns immediately; the channel starts in
    /// [`ChannelState::Connecting`] and reports progress through
    /// [`PushChannel::watch_state`].
    fn open(&self, url: &str) -> Result<Arc<dyn PushChannel>>;
}
