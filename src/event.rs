// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

use std::sync::Arc;

use crate::connection::{ConnectionStatus, OperatingMode};
use crate::settings::PanelSettings;
use crate::state::PanelState;

/// All events emitted by a panel connection.
///
/// Users subscribe via [`crate::connection::PanelConnection::subscribe`] to
/// receive a `tokio::sync::broadcast::Receiver<PanelEvent>`.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    /// The transport came up and the session is being established.
    Connected,
    /// The connection was lost; a reconnect will be scheduled.
    Disconnected,
    /// The connection status changed.
    StatusChanged(ConnectionStatus),
    /// A settings download pass finished and produced fresh settings.
    /// `complete` is false when some ranges were still missing.
    SettingsUpdated { settings: Arc<PanelSettings>, complete: bool },
    /// One zone's settings changed from live traffic (name or type patch).
    ZoneSettingsUpdated { zone: u8 },
    /// The live state changed.
    StateChanged(PanelState),
    /// The panel's operating mode was determined or changed.
    ModeChanged(OperatingMode),
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<PanelEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<PanelEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
