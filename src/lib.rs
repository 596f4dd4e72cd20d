// MIT License - Copyright (c) 2026 powermax-lan-bridge authors
//
//! # powermax-lan-bridge
//!
//! Direct communication with Visonic PowerMax and PowerMaster alarm
//! control panels over a Powerlink-style LAN interface.
//!
//! The library downloads the panel's settings memory, decodes it into
//! typed records (zones, partitions, user codes, X10 devices) and keeps
//! a live view of the panel state. When the settings download is refused
//! the connection degrades to standard mode and keeps working from status
//! reports alone.
//!
//! ## Quick Start
//!
//! ```no_run
//! use powermax_lan_bridge::{ArmMode, PanelConfig, PanelConnection, PanelType};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PanelConfig::builder()
//!         .panel_type(PanelType::PowerMaxPro)
//!         .pin_code("1234")
//!         .allow_arming(true)
//!         .build();
//!
//!     let (outbound_tx, _outbound_rx) = tokio::sync::mpsc::channel(64);
//!     let connection = PanelConnection::spawn(config, outbound_tx)?;
//!
//!     let mut events = connection.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     connection.arm(ArmMode::Armed).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     connection.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod constants;
pub mod error;
pub mod event;
pub mod protocol;
pub mod settings;
pub mod state;

// Re-exports for convenience
pub use config::{ArmMode, PanelCapabilities, PanelConfig, PanelConfigBuilder, PanelType};
pub use connection::{
    ConnectionStatus, MessageSender, OperatingMode, PanelConnection, PanelRequest,
};
pub use error::{PowermaxError, Result};
pub use event::{EventReceiver, PanelEvent};
pub use protocol::{DownloadCommand, PanelMessage, SendMessage};
pub use settings::{PanelSettings, RawSettingsStore, X10Settings, ZoneSettings};
pub use state::{PanelState, StateDelta, ZoneDelta, ZoneState, ZoneStatusFlags};
