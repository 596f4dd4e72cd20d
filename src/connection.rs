// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

//! The connection state machine.
//!
//! A single actor task owns the raw settings memory, the decoded settings
//! and the live state. Everything reaches it through one mpsc channel, so
//! there is no shared-state locking: periodic ticks, panel messages from
//! the transport and user requests are serialized by construction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{ArmMode, PanelConfig};
use crate::error::{PowermaxError, Result};
use crate::event::{event_channel, EventReceiver, EventSender, PanelEvent};
use crate::protocol::{download_sequence, DownloadCommand, PanelMessage, SendMessage};
use crate::settings::{decode, PanelSettings, RawSettingsStore};
use crate::state::{merge, PanelState, StateDelta, ZoneDelta};

/// How the panel session is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Status reports only; settings are placeholders.
    Standard,
    /// Full settings download succeeded; richer commands are available.
    Enhanced,
}

/// Lifecycle of the panel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    /// A settings download is in progress; `remaining` counts the attempts
    /// left before falling back to standard mode.
    Downloading { remaining: u32 },
    Operational(OperatingMode),
}

/// User-facing requests, validated by the actor against the current mode
/// and configuration before anything is sent to the panel.
#[derive(Debug, Clone)]
pub enum PanelRequest {
    Arm(ArmMode),
    Bypass { zone: u8, bypassed: bool },
    SwitchX10 { device: u8, on: bool },
    EventLog,
    /// Force a fresh settings download.
    StartDownload,
}

pub(crate) enum ConnectionInput {
    Tick,
    Message(PanelMessage),
    Request(PanelRequest, oneshot::Sender<Result<()>>),
    Shutdown,
}

/// Handle to a running panel connection.
///
/// # Example
///
/// ```no_run
/// use powermax_lan_bridge::{PanelConfig, PanelConnection, PanelType};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = PanelConfig::builder()
///         .panel_type(PanelType::PowerMaxPro)
///         .pin_code("1234")
///         .build();
///
///     let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::channel(64);
///     let connection = PanelConnection::spawn(config, outbound_tx)?;
///
///     let mut events = connection.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     // The transport layer forwards outbound_rx to the panel and feeds
///     // decoded panel messages back through this sender.
///     let _messages = connection.message_sender();
///     while let Some(msg) = outbound_rx.recv().await {
///         println!("-> {:?}", msg);
///     }
///
///     connection.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct PanelConnection {
    input_tx: mpsc::Sender<ConnectionInput>,
    events: EventSender,
    state_rx: watch::Receiver<PanelState>,
    status_rx: watch::Receiver<ConnectionStatus>,
    shut_down: Arc<AtomicBool>,
    actor_handle: JoinHandle<()>,
}

impl PanelConnection {
    /// Validate the configuration, spawn the actor task and its ticker.
    ///
    /// `outbound` is where the actor puts commands for the transport layer
    /// to frame and write to the panel.
    pub fn spawn(config: PanelConfig, outbound: mpsc::Sender<SendMessage>) -> Result<Self> {
        config.validate()?;

        let (input_tx, input_rx) = mpsc::channel(64);
        let (events, _) = event_channel(256);
        let (state_tx, state_rx) = watch::channel(PanelState::new(0));
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

        let tick_interval = config.tick_interval;
        let actor = Actor::new(config, outbound, events.clone(), state_tx, status_tx);
        let actor_handle = tokio::spawn(actor.run(input_rx));

        let ticker_tx = input_tx.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticker_tx.send(ConnectionInput::Tick).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            input_tx,
            events,
            state_rx,
            status_rx,
            shut_down: Arc::new(AtomicBool::new(false)),
            actor_handle,
        })
    }

    /// Subscribe to panel events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Snapshot of the live panel state.
    pub fn state(&self) -> PanelState {
        self.state_rx.borrow().clone()
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Sender the transport layer uses to feed decoded panel messages in.
    pub fn message_sender(&self) -> MessageSender {
        MessageSender { input_tx: self.input_tx.clone() }
    }

    /// Arm or disarm the system.
    pub async fn arm(&self, mode: ArmMode) -> Result<()> {
        self.request(PanelRequest::Arm(mode)).await
    }

    /// Bypass or unbypass one zone. Requires enhanced mode and a panel
    /// configured to allow bypass.
    pub async fn bypass(&self, zone: u8, bypassed: bool) -> Result<()> {
        self.request(PanelRequest::Bypass { zone, bypassed }).await
    }

    /// Switch the PGM output (device 0) or an X10 device.
    pub async fn switch_x10(&self, device: u8, on: bool) -> Result<()> {
        self.request(PanelRequest::SwitchX10 { device, on }).await
    }

    /// Request the panel's event log.
    pub async fn request_event_log(&self) -> Result<()> {
        self.request(PanelRequest::EventLog).await
    }

    /// Force a fresh settings download.
    pub async fn request_download(&self) -> Result<()> {
        self.request(PanelRequest::StartDownload).await
    }

    /// Tear the connection down. Safe to call more than once; only the
    /// first call does anything.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.input_tx.send(ConnectionInput::Shutdown).await;
    }

    /// Wait for the actor task to finish after a shutdown.
    pub async fn join(self) {
        let _ = self.actor_handle.await;
    }

    async fn request(&self, request: PanelRequest) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.input_tx
            .send(ConnectionInput::Request(request, reply_tx))
            .await
            .map_err(|_| PowermaxError::ChannelClosed)?;
        reply_rx.await.map_err(|_| PowermaxError::ChannelClosed)?
    }
}

/// Cloneable handle the transport layer uses to push panel messages into
/// the actor.
#[derive(Clone)]
pub struct MessageSender {
    input_tx: mpsc::Sender<ConnectionInput>,
}

impl MessageSender {
    pub async fn send(&self, message: PanelMessage) -> Result<()> {
        self.input_tx
            .send(ConnectionInput::Message(message))
            .await
            .map_err(|_| PowermaxError::ChannelClosed)
    }
}

struct Actor {
    config: PanelConfig,
    outbound: mpsc::Sender<SendMessage>,
    events: EventSender,
    state_tx: watch::Sender<PanelState>,
    status_tx: watch::Sender<ConnectionStatus>,

    store: RawSettingsStore,
    settings: Arc<PanelSettings>,
    state: PanelState,
    status: ConnectionStatus,

    /// Commands of the download pass in flight, used to detect completion.
    requested: Vec<DownloadCommand>,
    remaining_attempts: u32,
    last_attempt: Option<Instant>,
    time_sync_at: Option<DateTime<Local>>,

    last_inbound: Instant,
    last_keepalive: Instant,
    reconnect_attempts: u32,
    reconnect_at: Option<Instant>,
}

impl Actor {
    fn new(
        config: PanelConfig,
        outbound: mpsc::Sender<SendMessage>,
        events: EventSender,
        state_tx: watch::Sender<PanelState>,
        status_tx: watch::Sender<ConnectionStatus>,
    ) -> Self {
        let settings = Arc::new(PanelSettings::new(config.panel_type));
        let state = PanelState::new(config.panel_type.zone_count());
        let remaining_attempts = config.max_download_attempts;
        Self {
            config,
            outbound,
            events,
            state_tx,
            status_tx,
            store: RawSettingsStore::new(),
            settings,
            state,
            status: ConnectionStatus::Disconnected,
            requested: Vec::new(),
            remaining_attempts,
            last_attempt: None,
            time_sync_at: None,
            last_inbound: Instant::now(),
            last_keepalive: Instant::now(),
            reconnect_attempts: 0,
            reconnect_at: None,
        }
    }

    async fn run(mut self, mut input_rx: mpsc::Receiver<ConnectionInput>) {
        self.start_session().await;

        while let Some(input) = input_rx.recv().await {
            match input {
                ConnectionInput::Tick => self.on_tick().await,
                ConnectionInput::Message(message) => self.on_message(message).await,
                ConnectionInput::Request(request, reply) => {
                    let result = self.on_request(request).await;
                    let _ = reply.send(result);
                }
                ConnectionInput::Shutdown => break,
            }
        }

        if self.status != ConnectionStatus::Disconnected {
            let _ = self.outbound.try_send(SendMessage::ExitDownload);
            self.set_status(ConnectionStatus::Disconnected);
            let _ = self.events.send(PanelEvent::Disconnected);
        }
        info!("panel connection stopped");
    }

    async fn start_session(&mut self) {
        self.set_status(ConnectionStatus::Connecting);
        let _ = self.events.send(PanelEvent::Connected);
        self.last_inbound = Instant::now();
        self.remaining_attempts = self.config.max_download_attempts;

        if self.config.force_standard_mode {
            info!("standard mode forced by configuration");
            self.enter_standard_mode().await;
        } else {
            self.begin_download().await;
        }
    }

    /// Send one full download pass. Consumes one attempt.
    async fn begin_download(&mut self) {
        self.remaining_attempts = self.remaining_attempts.saturating_sub(1);
        self.set_status(ConnectionStatus::Downloading { remaining: self.remaining_attempts });
        self.store.clear();
        self.last_attempt = Some(Instant::now());

        debug!(
            "starting settings download ({} attempts left after this one)",
            self.remaining_attempts
        );
        if !self.send(SendMessage::StartDownload).await {
            return;
        }
        if self.config.auto_sync_time {
            let now = Local::now();
            self.time_sync_at = Some(now);
            if !self.send(SendMessage::SetTime(now.naive_local())).await {
                return;
            }
        }
        self.requested = download_sequence(self.config.panel_type);
        for cmd in self.requested.clone() {
            if !self.send(SendMessage::ReadSettings(cmd)).await {
                return;
            }
        }
    }

    fn all_ranges_present(&self) -> bool {
        self.requested.iter().all(|cmd| {
            let (page, index) = cmd.origin();
            self.store
                .contains(page, index as usize, index as usize + cmd.length() - 1)
        })
    }

    /// Decode the downloaded memory and settle the session mode.
    async fn conclude_download(&mut self) {
        self.send(SendMessage::ExitDownload).await;

        let decoded = decode(&self.store, true, self.config.panel_type, self.time_sync_at);
        self.settings = Arc::new(decoded.settings);
        let _ = self.events.send(PanelEvent::SettingsUpdated {
            settings: self.settings.clone(),
            complete: decoded.complete,
        });

        if decoded.complete {
            info!("settings download complete, panel type {}", self.settings.panel_type.label());
            self.reset_state(self.settings.zone_count());
            self.reconnect_attempts = 0;
            self.remaining_attempts = self.config.max_download_attempts;
            self.set_status(ConnectionStatus::Operational(OperatingMode::Enhanced));
            self.last_keepalive = Instant::now();
            self.send(SendMessage::Restore).await;
        } else if self.remaining_attempts == 0 {
            warn!("settings download failed, giving up on enhanced mode");
            self.enter_standard_mode().await;
        } else {
            warn!(
                "settings download incomplete, will retry ({} attempts left)",
                self.remaining_attempts
            );
            self.set_status(ConnectionStatus::Downloading { remaining: self.remaining_attempts });
        }
    }

    /// Degraded but functional: placeholder settings, live status reports
    /// only.
    async fn enter_standard_mode(&mut self) {
        let decoded = decode(&self.store, false, self.config.panel_type, None);
        self.settings = Arc::new(decoded.settings);
        let _ = self.events.send(PanelEvent::SettingsUpdated {
            settings: self.settings.clone(),
            complete: decoded.complete,
        });

        self.reset_state(self.settings.zone_count());
        self.reconnect_attempts = 0;
        self.set_status(ConnectionStatus::Operational(OperatingMode::Standard));
        self.send(SendMessage::ZonesName).await;
        self.send(SendMessage::ZonesType).await;
        self.send(SendMessage::Status).await;
    }

    async fn on_message(&mut self, message: PanelMessage) {
        self.last_inbound = Instant::now();

        match message {
            PanelMessage::SettingsChunk { index, page, data } => {
                self.store
                    .write(page as usize * 0x100 + index as usize, &data);
                if matches!(self.status, ConnectionStatus::Downloading { .. })
                    && self.all_ranges_present()
                {
                    self.conclude_download().await;
                }
            }
            PanelMessage::DownloadComplete => {
                if matches!(self.status, ConnectionStatus::Downloading { .. }) {
                    self.conclude_download().await;
                }
            }
            PanelMessage::DownloadSetupRequired => {
                debug!("panel requests a settings download");
                if !self.config.force_standard_mode {
                    self.remaining_attempts = self.config.max_download_attempts;
                    self.begin_download().await;
                }
            }
            PanelMessage::KeepAlive => {
                // A keepalive while stuck in standard mode is the cue that
                // the panel is now willing to talk enhanced
                if self.status == ConnectionStatus::Operational(OperatingMode::Standard)
                    && !self.config.force_standard_mode
                {
                    debug!("keepalive observed in standard mode, retrying download");
                    self.remaining_attempts = self.config.max_download_attempts;
                    self.begin_download().await;
                }
            }
            PanelMessage::StatusDelta(delta) => self.apply_delta(&delta),
            PanelMessage::ZoneNameUpdate { zone, name_idx } => {
                Arc::make_mut(&mut self.settings).update_zone_name(zone, name_idx);
                let _ = self.events.send(PanelEvent::ZoneSettingsUpdated { zone });
            }
            PanelMessage::ZoneInfoUpdate { zone, info } => {
                Arc::make_mut(&mut self.settings).update_zone_type(zone, info);
                let _ = self.events.send(PanelEvent::ZoneSettingsUpdated { zone });
            }
            PanelMessage::CommFailure => {
                warn!("communication failure reported by transport");
                self.disconnect_and_schedule();
            }
        }
    }

    async fn on_request(&mut self, request: PanelRequest) -> Result<()> {
        match request {
            PanelRequest::Arm(mode) => {
                self.require_operational()?;
                let allowed = if mode.is_disarming() {
                    self.config.allow_disarming
                } else {
                    self.config.allow_arming
                };
                if !allowed {
                    return Err(PowermaxError::CommandRejected(
                        "arming control is disabled by configuration".into(),
                    ));
                }
                let pin = self.effective_pin()?;
                self.send_checked(SendMessage::Arm { mode, pin }).await
            }
            PanelRequest::Bypass { zone, bypassed } => {
                if self.status != ConnectionStatus::Operational(OperatingMode::Enhanced) {
                    return Err(PowermaxError::CommandRejected(
                        "zone bypass requires enhanced mode".into(),
                    ));
                }
                if !self.settings.bypass_enabled {
                    return Err(PowermaxError::CommandRejected(
                        "zone bypass is disabled in the panel settings".into(),
                    ));
                }
                if self.settings.zone(zone).is_none() {
                    return Err(PowermaxError::CommandRejected(format!(
                        "zone {} is not enrolled",
                        zone
                    )));
                }
                let pin = self.effective_pin()?;
                self.send_checked(SendMessage::Bypass { zone, bypassed, pin }).await
            }
            PanelRequest::SwitchX10 { device, on } => {
                self.require_operational()?;
                let enabled = if device == 0 {
                    self.settings.pgm().map(|d| d.enabled)
                } else {
                    self.settings.x10(device as usize).map(|d| d.enabled)
                };
                if enabled != Some(true) {
                    return Err(PowermaxError::CommandRejected(format!(
                        "X10 device {} is not enabled",
                        device
                    )));
                }
                self.send_checked(SendMessage::PgmX10 { device, on }).await
            }
            PanelRequest::EventLog => {
                self.require_operational()?;
                let pin = self.effective_pin()?;
                self.send_checked(SendMessage::EventLog { pin }).await
            }
            PanelRequest::StartDownload => {
                if self.config.force_standard_mode {
                    return Err(PowermaxError::CommandRejected(
                        "standard mode is forced by configuration".into(),
                    ));
                }
                self.require_operational()?;
                self.remaining_attempts = self.config.max_download_attempts;
                self.begin_download().await;
                Ok(())
            }
        }
    }

    async fn on_tick(&mut self) {
        let now = Instant::now();

        // Reconnect window
        if self.status == ConnectionStatus::Disconnected {
            if let Some(at) = self.reconnect_at {
                if now >= at {
                    self.reconnect_at = None;
                    info!("reconnecting to panel");
                    self.start_session().await;
                }
            }
            return;
        }

        // Liveness
        if now.duration_since(self.last_inbound) >= self.config.liveness_timeout {
            warn!(
                "no message from panel for {:?}, dropping the connection",
                self.config.liveness_timeout
            );
            self.disconnect_and_schedule();
            return;
        }

        // Download retry
        if matches!(self.status, ConnectionStatus::Downloading { .. }) {
            let overdue = self
                .last_attempt
                .is_some_and(|at| now.duration_since(at) >= self.config.download_retry_delay);
            if overdue {
                if self.remaining_attempts == 0 {
                    warn!("settings download attempts exhausted, falling back to standard mode");
                    self.send(SendMessage::ExitDownload).await;
                    self.enter_standard_mode().await;
                } else {
                    self.begin_download().await;
                }
                return;
            }
        }

        // Enhanced-mode keepalive
        if self.status == ConnectionStatus::Operational(OperatingMode::Enhanced)
            && now.duration_since(self.last_keepalive) >= self.config.keepalive_interval
        {
            self.last_keepalive = now;
            self.send(SendMessage::Restore).await;
        }

        self.expire_transient_state(now);
    }

    /// Clear tripped motion zones past the motion-off delay and stop
    /// tracking an alarm past the bell duration.
    fn expire_transient_state(&mut self, now: Instant) {
        let mut delta = StateDelta::default();

        for (i, zone) in self.state.zones.iter().enumerate() {
            if !zone.is_tripped() {
                continue;
            }
            let stale = zone
                .last_tripped
                .is_some_and(|at| now.into_std().saturating_duration_since(at) >= self.config.motion_off_delay);
            if !stale {
                continue;
            }
            // Only motion detectors auto-clear; a magnet contact stays
            // tripped while the door is open. Unknown sensors (standard
            // mode) are treated as motion detectors.
            let auto_clears = self
                .settings
                .zone((i + 1) as u8)
                .map(|z| z.sensor_type.is_none() || z.is_motion_sensor())
                .unwrap_or(false);
            if auto_clears {
                delta.zones.push(ZoneDelta {
                    tripped: Some(false),
                    ..ZoneDelta::new((i + 1) as u8)
                });
            }
        }

        let bell = Duration::from_secs(u64::from(self.settings.bell_time) * 60);
        if self.state.alarm_active {
            let rang_long_enough = self
                .state
                .ring_since
                .is_some_and(|at| now.into_std().saturating_duration_since(at) >= bell);
            if rang_long_enough {
                delta.alarm_active = Some(false);
            }
        }

        if delta.alarm_active.is_some() || !delta.zones.is_empty() {
            self.apply_delta(&delta);
        }
    }

    fn apply_delta(&mut self, delta: &StateDelta) {
        self.state = merge(&self.state, delta, std::time::Instant::now());
        let _ = self.state_tx.send(self.state.clone());
        let _ = self.events.send(PanelEvent::StateChanged(self.state.clone()));
    }

    fn reset_state(&mut self, zone_count: usize) {
        self.state = PanelState::new(zone_count);
        let _ = self.state_tx.send(self.state.clone());
        let _ = self.events.send(PanelEvent::StateChanged(self.state.clone()));
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status == status {
            return;
        }
        let previous_mode = self.operating_mode();
        self.status = status;
        let _ = self.status_tx.send(status);
        let _ = self.events.send(PanelEvent::StatusChanged(status));
        if let Some(mode) = self.operating_mode() {
            if previous_mode != Some(mode) {
                info!("panel session operating in {:?} mode", mode);
                let _ = self.events.send(PanelEvent::ModeChanged(mode));
            }
        }
    }

    fn operating_mode(&self) -> Option<OperatingMode> {
        match self.status {
            ConnectionStatus::Operational(mode) => Some(mode),
            _ => None,
        }
    }

    fn require_operational(&self) -> Result<()> {
        match self.status {
            ConnectionStatus::Operational(_) => Ok(()),
            _ => Err(PowermaxError::CommandRejected(
                "panel connection is not operational".into(),
            )),
        }
    }

    /// The PIN to send with privileged commands: the downloaded first user
    /// code in enhanced mode, the configured one otherwise.
    fn effective_pin(&self) -> Result<String> {
        if self.status == ConnectionStatus::Operational(OperatingMode::Enhanced) {
            let pin = self.settings.first_pin_code();
            if !pin.is_empty() {
                return Ok(pin.to_string());
            }
        }
        self.config
            .pin_code
            .clone()
            .ok_or_else(|| PowermaxError::Configuration("no PIN code configured".into()))
    }

    fn disconnect_and_schedule(&mut self) {
        if self.status != ConnectionStatus::Disconnected {
            self.set_status(ConnectionStatus::Disconnected);
            let _ = self.events.send(PanelEvent::Disconnected);
        }
        if self.reconnect_attempts >= self.config.max_connect_retries {
            warn!(
                "{}",
                PowermaxError::ConnectRetriesExhausted { attempts: self.reconnect_attempts }
            );
            self.reconnect_at = None;
            return;
        }
        let delay = self.config.reconnect_delay * (1 << self.reconnect_attempts.min(4));
        self.reconnect_attempts += 1;
        self.reconnect_at = Some(Instant::now() + delay);
        info!("reconnect attempt {} scheduled in {:?}", self.reconnect_attempts, delay);
    }

    /// Hand a command to the transport. Returns false (and tears the
    /// session down) when the transport is gone or wedged.
    async fn send(&mut self, message: SendMessage) -> bool {
        match self
            .outbound
            .send_timeout(message, self.config.response_timeout)
            .await
        {
            Ok(()) => true,
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                warn!("transport did not accept a command within {:?}", self.config.response_timeout);
                self.disconnect_and_schedule();
                false
            }
            Err(mpsc::error::SendTimeoutError::Closed(_)) => {
                warn!("transport channel closed");
                self.disconnect_and_schedule();
                false
            }
        }
    }

    async fn send_checked(&mut self, message: SendMessage) -> Result<()> {
        if self.send(message).await {
            Ok(())
        } else {
            Err(PowermaxError::Disconnected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanelType;
    use crate::protocol::download_sequence;

    fn test_config() -> PanelConfig {
        PanelConfig::builder()
            .panel_type(PanelType::PowerMaxPro)
            .pin_code("1234")
            .allow_arming(true)
            .allow_disarming(true)
            .auto_sync_time(false)
            .build()
    }

    fn spawn_actor(
        config: PanelConfig,
    ) -> (Actor, mpsc::Receiver<SendMessage>, EventReceiver) {
        let (outbound_tx, outbound_rx) = mpsc::channel(256);
        let (events, events_rx) = event_channel(256);
        let (state_tx, _state_rx) = watch::channel(PanelState::new(0));
        let (status_tx, _status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let actor = Actor::new(config, outbound_tx, events, state_tx, status_tx);
        (actor, outbound_rx, events_rx)
    }

    fn drain(rx: &mut mpsc::Receiver<SendMessage>) -> Vec<SendMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    async fn feed_full_download(actor: &mut Actor) {
        for cmd in download_sequence(actor.config.panel_type) {
            let (page, index) = cmd.origin();
            let data = vec![0x20_u8; cmd.length()];
            actor
                .on_message(PanelMessage::SettingsChunk { index, page, data })
                .await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_download_reaches_enhanced_mode() {
        let (mut actor, mut outbound, _events) = spawn_actor(test_config());
        actor.start_session().await;

        let sent = drain(&mut outbound);
        assert_eq!(sent.first(), Some(&SendMessage::StartDownload));
        let reads = sent
            .iter()
            .filter(|m| matches!(m, SendMessage::ReadSettings(_)))
            .count();
        assert_eq!(reads, download_sequence(PanelType::PowerMaxPro).len());

        feed_full_download(&mut actor).await;

        assert_eq!(
            actor.status,
            ConnectionStatus::Operational(OperatingMode::Enhanced)
        );
        let sent = drain(&mut outbound);
        assert!(sent.contains(&SendMessage::ExitDownload));
        assert!(sent.contains(&SendMessage::Restore));
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_retries_end_in_standard_mode() {
        let (mut actor, mut outbound, _events) = spawn_actor(test_config());
        actor.start_session().await;

        // Each tick past the retry delay consumes one of the 3 attempts
        for _ in 0..3 {
            assert!(matches!(actor.status, ConnectionStatus::Downloading { .. }));
            tokio::time::advance(actor.config.download_retry_delay).await;
            actor.on_tick().await;
        }

        assert_eq!(
            actor.status,
            ConnectionStatus::Operational(OperatingMode::Standard)
        );
        // Standard mode placeholder refresh was requested
        let sent = drain(&mut outbound);
        assert!(sent.contains(&SendMessage::ZonesName));
        assert!(sent.contains(&SendMessage::ZonesType));
        assert!(sent.contains(&SendMessage::Status));
        // Placeholder settings cover every zone
        assert_eq!(actor.settings.zone_count(), PanelType::PowerMaxPro.zone_count());
        assert_eq!(actor.settings.zone(1).unwrap().zone_type, 0xFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_in_standard_mode_retries_download() {
        let (mut actor, mut outbound, _events) = spawn_actor(test_config());
        actor.start_session().await;
        for _ in 0..3 {
            tokio::time::advance(actor.config.download_retry_delay).await;
            actor.on_tick().await;
        }
        assert_eq!(
            actor.status,
            ConnectionStatus::Operational(OperatingMode::Standard)
        );
        drain(&mut outbound);

        actor.on_message(PanelMessage::KeepAlive).await;
        assert!(matches!(actor.status, ConnectionStatus::Downloading { .. }));
        assert_eq!(drain(&mut outbound).first(), Some(&SendMessage::StartDownload));
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_rejected_until_operational() {
        let (mut actor, _outbound, _events) = spawn_actor(test_config());
        actor.start_session().await;

        let err = actor.on_request(PanelRequest::Arm(ArmMode::Armed)).await.unwrap_err();
        assert!(matches!(err, PowermaxError::CommandRejected(_)));
        let err = actor
            .on_request(PanelRequest::Bypass { zone: 1, bypassed: true })
            .await
            .unwrap_err();
        assert!(matches!(err, PowermaxError::CommandRejected(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_allowed_in_standard_mode_with_configured_pin() {
        let (mut actor, mut outbound, _events) = spawn_actor(test_config());
        actor.start_session().await;
        for _ in 0..3 {
            tokio::time::advance(actor.config.download_retry_delay).await;
            actor.on_tick().await;
        }
        drain(&mut outbound);

        actor.on_request(PanelRequest::Arm(ArmMode::Armed)).await.unwrap();
        assert_eq!(
            drain(&mut outbound).first(),
            Some(&SendMessage::Arm { mode: ArmMode::Armed, pin: "1234".into() })
        );

        // Bypass still needs enhanced mode
        let err = actor
            .on_request(PanelRequest::Bypass { zone: 1, bypassed: true })
            .await
            .unwrap_err();
        assert!(matches!(err, PowermaxError::CommandRejected(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_arming_disabled_by_configuration() {
        let config = PanelConfig::builder()
            .panel_type(PanelType::PowerMaxPro)
            .pin_code("1234")
            .auto_sync_time(false)
            .build();
        let (mut actor, mut outbound, _events) = spawn_actor(config);
        actor.start_session().await;
        for _ in 0..3 {
            tokio::time::advance(actor.config.download_retry_delay).await;
            actor.on_tick().await;
        }
        drain(&mut outbound);

        let err = actor.on_request(PanelRequest::Arm(ArmMode::Armed)).await.unwrap_err();
        assert!(matches!(err, PowermaxError::CommandRejected(_)));
        assert!(drain(&mut outbound).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_clears_stale_motion_trips() {
        let (mut actor, mut outbound, _events) = spawn_actor(test_config());
        actor.start_session().await;
        for _ in 0..3 {
            tokio::time::advance(actor.config.download_retry_delay).await;
            actor.on_tick().await;
        }
        drain(&mut outbound);

        let delta = StateDelta {
            zones: vec![ZoneDelta { tripped: Some(true), ..ZoneDelta::new(2) }],
            ..StateDelta::default()
        };
        actor.on_message(PanelMessage::StatusDelta(delta)).await;
        assert!(actor.state.zone(2).unwrap().is_tripped());

        tokio::time::advance(actor.config.motion_off_delay).await;
        actor.last_inbound = Instant::now(); // keep liveness satisfied
        actor.on_tick().await;
        assert!(!actor.state.zone(2).unwrap().is_tripped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_silences_alarm_after_bell_time() {
        let config = PanelConfig::builder()
            .panel_type(PanelType::PowerMaxPro)
            .pin_code("1234")
            .liveness_timeout(std::time::Duration::from_secs(600))
            .build();
        let (mut actor, mut outbound, _events) = spawn_actor(config);
        actor.start_session().await;
        for _ in 0..3 {
            tokio::time::advance(actor.config.download_retry_delay).await;
            actor.on_tick().await;
        }
        drain(&mut outbound);

        let delta = StateDelta { alarm_active: Some(true), ..StateDelta::default() };
        actor.on_message(PanelMessage::StatusDelta(delta)).await;
        assert!(actor.state.alarm_active);

        // Placeholder settings keep the default 4 minute bell time
        tokio::time::advance(Duration::from_secs(4 * 60)).await;
        actor.last_inbound = Instant::now();
        actor.on_tick().await;
        assert!(!actor.state.alarm_active);
        assert!(actor.state.ring_since.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_timeout_schedules_reconnect() {
        let (mut actor, _outbound, _events) = spawn_actor(test_config());
        actor.start_session().await;

        tokio::time::advance(actor.config.liveness_timeout).await;
        actor.on_tick().await;
        assert_eq!(actor.status, ConnectionStatus::Disconnected);
        assert!(actor.reconnect_at.is_some());

        tokio::time::advance(actor.config.reconnect_delay).await;
        actor.on_tick().await;
        assert!(matches!(actor.status, ConnectionStatus::Downloading { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_setup_request_restarts_download() {
        let (mut actor, mut outbound, _events) = spawn_actor(test_config());
        actor.start_session().await;
        feed_full_download(&mut actor).await;
        assert_eq!(
            actor.status,
            ConnectionStatus::Operational(OperatingMode::Enhanced)
        );
        drain(&mut outbound);

        actor.on_message(PanelMessage::DownloadSetupRequired).await;
        assert!(matches!(actor.status, ConnectionStatus::Downloading { .. }));
        assert_eq!(actor.remaining_attempts, actor.config.max_download_attempts - 1);
    }
}
