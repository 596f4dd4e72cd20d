// MIT License - Copyright (c) 2026 powermax-lan-bridge authors
// Panel monitor

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use powermax_lan_bridge::{
    PanelConfig, PanelConnection, PanelEvent, PanelMessage, PanelType, PowermaxError, SendMessage,
    StateDelta, ZoneDelta,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "powermax-monitor")]
#[command(about = "Monitor a Visonic PowerMax/PowerMaster panel over a LAN adapter")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    panel: PanelToml,
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    /// Host of the Powerlink LAN adapter
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    /// Panel type name (e.g. "PowerMax Pro"), used until the download
    /// resolves the real one
    #[serde(default)]
    panel_type: Option<String>,
    #[serde(default)]
    pin_code: Option<String>,
    #[serde(default)]
    force_standard_mode: bool,
    #[serde(default)]
    allow_arming: bool,
    #[serde(default)]
    allow_disarming: bool,
    #[serde(default)]
    auto_sync_time: bool,
    #[serde(default = "default_motion_off_secs")]
    motion_off_delay_secs: u64,
    #[serde(default = "default_max_download_attempts")]
    max_download_attempts: u32,
}

fn default_port() -> u16 {
    5001
}
fn default_motion_off_secs() -> u64 {
    3 * 60
}
fn default_max_download_attempts() -> u32 {
    3
}

fn build_panel_config(toml: &PanelToml) -> Result<PanelConfig> {
    let mut builder = PanelConfig::builder()
        .force_standard_mode(toml.force_standard_mode)
        .allow_arming(toml.allow_arming)
        .allow_disarming(toml.allow_disarming)
        .auto_sync_time(toml.auto_sync_time)
        .motion_off_delay(std::time::Duration::from_secs(toml.motion_off_delay_secs))
        .max_download_attempts(toml.max_download_attempts);
    if let Some(name) = &toml.panel_type {
        let panel_type = PanelType::from_label(name)
            .ok_or_else(|| PowermaxError::Configuration(format!("unknown panel type: {name}")))?;
        builder = builder.panel_type(panel_type);
    }
    if let Some(pin) = &toml.pin_code {
        builder = builder.pin_code(pin.clone());
    }
    let config = builder.build();
    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Adapter line protocol
// ---------------------------------------------------------------------------
//
// The LAN adapter handles the Powerlink wire framing (preamble, CRC, byte
// stuffing) itself and exposes a newline-delimited text protocol instead.

fn encode_command(msg: &SendMessage) -> String {
    match msg {
        SendMessage::StartDownload => "DOWNLOAD".to_string(),
        SendMessage::ReadSettings(cmd) => {
            let (page, index) = cmd.origin();
            format!("READ {:02X} {:02X} {:X}", page, index, cmd.length())
        }
        SendMessage::ExitDownload => "EXIT".to_string(),
        SendMessage::SetTime(time) => format!("TIME {}", time.format("%Y-%m-%dT%H:%M:%S")),
        SendMessage::Restore => "RESTORE".to_string(),
        SendMessage::ZonesName => "ZONESNAME".to_string(),
        SendMessage::ZonesType => "ZONESTYPE".to_string(),
        SendMessage::Status => "STATUS".to_string(),
        SendMessage::Arm { mode, pin } => format!("ARM {:02X} {}", mode.code(), pin),
        SendMessage::PgmX10 { device, on } => {
            format!("X10 {} {}", device, if *on { "ON" } else { "OFF" })
        }
        SendMessage::Bypass { zone, bypassed, pin } => {
            format!("BYPASS {} {} {}", zone, if *bypassed { "ON" } else { "OFF" }, pin)
        }
        SendMessage::EventLog { pin } => format!("EVENTLOG {}", pin),
    }
}

fn parse_report(line: &str) -> Option<PanelMessage> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "CHUNK" => {
            let page = u8::from_str_radix(parts.next()?, 16).ok()?;
            let index = u8::from_str_radix(parts.next()?, 16).ok()?;
            let data = parse_hex(parts.next()?)?;
            Some(PanelMessage::SettingsChunk { index, page, data })
        }
        "DOWNLOADED" => Some(PanelMessage::DownloadComplete),
        "SETUP" => Some(PanelMessage::DownloadSetupRequired),
        "KEEPALIVE" => Some(PanelMessage::KeepAlive),
        "ZONENAME" => {
            let zone = parts.next()?.parse().ok()?;
            let name_idx = parts.next()?.parse().ok()?;
            Some(PanelMessage::ZoneNameUpdate { zone, name_idx })
        }
        "ZONEINFO" => {
            let zone = parts.next()?.parse().ok()?;
            let info = u8::from_str_radix(parts.next()?, 16).ok()?;
            Some(PanelMessage::ZoneInfoUpdate { zone, info })
        }
        "TRIP" => {
            let zone = parts.next()?.parse().ok()?;
            Some(PanelMessage::StatusDelta(zone_delta(zone, |z| z.tripped = Some(true))))
        }
        "RESTORE" => {
            let zone = parts.next()?.parse().ok()?;
            Some(PanelMessage::StatusDelta(zone_delta(zone, |z| z.tripped = Some(false))))
        }
        "BYPASS" => {
            let zone = parts.next()?.parse().ok()?;
            let on = parts.next()? == "ON";
            Some(PanelMessage::StatusDelta(zone_delta(zone, |z| z.bypassed = Some(on))))
        }
        "ARMED" => {
            let armed = parts.next()? == "1";
            Some(PanelMessage::StatusDelta(StateDelta {
                armed: Some(armed),
                ..StateDelta::default()
            }))
        }
        "READY" => {
            let ready = parts.next()? == "1";
            Some(PanelMessage::StatusDelta(StateDelta {
                ready: Some(ready),
                ..StateDelta::default()
            }))
        }
        "ALARM" => {
            let active = parts.next()? == "1";
            Some(PanelMessage::StatusDelta(StateDelta {
                alarm_active: Some(active),
                ..StateDelta::default()
            }))
        }
        "FAIL" => Some(PanelMessage::CommFailure),
        other => {
            debug!("unrecognized report: {}", other);
            None
        }
    }
}

fn zone_delta(zone: u8, set: impl FnOnce(&mut ZoneDelta)) -> StateDelta {
    let mut delta = ZoneDelta::new(zone);
    set(&mut delta);
    StateDelta { zones: vec![delta], ..StateDelta::default() }
}

fn parse_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or
    // RUST_LOG=powermax_lan_bridge=trace). Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let config_text = std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;
    let panel_config = build_panel_config(&config.panel)?;

    info!("Connecting to adapter at {}:{}", config.panel.host, config.panel.port);
    let stream = TcpStream::connect((config.panel.host.as_str(), config.panel.port))
        .await
        .context("Failed to connect to the LAN adapter")?;
    let (read_half, mut write_half) = stream.into_split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<SendMessage>(64);
    let connection = PanelConnection::spawn(panel_config, outbound_tx)?;

    // Writer: panel commands out to the adapter
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let line = encode_command(&msg) + "\n";
            if let Err(e) = write_half.write_all(line.as_bytes()).await {
                warn!("write to adapter failed: {}", e);
                break;
            }
        }
    });

    // Reader: adapter reports into the connection
    let messages = connection.message_sender();
    let reader_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(msg) = parse_report(line.trim()) {
                        if messages.send(msg).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(None) => {
                    warn!("adapter closed the connection");
                    let _ = messages.send(PanelMessage::CommFailure).await;
                    break;
                }
                Err(e) => {
                    warn!("read from adapter failed: {}", e);
                    let _ = messages.send(PanelMessage::CommFailure).await;
                    break;
                }
            }
        }
    });

    // Event printer
    let mut events = connection.subscribe();
    let event_handle = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                PanelEvent::SettingsUpdated { settings, complete } => {
                    info!("settings updated (complete: {})", complete);
                    for line in settings.to_string().lines() {
                        info!("{}", line);
                    }
                }
                PanelEvent::StateChanged(state) => {
                    let tripped: Vec<String> = state
                        .zones
                        .iter()
                        .enumerate()
                        .filter(|(_, z)| z.is_tripped())
                        .map(|(i, _)| (i + 1).to_string())
                        .collect();
                    info!(
                        "state: armed={:?} ready={:?} alarm={} tripped=[{}]",
                        state.armed,
                        state.ready,
                        state.alarm_active,
                        tripped.join(",")
                    );
                }
                other => info!("event: {:?}", other),
            }
        }
    });

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
        _ = sigterm.recv() => info!("terminated, shutting down"),
    }

    connection.shutdown().await;
    connection.join().await;
    writer_handle.abort();
    reader_handle.abort();
    event_handle.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use powermax_lan_bridge::{ArmMode, DownloadCommand};

    #[test]
    fn test_encode_commands() {
        assert_eq!(encode_command(&SendMessage::StartDownload), "DOWNLOAD");
        assert_eq!(
            encode_command(&SendMessage::ReadSettings(DownloadCommand::Serial)),
            "READ 04 30 8"
        );
        assert_eq!(
            encode_command(&SendMessage::Arm { mode: ArmMode::Armed, pin: "1234".into() }),
            "ARM 05 1234"
        );
        assert_eq!(
            encode_command(&SendMessage::Bypass { zone: 3, bypassed: true, pin: "1234".into() }),
            "BYPASS 3 ON 1234"
        );
    }

    #[test]
    fn test_parse_reports() {
        match parse_report("CHUNK 04 30 AABB").unwrap() {
            PanelMessage::SettingsChunk { index, page, data } => {
                assert_eq!(page, 0x04);
                assert_eq!(index, 0x30);
                assert_eq!(data, vec![0xAA, 0xBB]);
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(matches!(parse_report("DOWNLOADED"), Some(PanelMessage::DownloadComplete)));
        assert!(matches!(parse_report("KEEPALIVE"), Some(PanelMessage::KeepAlive)));
        assert!(parse_report("GARBAGE").is_none());
        assert!(parse_report("CHUNK 04 30 XYZ").is_none());
    }

    #[test]
    fn test_parse_status_reports() {
        match parse_report("TRIP 5").unwrap() {
            PanelMessage::StatusDelta(delta) => {
                assert_eq!(delta.zones[0].zone, 5);
                assert_eq!(delta.zones[0].tripped, Some(true));
            }
            other => panic!("unexpected message: {:?}", other),
        }
        match parse_report("ARMED 1").unwrap() {
            PanelMessage::StatusDelta(delta) => assert_eq!(delta.armed, Some(true)),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_build_panel_config_rejects_unknown_type() {
        let toml = PanelToml {
            host: "localhost".into(),
            port: 5001,
            panel_type: Some("LightSys".into()),
            pin_code: None,
            force_standard_mode: false,
            allow_arming: false,
            allow_disarming: false,
            auto_sync_time: false,
            motion_off_delay_secs: 180,
            max_download_attempts: 3,
        };
        assert!(build_panel_config(&toml).is_err());
    }
}
