// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

//! Symbolic command catalog and the message types exchanged with the
//! transport layer.
//!
//! The wire framing (preamble, CRC, byte stuffing) is the transport's
//! business; this module only describes *which* memory ranges the download
//! sequence reads and the already-framed notifications the panel sends back.

use crate::config::{ArmMode, PanelType};
use crate::state::StateDelta;

/// A settings-download read command. Each command carries an intrinsic
/// origin into the panel's paged memory map; read offsets used by the
/// decoder are always relative to that origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadCommand {
    /// Panel serial number, and the panel type code at offset 7
    Serial,
    /// Panel clock (6 bytes: sec, min, hour, day, month, year)
    Time,
    /// Communication/alarm definitions (bell time, panic, quick arm, bypass)
    CommDef,
    /// Four 8-byte phone number slots
    PhoneNumbers,
    /// User PIN codes, PowerMax family
    PinCodes,
    /// User PIN codes, PowerMaster family
    MasterPinCodes,
    /// PGM and X10 device table
    PgmX10,
    /// Zone-name table assignments for X10 devices
    X10Names,
    /// Partition enable flag and per-zone partition bitmasks
    Partitions,
    /// EEPROM version (bytes 0-15) and software version (bytes 16-31)
    PanelFw,
    /// 4-byte zone definition records, PowerMax family
    Zones,
    /// Zone-name table assignments per zone, PowerMax family
    ZoneNames,
    /// Zone-name table assignments per zone, PowerMaster family
    MasterZoneNames,
    /// 10-byte zone definition records, PowerMaster family
    MasterZones,
    /// The zone-name text table (16 bytes per entry)
    ZoneStrings,
    /// 1-way keypad enrollment records, PowerMax family
    Keypads1w,
    /// 2-way keypad enrollment records, PowerMax family
    Keypads2w,
    /// Siren enrollment records, PowerMax family
    Sirens,
    /// 10-byte 2-way keypad records, PowerMaster family
    MasterKeypads,
    /// 10-byte siren records, PowerMaster family
    MasterSirens,
}

impl DownloadCommand {
    /// The (page, index) origin of this command in the panel memory map.
    pub fn origin(&self) -> (u8, u8) {
        let (page, index, _) = self.triple();
        (page, index)
    }

    /// Number of bytes the panel returns for this command.
    pub fn length(&self) -> usize {
        self.triple().2
    }

    fn triple(&self) -> (u8, u8, usize) {
        match self {
            Self::Time => (0x00, 0xF8, 0x06),
            Self::CommDef => (0x01, 0x01, 0x1E),
            Self::PhoneNumbers => (0x01, 0x36, 0x20),
            Self::PinCodes => (0x01, 0xFA, 0x10),
            Self::PgmX10 => (0x02, 0x14, 0xD5),
            Self::Partitions => (0x03, 0x00, 0xF0),
            Self::PanelFw => (0x04, 0x00, 0x20),
            Self::Serial => (0x04, 0x30, 0x08),
            Self::Zones => (0x09, 0x00, 0x78),
            Self::MasterZoneNames => (0x09, 0x60, 0x40),
            Self::Keypads2w => (0x0A, 0x00, 0x08),
            Self::Keypads1w => (0x0A, 0x20, 0x40),
            Self::Sirens => (0x0A, 0x60, 0x08),
            Self::MasterPinCodes => (0x0A, 0x98, 0x60),
            Self::X10Names => (0x0B, 0x30, 0x10),
            Self::ZoneNames => (0x0B, 0x40, 0x1E),
            Self::ZoneStrings => (0x19, 0x00, 0x200),
            Self::MasterSirens => (0xB6, 0xE2, 0x50),
            Self::MasterKeypads => (0xB7, 0x32, 0x140),
            Self::MasterZones => (0xB8, 0x72, 0x480),
        }
    }
}

/// The read commands a full settings download issues for one panel family.
pub fn download_sequence(panel_type: PanelType) -> Vec<DownloadCommand> {
    use DownloadCommand::*;
    let mut seq = vec![
        Serial, Time, CommDef, PhoneNumbers, PgmX10, X10Names, Partitions, PanelFw, Zones,
        ZoneStrings,
    ];
    if panel_type.is_powermaster() {
        seq.extend([MasterPinCodes, MasterZoneNames, MasterZones, MasterKeypads, MasterSirens]);
    } else {
        seq.extend([PinCodes, ZoneNames, Keypads1w, Keypads2w, Sirens]);
    }
    seq
}

/// Outbound commands handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessage {
    /// Enter the settings download session
    StartDownload,
    /// Read one settings range
    ReadSettings(DownloadCommand),
    /// Leave the settings download session
    ExitDownload,
    /// Write the panel clock (sent during download setup when time sync is
    /// enabled)
    SetTime(chrono::NaiveDateTime),
    /// Liveness/restore command (enhanced-mode keepalive)
    Restore,
    /// Request the zone-name report (standard-mode refresh)
    ZonesName,
    /// Request the zone-type report (standard-mode refresh)
    ZonesType,
    /// Request a status report (standard-mode refresh)
    Status,
    /// Arm or disarm
    Arm { mode: ArmMode, pin: String },
    /// Switch a PGM (device 0) or X10 device
    PgmX10 { device: u8, on: bool },
    /// Bypass or unbypass one zone
    Bypass { zone: u8, bypassed: bool, pin: String },
    /// Request the event log
    EventLog { pin: String },
}

/// Inbound, already-framed signals consumed from the transport layer.
#[derive(Debug, Clone)]
pub enum PanelMessage {
    /// One settings memory chunk; `index`/`page` locate it in the memory map.
    SettingsChunk { index: u8, page: u8, data: Vec<u8> },
    /// The panel signalled the end of the download exchange.
    DownloadComplete,
    /// The panel requests a (re-)download, e.g. after enrollment or a reset.
    DownloadSetupRequired,
    /// An enhanced-mode keepalive was observed.
    KeepAlive,
    /// A live status delta (zone trips, arming changes, ...)
    StatusDelta(StateDelta),
    /// Live traffic renamed a zone (index into the zone-name table).
    ZoneNameUpdate { zone: u8, name_idx: u8 },
    /// Live traffic changed a zone's type nibble.
    ZoneInfoUpdate { zone: u8, info: u8 },
    /// The transport detected a communication failure.
    CommFailure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_origins() {
        assert_eq!(DownloadCommand::Serial.origin(), (0x04, 0x30));
        assert_eq!(DownloadCommand::ZoneStrings.origin(), (0x19, 0x00));
        assert_eq!(DownloadCommand::ZoneStrings.length(), 0x200);
        assert_eq!(DownloadCommand::MasterZones.origin(), (0xB8, 0x72));
    }

    #[test]
    fn test_download_sequence_by_family() {
        let powermax = download_sequence(PanelType::PowerMaxPro);
        assert!(powermax.contains(&DownloadCommand::PinCodes));
        assert!(powermax.contains(&DownloadCommand::Keypads1w));
        assert!(!powermax.contains(&DownloadCommand::MasterZones));

        let powermaster = download_sequence(PanelType::PowerMaster30);
        assert!(powermaster.contains(&DownloadCommand::MasterPinCodes));
        assert!(powermaster.contains(&DownloadCommand::MasterZones));
        assert!(!powermaster.contains(&DownloadCommand::ZoneNames));
        assert!(!powermaster.contains(&DownloadCommand::Keypads1w));
    }
}
