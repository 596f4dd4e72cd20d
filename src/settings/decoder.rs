// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

//! Turns the raw downloaded settings memory into [`PanelSettings`].
//!
//! The pass is tolerant: each section that cannot be read (missing bytes,
//! unprovisioned sentinel) is logged and skipped, clears the `complete`
//! flag and leaves the section at its defaults. The caller decides whether
//! an incomplete pass is worth a retry.

use std::fmt::Write as _;

use chrono::{DateTime, Local, TimeZone};
use tracing::{debug, warn};

use crate::config::PanelType;
use crate::constants::{powermax_sensor_type, powermaster_sensor_type};
use crate::error::{PowermaxError, Result};
use crate::protocol::DownloadCommand;
use crate::settings::raw::RawSettingsStore;
use crate::settings::records::{PanelSettings, X10Settings, ZoneSettings, NB_PGM_X10_DEVICES};

/// Result of a decode pass. `complete` is false when at least one settings
/// section could not be fully read.
#[derive(Debug, Clone)]
pub struct DecodedSettings {
    pub settings: PanelSettings,
    pub complete: bool,
}

/// Decode in enhanced mode (full settings memory downloaded) or standard
/// mode (`enhanced` false, placeholder settings only).
///
/// `time_set` is the timestamp a clock sync was requested with, used to
/// verify the panel accepted it. Decoding never fails outright; gaps are
/// reported through [`DecodedSettings::complete`].
pub fn decode(
    store: &RawSettingsStore,
    enhanced: bool,
    default_panel_type: PanelType,
    time_set: Option<DateTime<Local>>,
) -> DecodedSettings {
    debug!("processing settings, enhanced mode {}", enhanced);

    let mut complete = true;

    // Identify the panel type before sizing anything
    let mut panel_type = default_panel_type;
    if enhanced {
        match read(store, DownloadCommand::Serial, 7, 7) {
            Ok(data) => match PanelType::from_code(data[0]) {
                Some(t) => panel_type = t,
                None => {
                    let err = PowermaxError::UnrecognizedCode { what: "panel type", code: data[0] };
                    debug!("{err}, keeping configured {default_panel_type:?}");
                }
            },
            Err(_) => {
                debug!("cannot get panel type");
                complete = false;
            }
        }
    }

    let caps = panel_type.capabilities();
    let zone_cnt = panel_type.zone_count();
    let mut partition_cnt = caps.partitions;

    let mut settings = PanelSettings::new(panel_type);

    if !enhanced {
        // Standard mode: no settings memory to read. Every zone and X10
        // device is assumed present with unknown configuration, in a
        // single partition.
        for i in 0..zone_cnt {
            settings.set_zone(
                i,
                Some(ZoneSettings {
                    name: None,
                    zone_type: 0xFF,
                    chime: 0xFF,
                    sensor_type: None,
                    partitions: vec![true],
                }),
            );
        }
        for i in 0..NB_PGM_X10_DEVICES {
            settings.set_x10(i, X10Settings { name: None, enabled: true });
        }
        return DecodedSettings { settings, complete };
    }

    // Panel clock, and outcome of the sync request if one was made
    match read(store, DownloadCommand::Time, 0, 5) {
        Ok(data) => check_panel_time(&data, time_set),
        Err(_) => {
            debug!("cannot get time and date settings");
            complete = false;
        }
    }

    // Zone-name table
    let mut all_names = true;
    for i in 0..(26 + caps.custom_zone_names) {
        match read_text(store, DownloadCommand::ZoneStrings, i * 16, (i + 1) * 16 - 1) {
            Ok(Some(name)) => settings.set_zone_name_entry(i, name),
            Ok(None) | Err(_) => all_names = false,
        }
    }
    if !all_names {
        debug!("cannot get all zone names");
        complete = false;
    }

    // Phone numbers: BCD-ish, a 0xFF first byte means the slot is unused
    let mut all_phones = true;
    for i in 0..settings.phone_numbers.len() {
        match read(store, DownloadCommand::PhoneNumbers, 8 * i, 8 * i + 7) {
            Ok(data) => {
                let mut number: Option<String> = None;
                for (j, b) in data.iter().enumerate() {
                    if *b != 0xFF {
                        if j == 0 {
                            number = Some(String::new());
                        }
                        if let Some(n) = number.as_mut() {
                            let _ = write!(n, "{:02X}", b);
                        }
                    }
                }
                settings.phone_numbers[i] = number;
            }
            Err(_) => all_phones = false,
        }
    }
    if !all_phones {
        debug!("cannot get all communication settings");
        complete = false;
    }

    // Alarm definitions
    match read(store, DownloadCommand::CommDef, 0, 0x1B) {
        Ok(data) => {
            settings.bell_time = data[3];
            settings.silent_panic = (data[0x19] & 0x10) == 0x10;
            settings.quick_arm = (data[0x1A] & 0x08) == 0x08;
            settings.bypass_enabled = (data[0x1B] & 0xC0) != 0;
        }
        Err(_) => {
            debug!("cannot get alarm settings");
            complete = false;
        }
    }

    // User PIN codes
    let pin_cmd = if panel_type.is_powermaster() {
        DownloadCommand::MasterPinCodes
    } else {
        DownloadCommand::PinCodes
    };
    match read(store, pin_cmd, 0, 2 * caps.user_codes - 1) {
        Ok(data) => {
            settings.pin_codes = (0..caps.user_codes)
                .map(|i| format!("{:02X}{:02X}", data[i * 2], data[i * 2 + 1]))
                .collect();
        }
        Err(_) => {
            debug!("cannot get PIN codes");
            complete = false;
        }
    }

    // Firmware identification
    match read_text(store, DownloadCommand::PanelFw, 0, 15) {
        Ok(Some(eprom)) => settings.panel_eprom = Some(eprom),
        Ok(None) | Err(_) => {
            debug!("cannot get EEPROM version");
            complete = false;
        }
    }
    match read_text(store, DownloadCommand::PanelFw, 16, 31) {
        Ok(Some(software)) => settings.panel_software = Some(software),
        Ok(None) | Err(_) => {
            debug!("cannot get software version");
            complete = false;
        }
    }

    // Serial ID, 0xFF bytes rendered as "."
    match read(store, DownloadCommand::Serial, 0, 5) {
        Ok(data) => {
            let mut serial = String::new();
            for b in &data {
                if *b != 0xFF {
                    let _ = write!(serial, "{:02X}", b);
                } else {
                    serial.push('.');
                }
            }
            settings.panel_serial = Some(serial);
        }
        Err(_) => {
            debug!("cannot get serial ID");
            complete = false;
        }
    }

    // Partition usage, only meaningful on panels with more than one
    let mut partitions_data: Option<Vec<u8>> = None;
    if partition_cnt > 1 {
        match read(store, DownloadCommand::Partitions, 0, 0x10 + zone_cnt) {
            Ok(data) => {
                settings.partitions_enabled = data[0] == 1;
                partitions_data = Some(data);
            }
            Err(_) => {
                debug!("cannot get partitions information");
                complete = false;
            }
        }
        if !settings.partitions_enabled {
            partition_cnt = 1;
        }
    }

    // Zone definitions
    let zones_data = read(store, DownloadCommand::Zones, 0, zone_cnt * 4 - 1);
    let zone_names;
    let mut master_zones: Option<Vec<u8>> = None;
    if panel_type.is_powermaster() {
        zone_names = read(store, DownloadCommand::MasterZoneNames, 0, zone_cnt - 1);
        master_zones = read(store, DownloadCommand::MasterZones, 0, zone_cnt * 10 - 2).ok();
    } else {
        zone_names = read(store, DownloadCommand::ZoneNames, 0, zone_cnt - 1);
    }
    match (zones_data, zone_names) {
        (Ok(data), Ok(zone_nr)) => {
            for i in 0..zone_cnt {
                let name = settings
                    .zone_name_entry(zone_nr[i] & 0x1F)
                    .map(str::to_string);

                let enrolled;
                let zone_info;
                let sensor_type;
                if panel_type.is_powermaster() {
                    zone_info = data[i];
                    match &master_zones {
                        Some(mr) => {
                            enrolled = mr[i * 10 + 4..i * 10 + 9].iter().any(|b| *b != 0);
                            sensor_type = powermaster_sensor_type(mr[i * 10 + 5]);
                        }
                        None => {
                            enrolled = false;
                            sensor_type = None;
                        }
                    }
                } else {
                    enrolled = data[i * 4..i * 4 + 3].iter().any(|b| *b != 0);
                    zone_info = data[i * 4 + 3];
                    sensor_type = powermax_sensor_type(data[i * 4 + 2] & 0x0F);
                }

                if enrolled {
                    let partitions = if partition_cnt > 1 {
                        (0..partition_cnt)
                            .map(|j| {
                                partitions_data
                                    .as_ref()
                                    .map(|p| (p[0x11 + i] & (1 << j)) != 0)
                                    .unwrap_or(true)
                            })
                            .collect()
                    } else {
                        vec![true]
                    };
                    settings.set_zone(
                        i,
                        Some(ZoneSettings {
                            name,
                            zone_type: zone_info & 0x0F,
                            chime: (zone_info >> 4) & 0x03,
                            sensor_type,
                            partitions,
                        }),
                    );
                }
            }
        }
        _ => {
            debug!("cannot get zone settings");
            complete = false;
        }
    }

    // PGM and X10 devices
    let pgm_data = read(store, DownloadCommand::PgmX10, 0, 148);
    let x10_names = read(store, DownloadCommand::X10Names, 0, NB_PGM_X10_DEVICES - 2);
    match (pgm_data, x10_names) {
        (Ok(data), Ok(names)) => {
            for i in 0..NB_PGM_X10_DEVICES {
                let enabled = (0..=8).any(|j| data[5 + i + j * 0x10] != 0);
                let name = if i > 0 {
                    settings
                        .zone_name_entry(names[i - 1] & 0x1F)
                        .map(str::to_string)
                } else {
                    None
                };
                settings.set_x10(i, X10Settings { name, enabled });
            }
        }
        _ => {
            debug!("cannot get PGM / X10 settings");
            complete = false;
        }
    }

    // Keypad and siren enrollment
    if panel_type.is_powermaster() {
        match read(store, DownloadCommand::MasterKeypads, 0, caps.keypads_2w * 10 - 1) {
            Ok(data) => {
                settings.set_keypads_2w(enrolled_10b(&data, caps.keypads_2w));
            }
            Err(_) => {
                debug!("cannot get 2 way keypad settings");
                complete = false;
            }
        }
        match read(store, DownloadCommand::MasterSirens, 0, caps.sirens * 10 - 1) {
            Ok(data) => {
                settings.set_sirens(enrolled_10b(&data, caps.sirens));
            }
            Err(_) => {
                debug!("cannot get siren settings");
                complete = false;
            }
        }
    } else {
        match read(store, DownloadCommand::Keypads1w, 0, caps.keypads_1w * 4 - 1) {
            Ok(data) => {
                settings.set_keypads_1w(
                    (0..caps.keypads_1w)
                        .map(|i| data[i * 4..i * 4 + 2].iter().any(|b| *b != 0))
                        .collect(),
                );
            }
            Err(_) => {
                debug!("cannot get 1 way keypad settings");
                complete = false;
            }
        }
        match read(store, DownloadCommand::Keypads2w, 0, caps.keypads_2w * 4 - 1) {
            Ok(data) => {
                settings.set_keypads_2w(enrolled_4b(&data, caps.keypads_2w));
            }
            Err(_) => {
                debug!("cannot get 2 way keypad settings");
                complete = false;
            }
        }
        match read(store, DownloadCommand::Sirens, 0, caps.sirens * 4 - 1) {
            Ok(data) => {
                settings.set_sirens(enrolled_4b(&data, caps.sirens));
            }
            Err(_) => {
                debug!("cannot get siren settings");
                complete = false;
            }
        }
    }

    DecodedSettings { settings, complete }
}

/// Read an inclusive offset range relative to a command's origin.
fn read(store: &RawSettingsStore, cmd: DownloadCommand, start: usize, end: usize) -> Result<Vec<u8>> {
    let (page, index) = cmd.origin();
    store.read(page, index as usize + start, index as usize + end)
}

fn read_text(
    store: &RawSettingsStore,
    cmd: DownloadCommand,
    start: usize,
    end: usize,
) -> Result<Option<String>> {
    let (page, index) = cmd.origin();
    store.read_text(page, index as usize + start, index as usize + end)
}

/// Enrollment flags from 10-byte records: enrolled when bytes 4..9 of the
/// record are not all zero.
fn enrolled_10b(data: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| data[i * 10 + 4..i * 10 + 9].iter().any(|b| *b != 0))
        .collect()
}

/// Enrollment flags from 4-byte records: enrolled when bytes 0..3 of the
/// record are not all zero.
fn enrolled_4b(data: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| data[i * 4..i * 4 + 3].iter().any(|b| *b != 0))
        .collect()
}

fn check_panel_time(data: &[u8], time_set: Option<DateTime<Local>>) {
    let panel_time = Local
        .with_ymd_and_hms(
            2000 + data[5] as i32,
            data[4] as u32,
            data[3] as u32,
            data[2] as u32,
            data[1] as u32,
            data[0] as u32,
        )
        .single();
    match panel_time {
        Some(panel_time) => {
            debug!("panel time {}", panel_time.format("%d/%m/%Y %H:%M:%S"));
            if let Some(time_set) = time_set {
                let delta = (panel_time - time_set).num_seconds();
                if delta <= 5 {
                    debug!("time sync OK (delta {} s)", delta);
                } else {
                    warn!("time sync failed (delta {} s)", delta);
                }
            }
        }
        None => debug!("panel reported an invalid time"),
    }
}
