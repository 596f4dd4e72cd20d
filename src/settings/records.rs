// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

use std::fmt;

use tracing::debug;

use crate::config::PanelType;
use crate::constants::{chime_label, zone_type_label, STANDARD_ZONE_NAMES};

/// Number of PGM and X10 device slots managed by the panel (slot 0 is the PGM).
pub const NB_PGM_X10_DEVICES: usize = 16;

/// Settings of one enrolled zone. Absent for unenrolled slots.
///
/// Immutable after a decode pass, except for the two narrow patch operations
/// on [`PanelSettings`] driven by live traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSettings {
    pub name: Option<String>,
    /// 4-bit zone type code; 0xFF when unknown (standard mode)
    pub zone_type: u8,
    /// 2-bit chime code; 0xFF when unknown (standard mode)
    pub chime: u8,
    pub sensor_type: Option<&'static str>,
    /// Partition membership, index 0 = partition 1. Sized to the active
    /// partition count of the decode pass.
    pub partitions: Vec<bool>,
}

impl ZoneSettings {
    pub fn type_label(&self) -> &'static str {
        zone_type_label(self.zone_type).unwrap_or("Unknown")
    }

    pub fn chime_label(&self) -> &'static str {
        chime_label(self.chime).unwrap_or("Unknown")
    }

    /// Membership test by 1-based partition number.
    pub fn is_in_partition(&self, partition: usize) -> bool {
        partition
            .checked_sub(1)
            .and_then(|i| self.partitions.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// Whether the sensor is a motion detector (used for trip auto-clearing).
    pub fn is_motion_sensor(&self) -> bool {
        self.sensor_type == Some("Motion")
    }
}

/// Settings of one PGM or X10 device slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X10Settings {
    pub name: Option<String>,
    pub enabled: bool,
}

/// All decoded settings of the alarm panel.
///
/// Reallocated wholesale by each decode pass; array lengths derive from the
/// resolved panel type and stay fixed until the next pass.
#[derive(Debug, Clone)]
pub struct PanelSettings {
    pub panel_type: PanelType,
    pub phone_numbers: [Option<String>; 4],
    /// Bell/siren duration in minutes
    pub bell_time: u8,
    pub silent_panic: bool,
    pub quick_arm: bool,
    pub bypass_enabled: bool,
    pub partitions_enabled: bool,
    /// One 4-hex-digit code per user slot; empty until downloaded
    pub pin_codes: Vec<String>,
    pub panel_eprom: Option<String>,
    pub panel_software: Option<String>,
    pub panel_serial: Option<String>,
    /// The zone-name table: built-in names overlaid with downloaded text
    zone_name_table: Vec<Option<String>>,
    zones: Vec<Option<ZoneSettings>>,
    x10: Vec<Option<X10Settings>>,
    keypads_1w_enrolled: Vec<bool>,
    keypads_2w_enrolled: Vec<bool>,
    sirens_enrolled: Vec<bool>,
}

impl PanelSettings {
    /// Empty settings for a panel type, before any decode pass.
    pub fn new(panel_type: PanelType) -> Self {
        let caps = panel_type.capabilities();
        Self {
            panel_type,
            phone_numbers: Default::default(),
            bell_time: 4,
            silent_panic: false,
            quick_arm: false,
            bypass_enabled: false,
            partitions_enabled: false,
            pin_codes: Vec::new(),
            panel_eprom: None,
            panel_software: None,
            panel_serial: None,
            zone_name_table: default_zone_name_table(caps.custom_zone_names),
            zones: vec![None; panel_type.zone_count()],
            x10: vec![None; NB_PGM_X10_DEVICES],
            keypads_1w_enrolled: vec![false; caps.keypads_1w],
            keypads_2w_enrolled: vec![false; caps.keypads_2w],
            sirens_enrolled: vec![false; caps.sirens],
        }
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Settings of a zone by 1-based zone number; `None` when unenrolled or
    /// out of range.
    pub fn zone(&self, zone: u8) -> Option<&ZoneSettings> {
        zone.checked_sub(1)
            .and_then(|i| self.zones.get(i as usize))
            .and_then(|z| z.as_ref())
    }

    /// Display name of a zone by 1-based zone number.
    pub fn zone_name(&self, zone: u8) -> Option<&str> {
        self.zone(zone).and_then(|z| z.name.as_deref())
    }

    /// Entry of the zone-name table (index is masked to the table's 5 bits).
    pub fn zone_name_entry(&self, name_idx: u8) -> Option<&str> {
        let idx = (name_idx & 0x1F) as usize;
        match self.zone_name_table.get(idx) {
            Some(entry) => entry.as_deref(),
            None => {
                debug!("zone name index out of bounds: {}", idx);
                None
            }
        }
    }

    /// Settings of the PGM device (slot 0).
    pub fn pgm(&self) -> Option<&X10Settings> {
        self.x10[0].as_ref()
    }

    /// Settings of an X10 device by slot index 1..=15.
    pub fn x10(&self, idx: usize) -> Option<&X10Settings> {
        if idx == 0 {
            return None;
        }
        self.x10.get(idx).and_then(|x| x.as_ref())
    }

    /// Enrollment of a 1-way keypad by 1-based index.
    pub fn keypad_1w_enrolled(&self, idx: usize) -> bool {
        idx.checked_sub(1)
            .and_then(|i| self.keypads_1w_enrolled.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// Enrollment of a 2-way keypad by 1-based index.
    pub fn keypad_2w_enrolled(&self, idx: usize) -> bool {
        idx.checked_sub(1)
            .and_then(|i| self.keypads_2w_enrolled.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// Enrollment of a siren by 1-based index.
    pub fn siren_enrolled(&self, idx: usize) -> bool {
        idx.checked_sub(1)
            .and_then(|i| self.sirens_enrolled.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// PIN code of the first user, or an empty string when unknown
    /// (standard mode).
    pub fn first_pin_code(&self) -> &str {
        self.pin_codes.first().map(String::as_str).unwrap_or("")
    }

    /// Patch a zone's name from a zone-name-table index reported by live
    /// traffic. No-op for unenrolled zones.
    pub fn update_zone_name(&mut self, zone: u8, name_idx: u8) {
        let name = self.zone_name_entry(name_idx).map(str::to_string);
        if let Some(Some(settings)) = zone
            .checked_sub(1)
            .and_then(|i| self.zones.get_mut(i as usize))
        {
            settings.name = name;
        }
    }

    /// Patch a zone's type nibble from live traffic. No-op for unenrolled
    /// zones.
    pub fn update_zone_type(&mut self, zone: u8, info: u8) {
        if let Some(Some(settings)) = zone
            .checked_sub(1)
            .and_then(|i| self.zones.get_mut(i as usize))
        {
            settings.zone_type = info & 0x0F;
        }
    }

    // Decoder-side mutators, kept crate-private so the records stay
    // immutable for downstream consumers.

    pub(crate) fn set_zone_name_entry(&mut self, idx: usize, name: String) {
        if let Some(entry) = self.zone_name_table.get_mut(idx) {
            *entry = Some(name);
        } else {
            debug!("zone name index out of bounds: {}", idx);
        }
    }

    pub(crate) fn set_zone(&mut self, idx: usize, settings: Option<ZoneSettings>) {
        if let Some(slot) = self.zones.get_mut(idx) {
            *slot = settings;
        }
    }

    pub(crate) fn set_x10(&mut self, idx: usize, settings: X10Settings) {
        if let Some(slot) = self.x10.get_mut(idx) {
            *slot = Some(settings);
        }
    }

    pub(crate) fn set_keypads_1w(&mut self, enrolled: Vec<bool>) {
        self.keypads_1w_enrolled = enrolled;
    }

    pub(crate) fn set_keypads_2w(&mut self, enrolled: Vec<bool>) {
        self.keypads_2w_enrolled = enrolled;
    }

    pub(crate) fn set_sirens(&mut self, enrolled: Vec<bool>) {
        self.sirens_enrolled = enrolled;
    }
}

impl fmt::Display for PanelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Panel is of type {}", self.panel_type.label())?;
        for (i, number) in self.phone_numbers.iter().enumerate() {
            if let Some(number) = number {
                writeln!(f, "Phone number {}: {}", i + 1, number)?;
            }
        }
        writeln!(f, "Bell time: {} minutes", self.bell_time)?;
        writeln!(f, "Silent panic: {}", on_off(self.silent_panic))?;
        writeln!(f, "Quick arm: {}", on_off(self.quick_arm))?;
        writeln!(f, "Zone bypass: {}", on_off(self.bypass_enabled))?;
        writeln!(f, "Partitions: {}", on_off(self.partitions_enabled))?;
        writeln!(f, "EPROM: {}", self.panel_eprom.as_deref().unwrap_or("Undefined"))?;
        writeln!(f, "SW: {}", self.panel_software.as_deref().unwrap_or("Undefined"))?;
        writeln!(f, "Serial: {}", self.panel_serial.as_deref().unwrap_or("Undefined"))?;
        for (i, zone) in self.zones.iter().enumerate() {
            if let Some(zone) = zone {
                let partitions: Vec<String> = zone
                    .partitions
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| **m)
                    .map(|(j, _)| (j + 1).to_string())
                    .collect();
                writeln!(
                    f,
                    "Zone {} {}: {} (chime = {}; sensor type = {}; partitions = {})",
                    i + 1,
                    zone.name.as_deref().unwrap_or(""),
                    zone.type_label(),
                    zone.chime_label(),
                    zone.sensor_type.unwrap_or("Unknown"),
                    partitions.join(" ")
                )?;
            }
        }
        for (i, x10) in self.x10.iter().enumerate() {
            if let Some(x10) = x10 {
                if x10.enabled {
                    let label = if i == 0 { "PGM".to_string() } else { format!("X10 {}", i) };
                    writeln!(f, "{}: {} enabled", label, x10.name.as_deref().unwrap_or(""))?;
                }
            }
        }
        for i in 1..=self.sirens_enrolled.len() {
            if self.siren_enrolled(i) {
                writeln!(f, "Siren {} enrolled", i)?;
            }
        }
        for i in 1..=self.keypads_1w_enrolled.len() {
            if self.keypad_1w_enrolled(i) {
                writeln!(f, "Keypad 1w {} enrolled", i)?;
            }
        }
        for i in 1..=self.keypads_2w_enrolled.len() {
            if self.keypad_2w_enrolled(i) {
                writeln!(f, "Keypad 2w {} enrolled", i)?;
            }
        }
        Ok(())
    }
}

fn on_off(v: bool) -> &'static str {
    if v {
        "enabled"
    } else {
        "disabled"
    }
}

/// Built-in zone-name table entries, extended with empty slots for the
/// panel's custom names.
fn default_zone_name_table(custom: usize) -> Vec<Option<String>> {
    let mut table: Vec<Option<String>> = STANDARD_ZONE_NAMES
        .iter()
        .map(|n| Some((*n).to_string()))
        .collect();
    table.extend((0..custom).map(|i| Some(format!("Custom {}", i + 1))));
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrolled_zone() -> ZoneSettings {
        ZoneSettings {
            name: Some("Kitchen".into()),
            zone_type: 7,
            chime: 1,
            sensor_type: Some("Motion"),
            partitions: vec![true, false, true],
        }
    }

    #[test]
    fn test_zone_accessors() {
        let mut settings = PanelSettings::new(PanelType::PowerMaxProPart);
        settings.set_zone(2, Some(enrolled_zone()));

        assert!(settings.zone(1).is_none());
        let zone = settings.zone(3).unwrap();
        assert_eq!(zone.type_label(), "Perimeter");
        assert_eq!(zone.chime_label(), "Melody");
        assert!(zone.is_in_partition(1));
        assert!(!zone.is_in_partition(2));
        assert!(zone.is_in_partition(3));
        assert!(!zone.is_in_partition(4));
        assert_eq!(settings.zone_name(3), Some("Kitchen"));
        assert!(settings.zone(0).is_none());
        assert!(settings.zone(200).is_none());
    }

    #[test]
    fn test_zone_name_table_defaults() {
        let settings = PanelSettings::new(PanelType::PowerMaxPro);
        assert_eq!(settings.zone_name_entry(0), Some("Attic"));
        assert_eq!(settings.zone_name_entry(17), Some("Kitchen"));
        assert_eq!(settings.zone_name_entry(26), Some("Custom 1"));
        // index is masked to 5 bits
        assert_eq!(settings.zone_name_entry(0x20), Some("Attic"));
    }

    #[test]
    fn test_update_zone_name_noop_when_unenrolled() {
        let mut settings = PanelSettings::new(PanelType::PowerMaxPro);
        settings.update_zone_name(1, 17);
        assert!(settings.zone(1).is_none());

        settings.set_zone(0, Some(enrolled_zone()));
        settings.update_zone_name(1, 16);
        assert_eq!(settings.zone_name(1), Some("Hall"));
    }

    #[test]
    fn test_update_zone_type_masks_nibble() {
        let mut settings = PanelSettings::new(PanelType::PowerMaxPro);
        settings.set_zone(0, Some(enrolled_zone()));
        settings.update_zone_type(1, 0x3B);
        assert_eq!(settings.zone(1).unwrap().zone_type, 0x0B);
        // unenrolled slot stays untouched
        settings.update_zone_type(2, 0x05);
        assert!(settings.zone(2).is_none());
    }

    #[test]
    fn test_first_pin_code_default() {
        let mut settings = PanelSettings::new(PanelType::PowerMaxPro);
        assert_eq!(settings.first_pin_code(), "");
        settings.pin_codes = vec!["1234".into(), "5678".into()];
        assert_eq!(settings.first_pin_code(), "1234");
    }

    #[test]
    fn test_enrollment_accessors_bounds() {
        let settings = PanelSettings::new(PanelType::PowerMaster10);
        assert!(!settings.siren_enrolled(0));
        assert!(!settings.siren_enrolled(5)); // PowerMaster 10 has 4 sirens
        assert!(!settings.keypad_1w_enrolled(1)); // none on PowerMaster
    }
}
