// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

/// The 26 built-in entries of the panel's zone-name table. Entries beyond
/// these are the panel's custom names, downloaded as free text.
pub const STANDARD_ZONE_NAMES: [&str; 26] = [
    "Attic",
    "Back door",
    "Basement",
    "Bathroom",
    "Bedroom",
    "Child room",
    "Closet",
    "Den",
    "Dining room",
    "Downstairs",
    "Emergency",
    "Fire",
    "Front door",
    "Garage",
    "Garage door",
    "Guest room",
    "Hall",
    "Kitchen",
    "Laundry room",
    "Living room",
    "Master bathroom",
    "Master bedroom",
    "Office",
    "Upstairs",
    "Utility room",
    "Yard",
];

/// Display labels for the 4-bit zone type codes.
pub const ZONE_TYPES: [&str; 16] = [
    "Non-Alarm",
    "Emergency",
    "Flood",
    "Gas",
    "Delay 1",
    "Delay 2",
    "Interior-Follow",
    "Perimeter",
    "Perimeter-Follow",
    "24 Hours Silent",
    "24 Hours Audible",
    "Fire",
    "Interior",
    "Home Delay",
    "Temperature",
    "Outdoor",
];

/// Display label for a 4-bit zone type code. `None` for the 0xFF sentinel
/// used by standard-mode records.
pub fn zone_type_label(code: u8) -> Option<&'static str> {
    ZONE_TYPES.get(code as usize).copied()
}

/// Display labels for the 2-bit chime codes.
pub const CHIME_MODES: [&str; 3] = ["Off", "Melody", "Zone Name"];

pub fn chime_label(code: u8) -> Option<&'static str> {
    CHIME_MODES.get(code as usize).copied()
}

/// Sensor type label for the PowerMax family, keyed by the low nibble of the
/// zone record's sensor byte. Unknown codes are tolerated by callers.
pub fn powermax_sensor_type(nibble: u8) -> Option<&'static str> {
    match nibble {
        0x3 | 0x4 | 0xC => Some("Motion"),
        0x5 | 0x6 | 0x7 => Some("Magnet"),
        0xA => Some("Smoke"),
        0xB => Some("Gas"),
        0xF => Some("Wired"),
        _ => None,
    }
}

/// Sensor type label for the PowerMaster family, keyed by the full sensor
/// byte of the 10-byte zone record.
pub fn powermaster_sensor_type(code: u8) -> Option<&'static str> {
    match code {
        0x01 | 0x12 => Some("Motion"),
        0x03 => Some("Camera"),
        0x04 | 0x05 | 0x0C | 0x29 | 0x2A | 0x2C => Some("Magnet"),
        0x06 | 0x07 | 0x16 => Some("Smoke"),
        0x0A => Some("Shock"),
        0x0B => Some("Flood"),
        0x1A => Some("Temperature"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_type_label() {
        assert_eq!(zone_type_label(0), Some("Non-Alarm"));
        assert_eq!(zone_type_label(11), Some("Fire"));
        assert_eq!(zone_type_label(0xFF), None);
    }

    #[test]
    fn test_sensor_type_lookup() {
        assert_eq!(powermax_sensor_type(0x3), Some("Motion"));
        assert_eq!(powermax_sensor_type(0xF), Some("Wired"));
        assert_eq!(powermax_sensor_type(0x0), None);
        assert_eq!(powermaster_sensor_type(0x01), Some("Motion"));
        assert_eq!(powermaster_sensor_type(0xFE), None);
    }

    #[test]
    fn test_chime_label() {
        assert_eq!(chime_label(0), Some("Off"));
        assert_eq!(chime_label(2), Some("Zone Name"));
        assert_eq!(chime_label(3), None);
    }
}
