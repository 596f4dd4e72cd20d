// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

use std::time::Duration;

/// Panel type with its device count limits.
///
/// One variant per hardware generation; each variant only differs in the
/// number of zones, partitions, users and peripheral slots it manages.
/// The PowerMaster family (code >= 7) uses different settings record
/// layouts than the older PowerMax family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelType {
    PowerMax,
    PowerMaxPlus,
    PowerMaxPro,
    PowerMaxComplete,
    PowerMaxProPart,
    PowerMaxCompletePart,
    PowerMaxExpress,
    PowerMaster10,
    PowerMaster30,
}

/// Device count limits for one panel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelCapabilities {
    pub partitions: usize,
    pub wireless_zones: usize,
    pub wired_zones: usize,
    pub custom_zone_names: usize,
    pub user_codes: usize,
    pub sirens: usize,
    pub keypads_1w: usize,
    pub keypads_2w: usize,
}

impl PanelType {
    /// Resolve a panel type from the 1-byte code stored in the panel EEPROM.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::PowerMax),
            1 => Some(Self::PowerMaxPlus),
            2 => Some(Self::PowerMaxPro),
            3 => Some(Self::PowerMaxComplete),
            4 => Some(Self::PowerMaxProPart),
            5 => Some(Self::PowerMaxCompletePart),
            6 => Some(Self::PowerMaxExpress),
            7 => Some(Self::PowerMaster10),
            8 => Some(Self::PowerMaster30),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::PowerMax => 0,
            Self::PowerMaxPlus => 1,
            Self::PowerMaxPro => 2,
            Self::PowerMaxComplete => 3,
            Self::PowerMaxProPart => 4,
            Self::PowerMaxCompletePart => 5,
            Self::PowerMaxExpress => 6,
            Self::PowerMaster10 => 7,
            Self::PowerMaster30 => 8,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PowerMax => "PowerMax",
            Self::PowerMaxPlus => "PowerMax+",
            Self::PowerMaxPro => "PowerMax Pro",
            Self::PowerMaxComplete => "PowerMax Complete",
            Self::PowerMaxProPart => "PowerMax Pro Part",
            Self::PowerMaxCompletePart => "PowerMax Complete Part",
            Self::PowerMaxExpress => "PowerMax Express",
            Self::PowerMaster10 => "PowerMaster 10",
            Self::PowerMaster30 => "PowerMaster 30",
        }
    }

    /// Parse a panel type from its display label (used for configuration).
    pub fn from_label(label: &str) -> Option<Self> {
        [
            Self::PowerMax,
            Self::PowerMaxPlus,
            Self::PowerMaxPro,
            Self::PowerMaxComplete,
            Self::PowerMaxProPart,
            Self::PowerMaxCompletePart,
            Self::PowerMaxExpress,
            Self::PowerMaster10,
            Self::PowerMaster30,
        ]
        .into_iter()
        .find(|t| t.label().eq_ignore_ascii_case(label))
    }

    /// Whether this panel belongs to the newer PowerMaster hardware family.
    pub fn is_powermaster(&self) -> bool {
        self.code() >= 7
    }

    pub fn capabilities(&self) -> PanelCapabilities {
        match self {
            Self::PowerMax => caps(1, 28, 2, 0, 8, 2, 8, 2),
            Self::PowerMaxPlus
            | Self::PowerMaxPro
            | Self::PowerMaxComplete => caps(1, 28, 2, 5, 8, 2, 8, 2),
            Self::PowerMaxProPart | Self::PowerMaxCompletePart => caps(3, 28, 2, 5, 8, 2, 8, 2),
            Self::PowerMaxExpress => caps(1, 28, 1, 5, 8, 2, 8, 2),
            Self::PowerMaster10 => caps(3, 29, 1, 5, 8, 4, 0, 8),
            Self::PowerMaster30 => caps(3, 62, 2, 5, 48, 8, 0, 32),
        }
    }

    /// Total zone count (wireless + wired).
    pub fn zone_count(&self) -> usize {
        let c = self.capabilities();
        c.wireless_zones + c.wired_zones
    }
}

#[allow(clippy::too_many_arguments)]
const fn caps(
    partitions: usize,
    wireless_zones: usize,
    wired_zones: usize,
    custom_zone_names: usize,
    user_codes: usize,
    sirens: usize,
    keypads_1w: usize,
    keypads_2w: usize,
) -> PanelCapabilities {
    PanelCapabilities {
        partitions,
        wireless_zones,
        wired_zones,
        custom_zone_names,
        user_codes,
        sirens,
        keypads_1w,
        keypads_2w,
    }
}

/// Arm mode for arming/disarming requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    Disarmed,
    Stay,
    Armed,
    StayInstant,
    ArmedInstant,
    Night,
    NightInstant,
}

impl ArmMode {
    /// The wire code sent with the arm request.
    pub fn code(&self) -> u8 {
        match self {
            Self::Disarmed => 0x00,
            Self::Stay | Self::Night => 0x04,
            Self::Armed => 0x05,
            Self::StayInstant | Self::NightInstant => 0x14,
            Self::ArmedInstant => 0x15,
        }
    }

    /// Whether this mode disarms rather than arms the system.
    pub fn is_disarming(&self) -> bool {
        matches!(self, Self::Disarmed)
    }
}

/// Configuration for one panel connection.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Panel type assumed until the downloaded settings identify the real one
    pub panel_type: PanelType,
    /// Skip the enhanced-mode download and run in standard mode from the start
    pub force_standard_mode: bool,
    /// Enable arming the system from this bridge
    pub allow_arming: bool,
    /// Enable disarming the system from this bridge
    pub allow_disarming: bool,
    /// PIN code used for commands while in standard mode
    pub pin_code: Option<String>,
    /// Request a panel clock sync during download
    pub auto_sync_time: bool,
    /// Delay before a motion zone's tripped flag is cleared
    pub motion_off_delay: Duration,
    /// Period of the background job (reconnect / retry / flag clearing)
    pub tick_interval: Duration,
    /// How often a liveness/restore command is sent in enhanced mode
    pub keepalive_interval: Duration,
    /// Consider the connection dead when nothing was received for this long
    pub liveness_timeout: Duration,
    /// Per-command reply timeout applied by the transport layer
    pub response_timeout: Duration,
    /// Number of settings download attempts before standard-mode fallback
    pub max_download_attempts: u32,
    /// Minimum delay between two download attempts
    pub download_retry_delay: Duration,
    /// Base delay for reconnect backoff
    pub reconnect_delay: Duration,
    /// Maximum reconnect attempts per outage (0 = no retries)
    pub max_connect_retries: u32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            panel_type: PanelType::PowerMaxPro,
            force_standard_mode: false,
            allow_arming: false,
            allow_disarming: false,
            pin_code: None,
            auto_sync_time: false,
            motion_off_delay: Duration::from_secs(3 * 60),
            tick_interval: Duration::from_secs(20),
            keepalive_interval: Duration::from_secs(60),
            liveness_timeout: Duration::from_secs(4 * 60),
            response_timeout: Duration::from_secs(8),
            max_download_attempts: 3,
            download_retry_delay: Duration::from_secs(45),
            reconnect_delay: Duration::from_secs(10),
            max_connect_retries: 3,
        }
    }
}

impl PanelConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> PanelConfigBuilder {
        PanelConfigBuilder::default()
    }

    /// Check invariants that would otherwise surface as confusing behavior
    /// deep inside the connection loop.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.max_download_attempts == 0 {
            return Err(crate::error::PowermaxError::Configuration(
                "max_download_attempts must be at least 1".into(),
            ));
        }
        if let Some(pin) = &self.pin_code {
            if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(crate::error::PowermaxError::Configuration(
                    "pin_code must be 4 hex digits".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for [`PanelConfig`].
#[derive(Debug, Clone, Default)]
pub struct PanelConfigBuilder {
    config: PanelConfig,
}

impl PanelConfigBuilder {
    pub fn panel_type(mut self, panel_type: PanelType) -> Self {
        self.config.panel_type = panel_type;
        self
    }

    pub fn force_standard_mode(mut self, force: bool) -> Self {
        self.config.force_standard_mode = force;
        self
    }

    pub fn allow_arming(mut self, allow: bool) -> Self {
        self.config.allow_arming = allow;
        self
    }

    pub fn allow_disarming(mut self, allow: bool) -> Self {
        self.config.allow_disarming = allow;
        self
    }

    pub fn pin_code(mut self, pin: impl Into<String>) -> Self {
        self.config.pin_code = Some(pin.into());
        self
    }

    pub fn auto_sync_time(mut self, sync: bool) -> Self {
        self.config.auto_sync_time = sync;
        self
    }

    pub fn motion_off_delay(mut self, delay: Duration) -> Self {
        self.config.motion_off_delay = delay;
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.keepalive_interval = interval;
        self
    }

    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.config.liveness_timeout = timeout;
        self
    }

    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    pub fn max_download_attempts(mut self, attempts: u32) -> Self {
        self.config.max_download_attempts = attempts;
        self
    }

    pub fn download_retry_delay(mut self, delay: Duration) -> Self {
        self.config.download_retry_delay = delay;
        self
    }

    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay = delay;
        self
    }

    pub fn max_connect_retries(mut self, retries: u32) -> Self {
        self.config.max_connect_retries = retries;
        self
    }

    pub fn build(self) -> PanelConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_type_code_roundtrip() {
        for code in 0..=8 {
            let t = PanelType::from_code(code).unwrap();
            assert_eq!(t.code(), code);
        }
        assert!(PanelType::from_code(9).is_none());
    }

    #[test]
    fn test_powermaster_family() {
        assert!(!PanelType::PowerMaxPro.is_powermaster());
        assert!(!PanelType::PowerMaxExpress.is_powermaster());
        assert!(PanelType::PowerMaster10.is_powermaster());
        assert!(PanelType::PowerMaster30.is_powermaster());
    }

    #[test]
    fn test_zone_counts() {
        assert_eq!(PanelType::PowerMaxPro.zone_count(), 30);
        assert_eq!(PanelType::PowerMaxExpress.zone_count(), 29);
        assert_eq!(PanelType::PowerMaster30.zone_count(), 64);
    }

    #[test]
    fn test_from_label() {
        assert_eq!(PanelType::from_label("PowerMax Pro"), Some(PanelType::PowerMaxPro));
        assert_eq!(PanelType::from_label("powermaster 30"), Some(PanelType::PowerMaster30));
        assert_eq!(PanelType::from_label("LightSys"), None);
    }

    #[test]
    fn test_config_builder() {
        let config = PanelConfig::builder()
            .panel_type(PanelType::PowerMaster10)
            .allow_arming(true)
            .pin_code("1234")
            .max_download_attempts(5)
            .build();
        assert_eq!(config.panel_type, PanelType::PowerMaster10);
        assert!(config.allow_arming);
        assert!(!config.allow_disarming);
        assert_eq!(config.pin_code.as_deref(), Some("1234"));
        assert_eq!(config.max_download_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = PanelConfig::builder().pin_code("12").build();
        assert!(config.validate().is_err());
        let config = PanelConfig::builder().max_download_attempts(0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_arm_mode_codes() {
        assert_eq!(ArmMode::Disarmed.code(), 0x00);
        assert_eq!(ArmMode::Armed.code(), 0x05);
        assert_eq!(ArmMode::ArmedInstant.code(), 0x15);
        assert!(ArmMode::Disarmed.is_disarming());
        assert!(!ArmMode::Stay.is_disarming());
    }
}
