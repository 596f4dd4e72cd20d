// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

//! Live alarm state and the pure delta-merge that keeps it current.
//!
//! Incoming traffic never mutates state in place: the transport reports a
//! [`StateDelta`] and [`merge`] produces the next state value. The connection
//! actor owns the single current [`PanelState`] per panel instance.

use std::time::Instant;

use bitflags::bitflags;

use crate::config::ArmMode;

bitflags! {
    /// Live status flags of one zone.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ZoneStatusFlags: u8 {
        /// Sensor tripped (motion detected / contact open)
        const TRIPPED     = 0b0000_0001;
        /// Zone currently in alarm
        const ALARM       = 0b0000_0010;
        /// Zone armed
        const ARMED       = 0b0000_0100;
        /// Zone bypassed
        const BYPASSED    = 0b0000_1000;
        /// Sensor reports a low battery
        const LOW_BATTERY = 0b0001_0000;
    }
}

/// Live state of one zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneState {
    pub flags: ZoneStatusFlags,
    /// When the zone last tripped; used by the background job to clear the
    /// tripped flag after the configured off-delay.
    pub last_tripped: Option<Instant>,
}

impl ZoneState {
    pub fn is_tripped(&self) -> bool {
        self.flags.contains(ZoneStatusFlags::TRIPPED)
    }

    pub fn is_armed(&self) -> bool {
        self.flags.contains(ZoneStatusFlags::ARMED)
    }

    pub fn is_bypassed(&self) -> bool {
        self.flags.contains(ZoneStatusFlags::BYPASSED)
    }
}

/// Live state of the whole panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub armed: Option<bool>,
    pub arm_mode: Option<ArmMode>,
    pub ready: Option<bool>,
    /// The bell/siren is currently ringing.
    pub alarm_active: bool,
    /// When the bell started ringing; cleared together with `alarm_active`.
    pub ring_since: Option<Instant>,
    pub zones: Vec<ZoneState>,
}

impl PanelState {
    /// A fresh state for a panel with `zone_count` zones.
    pub fn new(zone_count: usize) -> Self {
        Self {
            zones: vec![ZoneState::default(); zone_count],
            ..Self::default()
        }
    }

    /// Zone state by 1-based zone number.
    pub fn zone(&self, zone: u8) -> Option<&ZoneState> {
        zone.checked_sub(1).and_then(|i| self.zones.get(i as usize))
    }
}

/// Partial update for one zone, 1-based zone number.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneDelta {
    pub zone: u8,
    pub tripped: Option<bool>,
    pub alarm: Option<bool>,
    pub armed: Option<bool>,
    pub bypassed: Option<bool>,
    pub low_battery: Option<bool>,
}

impl ZoneDelta {
    pub fn new(zone: u8) -> Self {
        Self { zone, ..Self::default() }
    }
}

/// Partial update of the live panel state. Fields left `None` keep their
/// current value when merged.
#[derive(Debug, Clone, Default)]
pub struct StateDelta {
    pub armed: Option<bool>,
    pub arm_mode: Option<ArmMode>,
    pub ready: Option<bool>,
    pub alarm_active: Option<bool>,
    pub zones: Vec<ZoneDelta>,
}

/// Merge a delta into the current state, producing the next state.
///
/// `now` timestamps zones that trip in this delta. One invariant is enforced
/// here: a zone that is bypassed in the current state never merges as armed,
/// whatever the delta claims.
pub fn merge(current: &PanelState, delta: &StateDelta, now: Instant) -> PanelState {
    let mut next = current.clone();

    if let Some(armed) = delta.armed {
        next.armed = Some(armed);
    }
    if let Some(mode) = delta.arm_mode {
        next.arm_mode = Some(mode);
    }
    if let Some(ready) = delta.ready {
        next.ready = Some(ready);
    }
    if let Some(active) = delta.alarm_active {
        next.alarm_active = active;
        next.ring_since = if active { Some(now) } else { None };
    }

    for zd in &delta.zones {
        let Some(idx) = zd.zone.checked_sub(1).map(usize::from) else {
            continue;
        };
        let Some(zone) = next.zones.get_mut(idx) else {
            continue;
        };
        let was_bypassed = current
            .zone(zd.zone)
            .is_some_and(|z| z.flags.contains(ZoneStatusFlags::BYPASSED));

        if let Some(tripped) = zd.tripped {
            zone.flags.set(ZoneStatusFlags::TRIPPED, tripped);
            if tripped {
                zone.last_tripped = Some(now);
            }
        }
        if let Some(alarm) = zd.alarm {
            zone.flags.set(ZoneStatusFlags::ALARM, alarm);
        }
        if let Some(armed) = zd.armed {
            // Bypassed zones never read as armed
            zone.flags.set(ZoneStatusFlags::ARMED, armed && !was_bypassed);
        }
        if let Some(bypassed) = zd.bypassed {
            zone.flags.set(ZoneStatusFlags::BYPASSED, bypassed);
        }
        if let Some(low) = zd.low_battery {
            zone.flags.set(ZoneStatusFlags::LOW_BATTERY, low);
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_with(zone: ZoneDelta) -> StateDelta {
        StateDelta { zones: vec![zone], ..StateDelta::default() }
    }

    #[test]
    fn test_merge_keeps_unmentioned_fields() {
        let mut current = PanelState::new(4);
        current.armed = Some(true);
        current.zones[1].flags = ZoneStatusFlags::TRIPPED;

        let next = merge(&current, &StateDelta::default(), Instant::now());
        assert_eq!(next, current);
    }

    #[test]
    fn test_merge_trip_sets_timestamp() {
        let current = PanelState::new(4);
        let mut zd = ZoneDelta::new(2);
        zd.tripped = Some(true);
        let now = Instant::now();

        let next = merge(&current, &delta_with(zd), now);
        assert!(next.zones[1].is_tripped());
        assert_eq!(next.zones[1].last_tripped, Some(now));
    }

    #[test]
    fn test_bypassed_zone_never_merges_armed() {
        let mut current = PanelState::new(4);
        current.zones[2].flags = ZoneStatusFlags::BYPASSED;

        let mut zd = ZoneDelta::new(3);
        zd.armed = Some(true);
        let next = merge(&current, &delta_with(zd), Instant::now());

        assert!(!next.zones[2].is_armed());
        assert!(next.zones[2].is_bypassed());
    }

    #[test]
    fn test_non_bypassed_zone_merges_armed() {
        let current = PanelState::new(4);
        let mut zd = ZoneDelta::new(3);
        zd.armed = Some(true);
        let next = merge(&current, &delta_with(zd), Instant::now());
        assert!(next.zones[2].is_armed());
    }

    #[test]
    fn test_out_of_range_zone_ignored() {
        let current = PanelState::new(2);
        let mut zd = ZoneDelta::new(9);
        zd.tripped = Some(true);
        let next = merge(&current, &delta_with(zd), Instant::now());
        assert_eq!(next, current);
    }

    #[test]
    fn test_alarm_active_tracks_ring_since() {
        let current = PanelState::new(1);
        let now = Instant::now();
        let delta = StateDelta { alarm_active: Some(true), ..StateDelta::default() };
        let ringing = merge(&current, &delta, now);
        assert!(ringing.alarm_active);
        assert_eq!(ringing.ring_since, Some(now));

        let delta = StateDelta { alarm_active: Some(false), ..StateDelta::default() };
        let silent = merge(&ringing, &delta, Instant::now());
        assert!(!silent.alarm_active);
        assert_eq!(silent.ring_since, None);
    }
}
