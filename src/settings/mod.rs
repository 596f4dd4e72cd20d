// MIT License - Copyright (c) 2026 powermax-lan-bridge authors

//! Panel configuration: the raw downloaded memory image and its decoded
//! form.

mod decoder;
pub mod raw;
mod records;

pub use decoder::{decode, DecodedSettings};
pub use raw::RawSettingsStore;
pub use records::{PanelSettings, X10Settings, ZoneSettings, NB_PGM_X10_DEVICES};
