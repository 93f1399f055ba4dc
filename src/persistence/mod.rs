//! # Persistence Module
//!
//! ## Why This Module Exists
//! Profiles store how each pad of each set is configured so a user can keep
//! several independent setups. This module defines the serialized shape and
//! the store that reads and writes it.
//!
//! ## Key Abstractions
//! - **Only non-default data is written**: a pad with standard mode, no delay
//!   and default buttons produces no block at all, and sets without any such
//!   pad are skipped as well.
//! - **Typed at the edges, lenient inside**: the mode token and delay are kept
//!   as loosely typed values so one malformed entry degrades to the default
//!   instead of rejecting the whole profile.
//!
//! ## Shape
//! ```toml
//! name = "Platformer"
//!
//! [[set]]
//! index = 1
//!
//! [[set.dpad]]
//! index = 1
//! mode = "eight-way"
//! delay = 50
//!
//! [[set.dpad.button]]
//! index = 9
//! slots = [{ kind = "keyboard", code = 17 }]
//! ```
//!
//! ## Error Handling Strategy
//! File and parse failures surface as `color_eyre` reports with context;
//! value-level problems are logged and replaced by defaults by the pad itself.

pub mod profile_store;

use crate::dpad::button::{ButtonSlot, MouseSettings};
use crate::dpad::set::DpadSet;
use crate::dpad::VirtualButton;
use serde::{Deserialize, Serialize};

/// A complete profile: every non-default set of a device.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct ProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "set", skip_serializing_if = "Vec::is_empty")]
    pub sets: Vec<SetConfig>,
}

impl ProfileConfig {
    /// Builds a profile from live sets, dropping sets that are entirely default.
    pub fn from_sets<B: VirtualButton>(name: Option<String>, sets: &[DpadSet<B>]) -> Self {
        Self {
            name,
            sets: sets.iter().filter_map(DpadSet::write_config).collect(),
        }
    }

    /// Applies the profile to live sets. Blocks for unknown sets are skipped.
    pub fn apply_to<B: VirtualButton>(&self, sets: &mut [DpadSet<B>]) {
        for set_config in &self.sets {
            let slot = set_config.index.checked_sub(1);
            match slot.and_then(|slot| sets.get_mut(slot)) {
                Some(set) => set.read_config(set_config),
                None => tracing::warn!("Skipping unknown set index {}", set_config.index),
            }
        }
    }
}

/// Persisted pads of one set. `index` is one-based.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct SetConfig {
    pub index: usize,
    #[serde(default, rename = "dpad", skip_serializing_if = "Vec::is_empty")]
    pub dpads: Vec<DpadConfig>,
}

/// Persisted configuration of one pad. `index` is one-based.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct DpadConfig {
    pub index: usize,
    /// `"eight-way" | "four-way" | "diagonal"`; absent means standard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Milliseconds; absent or 0 means no delay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<toml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "button", skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<ButtonConfig>,
}

impl DpadConfig {
    /// Delay as milliseconds, if it is a non-negative integer that fits.
    pub fn delay_ms(&self) -> Option<u32> {
        self.delay
            .as_ref()
            .and_then(toml::Value::as_integer)
            .and_then(|delay| u32::try_from(delay).ok())
    }
}

/// Persisted configuration of one virtual button, keyed by its direction value.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct ButtonConfig {
    pub index: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<ButtonSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mouse: Option<MouseSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_delay_parsing() {
        let parse = |text: &str| -> DpadConfig { toml::from_str(text).unwrap() };

        assert_eq!(parse("index = 1\ndelay = 50").delay_ms(), Some(50));
        assert_eq!(parse("index = 1\ndelay = \"fast\"").delay_ms(), None);
        assert_eq!(parse("index = 1\ndelay = -5").delay_ms(), None);
        assert_eq!(parse("index = 1").delay_ms(), None);
    }

    #[test]
    fn unknown_mode_token_still_parses() {
        let config: DpadConfig = toml::from_str("index = 2\nmode = \"sideways\"").unwrap();
        assert_eq!(config.mode.as_deref(), Some("sideways"));
    }
}
