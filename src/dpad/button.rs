//! Virtual buttons driven by a pad.
//!
//! The pad only relies on the [`VirtualButton`] contract. [`DPadButton`] is
//! the implementation used by the engine: it tracks press state, the slots
//! assigned to it and the mouse settings that the output side consumes.

use crate::dpad::direction::{Direction, DpadButtonId};
use crate::persistence::ButtonConfig;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Contract a pad needs from each of its eight buttons.
pub trait VirtualButton: Sized {
    fn create(id: DpadButtonId, origin_set: usize) -> Self;

    fn id(&self) -> DpadButtonId;

    fn direction(&self) -> Direction {
        self.id().direction()
    }

    fn activate(&mut self);

    fn deactivate(&mut self);

    fn is_active(&self) -> bool;

    /// True when nothing about the button differs from a fresh one.
    fn is_default(&self) -> bool;

    /// Copies bound slots and settings into `dest`. Press state is not copied.
    fn copy_assignments(&self, dest: &mut Self);

    /// Copies transient mouse distance accumulators from `source`.
    fn copy_last_distance(&mut self, source: &Self);

    /// Drops press state and transient physics without emitting anything.
    fn event_reset(&mut self);

    fn slots(&self) -> &[ButtonSlot];

    fn settings(&self) -> &MouseSettings;

    fn settings_mut(&mut self) -> &mut MouseSettings;

    fn read_config(&mut self, config: &ButtonConfig);

    /// `None` for a default button; default buttons are not persisted.
    fn write_config(&self) -> Option<ButtonConfig>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKind {
    Keyboard,
    MouseButton,
    MouseMovement,
    Pause,
}

/// One output assignment of a button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSlot {
    pub kind: SlotKind,
    pub code: u32,
}

impl ButtonSlot {
    pub fn key(code: u32) -> Self {
        Self {
            kind: SlotKind::Keyboard,
            code,
        }
    }

    pub fn mouse_button(code: u32) -> Self {
        Self {
            kind: SlotKind::MouseButton,
            code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MouseMode {
    #[default]
    Cursor,
    Spring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MouseCurve {
    Linear,
    #[default]
    EnhancedPrecision,
    Quadratic,
    Cubic,
    Power,
}

pub const DEFAULT_SENSITIVITY: f64 = 1.0;
pub const DEFAULT_EASING_DURATION: f64 = 0.5;
pub const DEFAULT_WHEEL_SPEED: u32 = 20;

/// Mouse emulation settings of a button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseSettings {
    pub mouse_mode: MouseMode,
    pub mouse_curve: MouseCurve,
    pub sensitivity: f64,
    pub spring_width: u32,
    pub spring_height: u32,
    pub relative_spring: bool,
    pub easing_duration: f64,
    pub wheel_speed_x: u32,
    pub wheel_speed_y: u32,
}

impl Default for MouseSettings {
    fn default() -> Self {
        Self {
            mouse_mode: MouseMode::Cursor,
            mouse_curve: MouseCurve::EnhancedPrecision,
            sensitivity: DEFAULT_SENSITIVITY,
            spring_width: 0,
            spring_height: 0,
            relative_spring: false,
            easing_duration: DEFAULT_EASING_DURATION,
            wheel_speed_x: DEFAULT_WHEEL_SPEED,
            wheel_speed_y: DEFAULT_WHEEL_SPEED,
        }
    }
}

/// Accumulated mouse travel carried across set switches
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseDistance {
    pub acceleration: f64,
    pub from_dead_zone: f64,
}

#[derive(Debug, Clone)]
pub struct DPadButton {
    id: DpadButtonId,
    origin_set: usize,
    active: bool,
    pressed_since: Option<DateTime<Local>>,
    slots: Vec<ButtonSlot>,
    settings: MouseSettings,
    last_distance: MouseDistance,
}

impl DPadButton {
    pub fn pressed_since(&self) -> Option<DateTime<Local>> {
        self.pressed_since
    }

    pub fn assign_slot(&mut self, slot: ButtonSlot) {
        self.slots.push(slot);
    }

    pub fn last_distance(&self) -> MouseDistance {
        self.last_distance
    }

    /// Updated by the mouse emulation side while the button is held.
    pub fn record_distance(&mut self, distance: MouseDistance) {
        self.last_distance = distance;
    }
}

impl VirtualButton for DPadButton {
    fn create(id: DpadButtonId, origin_set: usize) -> Self {
        Self {
            id,
            origin_set,
            active: false,
            pressed_since: None,
            slots: Vec::new(),
            settings: MouseSettings::default(),
            last_distance: MouseDistance::default(),
        }
    }

    fn id(&self) -> DpadButtonId {
        self.id
    }

    fn activate(&mut self) {
        if !self.active {
            self.active = true;
            self.pressed_since = Some(Local::now());
            debug!("Button {} (set {}) activated", self.id, self.origin_set);
        }
    }

    fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            if let Some(since) = self.pressed_since.take() {
                let held = Local::now() - since;
                debug!(
                    "Button {} (set {}) released after {}ms",
                    self.id,
                    self.origin_set,
                    held.num_milliseconds()
                );
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn is_default(&self) -> bool {
        self.slots.is_empty() && self.settings == MouseSettings::default()
    }

    fn copy_assignments(&self, dest: &mut Self) {
        dest.slots = self.slots.clone();
        dest.settings = self.settings.clone();
    }

    fn copy_last_distance(&mut self, source: &Self) {
        self.last_distance = source.last_distance;
    }

    fn event_reset(&mut self) {
        self.active = false;
        self.pressed_since = None;
        self.last_distance = MouseDistance::default();
    }

    fn slots(&self) -> &[ButtonSlot] {
        &self.slots
    }

    fn settings(&self) -> &MouseSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut MouseSettings {
        &mut self.settings
    }

    fn read_config(&mut self, config: &ButtonConfig) {
        self.slots = config.slots.clone();
        self.settings = config.mouse.clone().unwrap_or_default();
    }

    fn write_config(&self) -> Option<ButtonConfig> {
        if self.is_default() {
            return None;
        }

        let mouse = (self.settings != MouseSettings::default()).then(|| self.settings.clone());
        Some(ButtonConfig {
            index: self.id.value(),
            slots: self.slots.clone(),
            mouse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_button_is_default_and_inactive() {
        let button = DPadButton::create(DpadButtonId::UpLeft, 0);
        assert!(button.is_default());
        assert!(!button.is_active());
        assert_eq!(button.direction(), Direction::UP_LEFT);
        assert!(button.write_config().is_none());
    }

    #[test]
    fn activation_is_idempotent() {
        let mut button = DPadButton::create(DpadButtonId::Up, 0);
        button.activate();
        let since = button.pressed_since();
        button.activate();
        assert_eq!(button.pressed_since(), since);
        button.deactivate();
        assert!(!button.is_active());
        assert!(button.pressed_since().is_none());
    }

    #[test]
    fn assignments_copy_without_press_state() {
        let mut source = DPadButton::create(DpadButtonId::Left, 0);
        source.assign_slot(ButtonSlot::key(30));
        source.settings_mut().sensitivity = 2.5;
        source.activate();

        let mut dest = DPadButton::create(DpadButtonId::Left, 1);
        source.copy_assignments(&mut dest);
        assert_eq!(dest.slots(), source.slots());
        assert_eq!(dest.settings().sensitivity, 2.5);
        assert!(!dest.is_active());
        assert!(!dest.is_default());
    }

    #[test]
    fn event_reset_drops_transient_state() {
        let mut button = DPadButton::create(DpadButtonId::Right, 0);
        button.activate();
        button.record_distance(MouseDistance {
            acceleration: 3.0,
            from_dead_zone: 0.4,
        });
        button.event_reset();
        assert!(!button.is_active());
        assert_eq!(button.last_distance(), MouseDistance::default());
    }
}
