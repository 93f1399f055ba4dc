//! The pad facade: eight buttons, the debounce controller and the pad's own
//! configuration.

use crate::dpad::button::{DPadButton, MouseCurve, MouseMode, MouseSettings, VirtualButton};
use crate::dpad::debounce::{Activity, DebounceController, SubmitDecision};
use crate::dpad::direction::{Direction, DpadButtonId};
use crate::dpad::mode::DpadMode;
use crate::dpad::transition::{ButtonTransition, TransitionPlan};
use crate::dpad::DpadEvent;
use crate::persistence::DpadConfig;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_DPAD_DELAY_MS: u32 = 0;
pub const MIN_DPAD_DELAY_MS: u32 = 10;
pub const MAX_DPAD_DELAY_MS: u32 = 1000;
pub const MAX_NAME_LENGTH: usize = 20;

/// Delay values a pad accepts: off, or 10..=1000 ms.
pub fn is_valid_delay(delay_ms: u32) -> bool {
    delay_ms == 0 || (MIN_DPAD_DELAY_MS..=MAX_DPAD_DELAY_MS).contains(&delay_ms)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueuedDirection {
    direction: Direction,
    bypass_delay: bool,
}

/// A directional pad with its eight virtual buttons.
///
/// Buttons live in a fixed array indexed by [`DpadButtonId::slot`]; the
/// diagonal lock refers to them by id, never by reference.
#[derive(Debug, Clone)]
pub struct DPad<B: VirtualButton = DPadButton> {
    index: usize,
    origin_set: usize,
    name: String,
    default_name: String,
    mode: DpadMode,
    delay_ms: u32,
    buttons: [B; 8],
    debounce: DebounceController,
    queued: Option<QueuedDirection>,
    events: Vec<DpadEvent>,
}

impl<B: VirtualButton> DPad<B> {
    pub fn new(index: usize, origin_set: usize) -> Self {
        Self {
            index,
            origin_set,
            name: String::new(),
            default_name: String::new(),
            mode: DpadMode::default(),
            delay_ms: DEFAULT_DPAD_DELAY_MS,
            buttons: std::array::from_fn(|slot| B::create(DpadButtonId::ALL[slot], origin_set)),
            debounce: DebounceController::new(),
            queued: None,
            events: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based number shown to users and used in profiles
    pub fn real_number(&self) -> usize {
        self.index + 1
    }

    pub fn origin_set(&self) -> usize {
        self.origin_set
    }

    pub fn button(&self, id: DpadButtonId) -> &B {
        &self.buttons[id.slot()]
    }

    pub fn button_mut(&mut self, id: DpadButtonId) -> &mut B {
        &mut self.buttons[id.slot()]
    }

    pub fn buttons(&self) -> impl Iterator<Item = &B> {
        self.buttons.iter()
    }

    pub fn committed_direction(&self) -> Direction {
        self.debounce.committed()
    }

    pub fn pending_direction(&self) -> Direction {
        self.debounce.pending()
    }

    pub fn active_diagonal(&self) -> Option<DpadButtonId> {
        self.debounce.diagonal_lock()
    }

    /// Drains the notifications emitted since the last call.
    pub fn take_events(&mut self) -> Vec<DpadEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: DpadEvent) {
        debug!("DPad {} emitted {:?}", self.real_number(), event);
        self.events.push(event);
    }

    // Direction handling

    /// Feeds a raw sample. Returns the transitions applied if the sample
    /// committed right away; deferred commits surface through [`Self::poll_timer`].
    pub fn inject_direction(
        &mut self,
        direction: Direction,
        bypass_delay: bool,
        now: Instant,
    ) -> Vec<ButtonTransition> {
        let delay = Duration::from_millis(u64::from(self.delay_ms));
        let outcome = self.debounce.submit(direction, bypass_delay, delay, now);

        match outcome.activity {
            Some(Activity::Started(direction)) => self.emit(DpadEvent::ActivityStarted(direction)),
            Some(Activity::Released) => self.emit(DpadEvent::ActivityReleased),
            None => {}
        }

        match outcome.decision {
            SubmitDecision::CommitNow => self.commit(),
            _ => Vec::new(),
        }
    }

    /// Stages a sample for a later [`Self::flush_queued`]; last write wins.
    pub fn queue_direction(&mut self, direction: Direction, bypass_delay: bool) {
        self.queued = Some(QueuedDirection {
            direction,
            bypass_delay,
        });
    }

    pub fn flush_queued(&mut self, now: Instant) -> Vec<ButtonTransition> {
        match self.queued.take() {
            Some(queued) => self.inject_direction(queued.direction, queued.bypass_delay, now),
            None => Vec::new(),
        }
    }

    pub fn has_queued(&self) -> bool {
        self.queued.is_some()
    }

    pub fn clear_queued(&mut self) {
        self.queued = None;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn has_pending_commit(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Runs the deferred commit if its deadline has passed.
    pub fn poll_timer(&mut self, now: Instant) -> Vec<ButtonTransition> {
        if self.debounce.poll(now) {
            self.commit()
        } else {
            Vec::new()
        }
    }

    fn commit(&mut self) -> Vec<ButtonTransition> {
        let from = self.debounce.committed();
        let plan = self.debounce.commit(self.mode);
        self.apply(&plan);

        if !plan.is_empty() {
            debug!(
                "DPad {} committed {} -> {} ({:?} mode): released {:?}, activated {:?}",
                self.real_number(),
                from,
                self.debounce.committed(),
                self.mode,
                plan.releases,
                plan.activations
            );
        }
        plan.transitions()
    }

    fn apply(&mut self, plan: &TransitionPlan) {
        for button in &plan.releases {
            self.buttons[button.slot()].deactivate();
        }
        for button in &plan.activations {
            self.buttons[button.slot()].activate();
        }
    }

    /// Releases every button that is still active and returns the pad to
    /// centered, dropping any deferred commit or staged sample.
    ///
    /// All eight buttons are checked, not only those of the current mode: a
    /// button pressed before a mode change is still held.
    pub fn force_release_all(&mut self) -> Vec<ButtonTransition> {
        let mut released = Vec::new();
        for id in DpadButtonId::ALL {
            let button = &mut self.buttons[id.slot()];
            if button.is_active() {
                button.deactivate();
                released.push(ButtonTransition::release(id));
            }
        }

        self.debounce.reset();
        self.queued = None;

        if !released.is_empty() {
            info!("DPad {} force released {} buttons", self.real_number(), released.len());
        }
        released
    }

    // Configuration

    pub fn mode(&self) -> DpadMode {
        self.mode
    }

    /// Takes effect on the next commit; button state is left as it is.
    pub fn set_mode(&mut self, mode: DpadMode) {
        self.mode = mode;
        self.emit(DpadEvent::ModeChanged(mode));
        self.emit(DpadEvent::ConfigChanged);
    }

    pub fn delay(&self) -> u32 {
        self.delay_ms
    }

    /// Accepts 0 or 10..=1000 ms. Anything else is ignored and `false` returned.
    pub fn set_delay(&mut self, delay_ms: u32) -> bool {
        if !is_valid_delay(delay_ms) {
            debug!(
                "DPad {} rejected delay of {}ms, keeping {}ms",
                self.real_number(),
                delay_ms,
                self.delay_ms
            );
            return false;
        }

        self.delay_ms = delay_ms;
        self.emit(DpadEvent::DelayChanged(delay_ms));
        self.emit(DpadEvent::ConfigChanged);
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names longer than 20 characters are rejected, as are unchanged names.
    pub fn set_name(&mut self, name: &str) -> bool {
        if name.chars().count() > MAX_NAME_LENGTH || name == self.name {
            return false;
        }

        self.name = name.to_string();
        self.emit(DpadEvent::NameChanged);
        self.emit(DpadEvent::ConfigChanged);
        true
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn set_default_name(&mut self, name: &str) {
        self.default_name = name.to_string();
        self.emit(DpadEvent::NameChanged);
    }

    /// Label for display: custom name, then default name, then "DPad <n>".
    pub fn display_name(&self, full_format: bool, use_custom_name: bool) -> String {
        let prefix = if full_format { "DPad " } else { "" };
        if use_custom_name && !self.name.is_empty() {
            format!("{}{}", prefix, self.name)
        } else if !self.default_name.is_empty() {
            format!("{}{}", prefix, self.default_name)
        } else {
            format!("DPad {}", self.real_number())
        }
    }

    pub fn is_default(&self) -> bool {
        self.mode == DpadMode::Standard
            && self.delay_ms == DEFAULT_DPAD_DELAY_MS
            && self.buttons.iter().all(VirtualButton::is_default)
    }

    /// Copies mode, delay, committed state and button assignments into
    /// `dest`, which must belong to another set.
    pub fn copy_configuration(&self, dest: &mut DPad<B>) {
        dest.mode = self.mode;
        dest.delay_ms = self.delay_ms;
        dest.debounce
            .restore(self.debounce.committed(), self.debounce.diagonal_lock());

        for (source, target) in self.buttons.iter().zip(dest.buttons.iter_mut()) {
            source.copy_assignments(target);
        }

        if !dest.is_default() {
            dest.emit(DpadEvent::ConfigChanged);
        }
    }

    /// Carries over mouse travel of the buttons currently held in `source`.
    pub fn copy_transient_physics(&mut self, source: &DPad<B>) {
        for id in source.applicable_buttons() {
            let held = source.button(*id);
            if held.is_active() {
                self.buttons[id.slot()].copy_last_distance(held);
            }
        }
    }

    pub fn applicable_buttons(&self) -> &'static [DpadButtonId] {
        self.mode.applicable_buttons()
    }

    pub fn direction_buttons(&self, direction: Direction) -> Vec<DpadButtonId> {
        self.mode.direction_buttons(direction)
    }

    // Aggregate button settings

    fn uniform<T: PartialEq>(&self, get: impl Fn(&MouseSettings) -> T) -> Option<T> {
        let mut values = self
            .applicable_buttons()
            .iter()
            .map(|id| get(self.buttons[id.slot()].settings()));
        let first = values.next()?;
        values.all(|value| value == first).then_some(first)
    }

    fn update_all(&mut self, update: impl Fn(&mut MouseSettings)) {
        for button in self.buttons.iter_mut() {
            update(button.settings_mut());
        }
        self.emit(DpadEvent::ConfigChanged);
    }

    fn update_applicable(&mut self, update: impl Fn(&mut MouseSettings)) {
        for id in self.applicable_buttons() {
            update(self.buttons[id.slot()].settings_mut());
        }
        self.emit(DpadEvent::ConfigChanged);
    }

    pub fn set_buttons_mouse_mode(&mut self, mode: MouseMode) {
        self.update_all(|settings| settings.mouse_mode = mode);
    }

    pub fn has_same_buttons_mouse_mode(&self) -> bool {
        self.uniform(|settings| settings.mouse_mode).is_some()
    }

    pub fn buttons_preset_mouse_mode(&self) -> MouseMode {
        self.uniform(|settings| settings.mouse_mode)
            .unwrap_or(MouseMode::Cursor)
    }

    pub fn set_buttons_mouse_curve(&mut self, curve: MouseCurve) {
        self.update_all(|settings| settings.mouse_curve = curve);
    }

    pub fn has_same_buttons_mouse_curve(&self) -> bool {
        self.uniform(|settings| settings.mouse_curve).is_some()
    }

    pub fn buttons_preset_mouse_curve(&self) -> MouseCurve {
        self.uniform(|settings| settings.mouse_curve)
            .unwrap_or(MouseCurve::Linear)
    }

    pub fn set_buttons_spring_width(&mut self, width: u32) {
        self.update_all(|settings| settings.spring_width = width);
    }

    pub fn set_buttons_spring_height(&mut self, height: u32) {
        self.update_all(|settings| settings.spring_height = height);
    }

    pub fn buttons_preset_spring_width(&self) -> u32 {
        self.uniform(|settings| settings.spring_width).unwrap_or(0)
    }

    pub fn buttons_preset_spring_height(&self) -> u32 {
        self.uniform(|settings| settings.spring_height).unwrap_or(0)
    }

    pub fn set_buttons_sensitivity(&mut self, sensitivity: f64) {
        self.update_all(|settings| settings.sensitivity = sensitivity);
    }

    pub fn buttons_preset_sensitivity(&self) -> f64 {
        self.uniform(|settings| settings.sensitivity)
            .unwrap_or(crate::dpad::button::DEFAULT_SENSITIVITY)
    }

    pub fn set_buttons_relative_spring(&mut self, relative: bool) {
        self.update_all(|settings| settings.relative_spring = relative);
    }

    pub fn is_relative_spring(&self) -> bool {
        self.uniform(|settings| settings.relative_spring)
            .unwrap_or(false)
    }

    pub fn set_buttons_easing_duration(&mut self, seconds: f64) {
        self.update_applicable(|settings| settings.easing_duration = seconds);
    }

    pub fn buttons_easing_duration(&self) -> f64 {
        self.uniform(|settings| settings.easing_duration)
            .unwrap_or(crate::dpad::button::DEFAULT_EASING_DURATION)
    }

    pub fn set_buttons_wheel_speed_x(&mut self, speed: u32) {
        self.update_all(|settings| settings.wheel_speed_x = speed);
    }

    pub fn set_buttons_wheel_speed_y(&mut self, speed: u32) {
        self.update_all(|settings| settings.wheel_speed_y = speed);
    }

    pub fn has_slots_assigned(&self) -> bool {
        self.applicable_buttons()
            .iter()
            .any(|id| !self.buttons[id.slot()].slots().is_empty())
    }

    pub fn event_reset(&mut self) {
        for id in self.applicable_buttons() {
            self.buttons[id.slot()].event_reset();
        }
    }

    // Persistence

    /// Applies a persisted block. Malformed values are logged and skipped.
    pub fn read_config(&mut self, config: &DpadConfig) {
        if let Some(token) = config.mode.as_deref() {
            match DpadMode::from_token(token) {
                Some(mode) => self.set_mode(mode),
                None => warn!(
                    "DPad {}: unknown mode '{}', keeping {}",
                    self.real_number(),
                    token,
                    self.mode
                ),
            }
        }

        if config.delay.is_some() {
            match config.delay_ms() {
                Some(delay) if self.set_delay(delay) => {}
                _ => warn!(
                    "DPad {}: invalid delay {:?}, keeping {}ms",
                    self.real_number(),
                    config.delay,
                    self.delay_ms
                ),
            }
        }

        if let Some(name) = config.name.as_deref() {
            if !self.set_name(name) && name != self.name {
                warn!("DPad {}: name '{}' is too long", self.real_number(), name);
            }
        }

        for button_config in &config.buttons {
            match DpadButtonId::from_value(button_config.index) {
                Some(id) => self.buttons[id.slot()].read_config(button_config),
                None => warn!(
                    "DPad {}: skipping button block with unknown index {}",
                    self.real_number(),
                    button_config.index
                ),
            }
        }
    }

    /// `None` for a default pad; default pads are not persisted.
    pub fn write_config(&self) -> Option<DpadConfig> {
        if self.is_default() {
            return None;
        }

        Some(DpadConfig {
            index: self.real_number(),
            mode: self.mode.token().map(str::to_string),
            delay: (self.delay_ms > DEFAULT_DPAD_DELAY_MS)
                .then(|| toml::Value::Integer(i64::from(self.delay_ms))),
            name: (!self.name.is_empty()).then(|| self.name.clone()),
            buttons: self
                .buttons
                .iter()
                .filter_map(VirtualButton::write_config)
                .collect(),
        })
    }
}
