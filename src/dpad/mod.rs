//! Directional pad state machine.
//!
//! Turns raw 8-direction samples into activate/deactivate calls on eight
//! virtual buttons under one of four interpretation modes, with an optional
//! debounce delay that coalesces fast sweeps into a single commit.
//!
//! # Architecture
//!
//! ```text
//! raw Direction ──► DPad ──► DebounceController ──► plan_transitions ──► VirtualButton
//!                    │        (now / deferred)       (mode table)       (release, then activate)
//!                    └──► DpadEvent outbox
//! ```
//!
//! Everything here is synchronous and clock-agnostic; the engine drives the
//! deferred commits from its event loop.

pub mod button;
pub mod debounce;
pub mod direction;
pub mod dpad;
pub mod error;
pub mod mode;
pub mod set;
pub mod transition;

pub use button::{ButtonSlot, DPadButton, MouseCurve, MouseMode, MouseSettings, SlotKind, VirtualButton};
pub use debounce::{DebounceController, SubmitDecision};
pub use direction::{Direction, DpadButtonId};
pub use dpad::DPad;
pub use error::DpadError;
pub use mode::DpadMode;
pub use set::{DpadSet, PadTransitions};
pub use transition::{plan_transitions, ButtonTransition, TransitionPlan};

/// Notifications emitted by a pad for UI and logging consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpadEvent {
    /// The pad left center while no direction was committed
    ActivityStarted(Direction),
    /// The pad reported center
    ActivityReleased,
    ModeChanged(DpadMode),
    DelayChanged(u32),
    NameChanged,
    /// Anything relevant to the default-state comparison changed
    ConfigChanged,
}
