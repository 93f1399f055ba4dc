//! Engine that owns every pad set and drives it from commands and timers.
//!
//! # Architecture
//!
//! ```text
//! EngineCommand ──► DpadEngine<Active> ──► EngineOutput
//!       ▲              │      ▲               (button transitions, notifications)
//!       │              ▼      │
//!   Command Channel   sleep_until(next debounce deadline)
//! ```
//!
//! Pads never sleep themselves; the engine asks every set for its earliest
//! deadline and wakes up for it inside the same `select!` that reads
//! commands, so a timer firing and a command are handled on one task.

pub mod engine;

pub use engine::{DpadEngine, DpadEngineHandle, DpadEngineState, EngineSettings};

use crate::dpad::{ButtonSlot, ButtonTransition, Direction, DpadEvent, DpadMode};
use crate::persistence::ProfileConfig;
use tokio::sync::oneshot;

/// Requests accepted by a running engine. Pad indices refer to the active set.
#[derive(Debug)]
pub enum EngineCommand {
    /// Feed a sample straight into one pad
    Direction {
        dpad: usize,
        direction: Direction,
        bypass_delay: bool,
    },
    /// Stage a sample until the next [`EngineCommand::FlushQueued`]
    QueueDirection {
        dpad: usize,
        direction: Direction,
        bypass_delay: bool,
    },
    /// Apply every staged sample of the active set
    FlushQueued,
    SetMode {
        dpad: usize,
        mode: DpadMode,
    },
    SetDelay {
        dpad: usize,
        delay_ms: u32,
    },
    SetName {
        dpad: usize,
        name: String,
    },
    /// Make another set active; held directions carry over
    SwitchSet(usize),
    /// Duplicate one set's configuration into another
    CopySet {
        from: usize,
        to: usize,
    },
    /// Release every button of the active set
    ReleaseAll,
    /// Reply with the persisted form of the current configuration
    Snapshot {
        response_tx: oneshot::Sender<ProfileConfig>,
    },
}

/// Everything the engine reports to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Button {
        set: usize,
        dpad: usize,
        transition: ButtonTransition,
        slots: Vec<ButtonSlot>,
    },
    Notification {
        set: usize,
        dpad: usize,
        event: DpadEvent,
    },
}
