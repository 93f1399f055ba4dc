//! Mode table: which buttons to release and activate when the committed
//! direction of a pad changes.
//!
//! The table is a pure function of the mode, the committed direction, the
//! new direction and the diagonal lock. It never touches buttons itself; the
//! pad applies the returned plan, releases first.

use crate::dpad::direction::{Direction, DpadButtonId};
use crate::dpad::mode::DpadMode;

/// A single button state change produced by a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTransition {
    pub button: DpadButtonId,
    pub active: bool,
}

impl ButtonTransition {
    pub fn release(button: DpadButtonId) -> Self {
        Self {
            button,
            active: false,
        }
    }

    pub fn activate(button: DpadButtonId) -> Self {
        Self {
            button,
            active: true,
        }
    }
}

/// Ordered result of the mode table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionPlan {
    pub releases: Vec<DpadButtonId>,
    pub activations: Vec<DpadButtonId>,
    /// Diagonal lock to hold once the plan is applied
    pub diagonal_lock: Option<DpadButtonId>,
}

impl TransitionPlan {
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty() && self.activations.is_empty()
    }

    /// Transitions in application order: every release, then every activation.
    pub fn transitions(&self) -> Vec<ButtonTransition> {
        self.releases
            .iter()
            .copied()
            .map(ButtonTransition::release)
            .chain(self.activations.iter().copied().map(ButtonTransition::activate))
            .collect()
    }
}

/// Four-way cardinal folding of the eight directions onto the cardinal buttons.
pub fn cardinal_quadrant(direction: Direction) -> Option<DpadButtonId> {
    match DpadButtonId::from_direction(direction)? {
        DpadButtonId::Up | DpadButtonId::UpRight => Some(DpadButtonId::Up),
        DpadButtonId::Down | DpadButtonId::DownLeft => Some(DpadButtonId::Down),
        DpadButtonId::Left | DpadButtonId::UpLeft => Some(DpadButtonId::Left),
        DpadButtonId::Right | DpadButtonId::DownRight => Some(DpadButtonId::Right),
    }
}

fn exact_diagonal(direction: Direction) -> Option<DpadButtonId> {
    DpadButtonId::from_direction(direction).filter(|button| button.is_diagonal())
}

fn exact_cardinal(direction: Direction) -> Option<DpadButtonId> {
    DpadButtonId::from_direction(direction).filter(|button| !button.is_diagonal())
}

/// Computes the release/activate plan for moving from `committed` to `target`.
///
/// A held diagonal lock is released ahead of the mode's own release rule in
/// every mode; it is the only record of a standalone diagonal being active,
/// including one left over from a previous mode.
pub fn plan_transitions(
    mode: DpadMode,
    committed: Direction,
    target: Direction,
    diagonal_lock: Option<DpadButtonId>,
) -> TransitionPlan {
    if committed == target {
        return TransitionPlan {
            diagonal_lock,
            ..Default::default()
        };
    }

    let releases = match diagonal_lock {
        Some(locked) => vec![locked],
        None => match mode {
            DpadMode::Standard => committed.difference(target).cardinals().collect(),
            DpadMode::EightWay => exact_cardinal(committed).into_iter().collect(),
            DpadMode::FourWayCardinal => {
                let previous = cardinal_quadrant(committed);
                if previous.is_some() && previous != cardinal_quadrant(target) {
                    previous.into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            DpadMode::FourWayDiagonal => Vec::new(),
        },
    };

    let (activations, diagonal_lock) = match mode {
        DpadMode::Standard => (target.difference(committed).cardinals().collect(), None),
        DpadMode::EightWay => match DpadButtonId::from_direction(target) {
            Some(button) if button.is_diagonal() => (vec![button], Some(button)),
            Some(button) => (vec![button], None),
            None => (Vec::new(), None),
        },
        DpadMode::FourWayCardinal => {
            let next = cardinal_quadrant(target);
            if next.is_some() && next != cardinal_quadrant(committed) {
                (next.into_iter().collect(), None)
            } else {
                (Vec::new(), None)
            }
        }
        DpadMode::FourWayDiagonal => match exact_diagonal(target) {
            Some(button) => (vec![button], Some(button)),
            None => (Vec::new(), None),
        },
    };

    TransitionPlan {
        releases,
        activations,
        diagonal_lock,
    }
}
