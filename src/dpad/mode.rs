//! Interpretation policies for a directional pad.

use crate::dpad::direction::{Direction, DpadButtonId};
use std::fmt;

/// How raw directions are turned into virtual button activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DpadMode {
    /// Four independent cardinal bits; diagonals press two buttons
    #[default]
    Standard,
    /// Eight mutually exclusive buttons
    EightWay,
    /// Eight directions folded onto the four cardinal buttons
    FourWayCardinal,
    /// Only the four diagonal buttons exist
    FourWayDiagonal,
}

impl DpadMode {
    pub const ALL: [Self; 4] = [
        Self::Standard,
        Self::EightWay,
        Self::FourWayCardinal,
        Self::FourWayDiagonal,
    ];

    /// Persisted token. Standard is the implicit default and has none.
    pub fn token(self) -> Option<&'static str> {
        match self {
            Self::Standard => None,
            Self::EightWay => Some("eight-way"),
            Self::FourWayCardinal => Some("four-way"),
            Self::FourWayDiagonal => Some("diagonal"),
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "eight-way" => Some(Self::EightWay),
            "four-way" => Some(Self::FourWayCardinal),
            "diagonal" => Some(Self::FourWayDiagonal),
            _ => None,
        }
    }

    /// Whether a standalone diagonal button can be active in this mode.
    pub fn uses_diagonal_lock(self) -> bool {
        matches!(self, Self::EightWay | Self::FourWayDiagonal)
    }

    /// Buttons that can ever be driven in this mode.
    pub fn applicable_buttons(self) -> &'static [DpadButtonId] {
        match self {
            Self::Standard | Self::FourWayCardinal => &DpadButtonId::CARDINALS,
            Self::EightWay => &DpadButtonId::ALL,
            Self::FourWayDiagonal => &DpadButtonId::DIAGONALS,
        }
    }

    /// Buttons the given direction addresses directly in this mode.
    ///
    /// Unlike the transition table this does not fold diagonals in
    /// four-way cardinal mode; it answers "which buttons belong to this
    /// direction", not "which button would activate".
    pub fn direction_buttons(self, direction: Direction) -> Vec<DpadButtonId> {
        match self {
            Self::Standard => direction.cardinals().collect(),
            Self::EightWay => DpadButtonId::from_direction(direction).into_iter().collect(),
            Self::FourWayCardinal => DpadButtonId::from_direction(direction)
                .filter(|button| !button.is_diagonal())
                .into_iter()
                .collect(),
            Self::FourWayDiagonal => DpadButtonId::from_direction(direction)
                .filter(|button| button.is_diagonal())
                .into_iter()
                .collect(),
        }
    }
}

impl fmt::Display for DpadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard"),
            Self::EightWay => write!(f, "8-Way"),
            Self::FourWayCardinal => write!(f, "4-Way Cardinal"),
            Self::FourWayDiagonal => write!(f, "4-Way Diagonal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_except_standard() {
        for mode in DpadMode::ALL {
            match mode.token() {
                Some(token) => assert_eq!(DpadMode::from_token(token), Some(mode)),
                None => assert_eq!(mode, DpadMode::Standard),
            }
        }
        assert_eq!(DpadMode::from_token("standard"), None);
        assert_eq!(DpadMode::from_token("EIGHT-WAY"), None);
    }

    #[test]
    fn applicable_buttons_per_mode() {
        assert_eq!(DpadMode::Standard.applicable_buttons().len(), 4);
        assert_eq!(DpadMode::EightWay.applicable_buttons().len(), 8);
        assert!(DpadMode::FourWayDiagonal
            .applicable_buttons()
            .iter()
            .all(|button| button.is_diagonal()));
    }

    #[test]
    fn direction_buttons_follow_mode() {
        assert_eq!(
            DpadMode::Standard.direction_buttons(Direction::UP_RIGHT),
            vec![DpadButtonId::Up, DpadButtonId::Right]
        );
        assert_eq!(
            DpadMode::EightWay.direction_buttons(Direction::UP_RIGHT),
            vec![DpadButtonId::UpRight]
        );
        assert!(DpadMode::FourWayCardinal
            .direction_buttons(Direction::UP_RIGHT)
            .is_empty());
        assert!(DpadMode::FourWayDiagonal
            .direction_buttons(Direction::UP)
            .is_empty());
    }
}
