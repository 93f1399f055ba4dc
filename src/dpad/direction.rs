//! Direction values reported by a directional pad and the identities of the
//! eight virtual buttons a pad owns.
//!
//! Bit values follow the joystick hat convention (up=1, right=2, down=4,
//! left=8). Diagonals are the union of two adjacent cardinals.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Raw 8-direction bitmask sampled from the pad.
    ///
    /// `Direction::CENTERED` (no bits) is the idle value. Combinations that
    /// do not name one of the eight directions (e.g. up+down) are carried
    /// as-is and simply own no button outside standard mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Direction: u8 {
        const UP = 0b0001;
        const RIGHT = 0b0010;
        const DOWN = 0b0100;
        const LEFT = 0b1000;

        const UP_RIGHT = Self::UP.bits() | Self::RIGHT.bits();
        const DOWN_RIGHT = Self::DOWN.bits() | Self::RIGHT.bits();
        const DOWN_LEFT = Self::DOWN.bits() | Self::LEFT.bits();
        const UP_LEFT = Self::UP.bits() | Self::LEFT.bits();
    }
}

impl Direction {
    pub const CENTERED: Self = Self::empty();

    /// Builds a direction from a raw hardware value, keeping unknown bits.
    pub const fn from_raw(value: u8) -> Self {
        Self::from_bits_retain(value)
    }

    pub const fn is_centered(self) -> bool {
        self.is_empty()
    }

    pub fn is_diagonal(self) -> bool {
        DpadButtonId::from_direction(self).is_some_and(DpadButtonId::is_diagonal)
    }

    /// Cardinal buttons whose bit is set, in up/down/left/right order.
    pub fn cardinals(self) -> impl Iterator<Item = DpadButtonId> {
        DpadButtonId::CARDINALS
            .into_iter()
            .filter(move |button| self.contains(button.direction()))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DpadButtonId::from_direction(*self) {
            Some(button) => write!(f, "{}", button),
            None if self.is_centered() => write!(f, "Centered"),
            None => write!(f, "Unknown({:#06b})", self.bits()),
        }
    }
}

/// One of the eight virtual buttons owned by a pad.
///
/// The discriminant doubles as the slot index into the pad's button array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DpadButtonId {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
    UpLeft = 4,
    UpRight = 5,
    DownLeft = 6,
    DownRight = 7,
}

impl DpadButtonId {
    pub const ALL: [Self; 8] = [
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::UpLeft,
        Self::UpRight,
        Self::DownLeft,
        Self::DownRight,
    ];

    pub const CARDINALS: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    pub const DIAGONALS: [Self; 4] = [Self::UpLeft, Self::UpRight, Self::DownLeft, Self::DownRight];

    pub const fn slot(self) -> usize {
        self as usize
    }

    pub const fn direction(self) -> Direction {
        match self {
            Self::Up => Direction::UP,
            Self::Down => Direction::DOWN,
            Self::Left => Direction::LEFT,
            Self::Right => Direction::RIGHT,
            Self::UpLeft => Direction::UP_LEFT,
            Self::UpRight => Direction::UP_RIGHT,
            Self::DownLeft => Direction::DOWN_LEFT,
            Self::DownRight => Direction::DOWN_RIGHT,
        }
    }

    /// Exact match only; centered and unnamed combinations yield `None`.
    pub fn from_direction(direction: Direction) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|button| button.direction() == direction)
    }

    /// Looks a button up by its raw direction value, as used for persisted
    /// button blocks.
    pub fn from_value(value: u8) -> Option<Self> {
        Self::from_direction(Direction::from_raw(value))
    }

    pub const fn value(self) -> u8 {
        self.direction().bits()
    }

    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::UpLeft | Self::UpRight | Self::DownLeft | Self::DownRight
        )
    }
}

impl fmt::Display for DpadButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::UpLeft => "Up+Left",
            Self::UpRight => "Up+Right",
            Self::DownLeft => "Down+Left",
            Self::DownRight => "Down+Right",
        };
        write!(f, "{}", name)
    }
}
