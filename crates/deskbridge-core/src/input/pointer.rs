//! Pointer (mouse) input types.
//!
//! Remote-framebuffer pointer events carry an 8-bit button mask where bit
//! `n - 1` is set while button `n` is held.  Buttons 1–3 are the physical
//! left/middle/right buttons; buttons 4–7 are the wheel directions, and a
//! single scroll "notch" is one press followed by one release of the matching
//! wheel button.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a button or direction name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsePointerError {
    #[error("invalid button {0:?}; available buttons: left, middle, right")]
    InvalidButton(String),
    #[error("invalid direction {0:?}; available directions: up, down, left, right")]
    InvalidDirection(String),
}

/// A physical mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// Remote-framebuffer button number (1-based).
    pub fn number(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
        }
    }
}

impl FromStr for MouseButton {
    type Err = ParsePointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "middle" => Ok(MouseButton::Middle),
            "right" => Ok(MouseButton::Right),
            _ => Err(ParsePointerError::InvalidButton(s.to_string())),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MouseButton::Left => "left",
            MouseButton::Middle => "middle",
            MouseButton::Right => "right",
        };
        f.write_str(name)
    }
}

/// Mouse wheel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    /// Remote-framebuffer wheel button number (4–7).
    pub fn number(self) -> u8 {
        match self {
            ScrollDirection::Up => 4,
            ScrollDirection::Down => 5,
            ScrollDirection::Left => 6,
            ScrollDirection::Right => 7,
        }
    }
}

impl FromStr for ScrollDirection {
    type Err = ParsePointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(ScrollDirection::Up),
            "down" => Ok(ScrollDirection::Down),
            "left" => Ok(ScrollDirection::Left),
            "right" => Ok(ScrollDirection::Right),
            _ => Err(ParsePointerError::InvalidDirection(s.to_string())),
        }
    }
}

/// Set of held pointer buttons, encoded as the wire bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ButtonMask(pub u8);

impl ButtonMask {
    fn bit(number: u8) -> u8 {
        1 << (number - 1)
    }

    pub fn press(&mut self, button: MouseButton) {
        self.0 |= Self::bit(button.number());
    }

    pub fn release(&mut self, button: MouseButton) {
        self.0 &= !Self::bit(button.number());
    }

    pub fn is_pressed(self, button: MouseButton) -> bool {
        self.0 & Self::bit(button.number()) != 0
    }

    /// Mask with the wheel button for `direction` held on top of `self`.
    pub fn with_wheel(self, direction: ScrollDirection) -> ButtonMask {
        ButtonMask(self.0 | Self::bit(direction.number()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_numbers_match_wire_convention() {
        assert_eq!(MouseButton::Left.number(), 1);
        assert_eq!(MouseButton::Middle.number(), 2);
        assert_eq!(MouseButton::Right.number(), 3);
        assert_eq!(ScrollDirection::Up.number(), 4);
        assert_eq!(ScrollDirection::Right.number(), 7);
    }

    #[test]
    fn test_parse_button_names_case_insensitively() {
        assert_eq!("Left".parse::<MouseButton>(), Ok(MouseButton::Left));
        assert_eq!("RIGHT".parse::<MouseButton>(), Ok(MouseButton::Right));
        assert_eq!(
            "wheel".parse::<MouseButton>(),
            Err(ParsePointerError::InvalidButton("wheel".to_string()))
        );
    }

    #[test]
    fn test_parse_direction_rejects_unknown() {
        assert_eq!("down".parse::<ScrollDirection>(), Ok(ScrollDirection::Down));
        assert!("sideways".parse::<ScrollDirection>().is_err());
    }

    #[test]
    fn test_button_mask_press_and_release() {
        // Arrange
        let mut mask = ButtonMask::default();

        // Act
        mask.press(MouseButton::Left);
        mask.press(MouseButton::Right);

        // Assert
        assert_eq!(mask.0, 0b0000_0101);
        assert!(mask.is_pressed(MouseButton::Left));
        assert!(!mask.is_pressed(MouseButton::Middle));

        mask.release(MouseButton::Left);
        assert_eq!(mask.0, 0b0000_0100);
    }

    #[test]
    fn test_wheel_mask_keeps_held_buttons() {
        let mut mask = ButtonMask::default();
        mask.press(MouseButton::Left);
        assert_eq!(mask.with_wheel(ScrollDirection::Down).0, 0b0001_0001);
        // The original mask is untouched.
        assert_eq!(mask.0, 0b0000_0001);
    }
}
