//! Hexadecimal keypad state.
use std::fmt::{self, Write};

use crate::constants::KEY_COUNT;

/// Keyboard input state of the 16 keys. Pressed is a 1 bit, released is a 0 bit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Keypad(u16);

impl Keypad {
    pub fn new() -> Self {
        Default::default()
    }

    /// Key identifiers outside 0x0-0xF are ignored.
    pub fn set(&mut self, key_id: u8, pressed: bool) {
        if key_id < KEY_COUNT {
            if pressed {
                self.0 |= 1 << key_id;
            } else {
                self.0 &= !(1 << key_id);
            }
        }
    }

    pub fn is_pressed(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.0 & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any(&self) -> bool {
        self.0 > 0
    }

    /// Retrieve the value of the lowest key that is pressed down.
    #[inline]
    pub fn first_pressed(&self) -> Option<u8> {
        if self.any() {
            Some(self.0.trailing_zeros() as u8)
        } else {
            None
        }
    }

    /// Set all keys to up.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn iter_pressed(&self) -> impl Iterator<Item = u8> + '_ {
        (0..KEY_COUNT).filter(|k| self.is_pressed(*k))
    }

    /// Human readable list of pressed keys, empty when none are down.
    pub fn dump(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.any() {
            write!(buf, "keys:")?;
            for k in self.iter_pressed() {
                write!(buf, " k{k:x}")?;
            }
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut keypad = Keypad::new();

        keypad.set(0, true);
        assert_eq!(keypad.0, 0b00000000_00000001);
        assert!(keypad.is_pressed(0));
        assert!(!keypad.is_pressed(1));
        assert!(!keypad.is_pressed(7));

        keypad.set(7, true);
        assert_eq!(keypad.0, 0b00000000_10000001);
        assert!(keypad.is_pressed(0));
        assert!(keypad.is_pressed(7));

        keypad.set(0, false);
        assert_eq!(keypad.0, 0b00000000_10000000);
        assert!(!keypad.is_pressed(0));
        assert!(keypad.is_pressed(7));

        keypad.set(15, true);
        assert_eq!(keypad.0, 0b10000000_10000000);
        assert!(keypad.is_pressed(15));
        assert_eq!(keypad.first_pressed(), Some(7));
    }

    #[test]
    fn test_out_of_range_key() {
        let mut keypad = Keypad::new();

        keypad.set(16, true);
        assert!(!keypad.any());
        assert!(!keypad.is_pressed(16));
        assert!(!keypad.is_pressed(0xFF));
    }

    #[test]
    fn test_dump_keys() {
        let mut keypad = Keypad::new();
        assert_eq!(keypad.dump().unwrap(), "");

        keypad.set(0xA, true);
        keypad.set(0x3, true);
        assert_eq!(keypad.dump().unwrap(), "keys: k3 ka");
    }
}
