//! Helpers for extracting data from opcodes.
use std::fmt;

/// A single 16-bit instruction word.
///
/// Instructions are stored big-endian. The fields are named after the
/// nibbles they occupy:
///
/// ```text
/// 0xF000  class
/// 0x0F00  X
/// 0x00F0  Y
/// 0x000F  N
/// 0x00FF  NN
/// 0x0FFF  NNN
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Read the instruction at the cursor.
    ///
    /// The cursor wraps around the end of the buffer, so the second
    /// byte of an instruction at the last address is read from the start.
    #[inline(always)]
    pub fn fetch(bytecode: &[u8], cursor: usize) -> Self {
        let len = bytecode.len();
        let a = bytecode[cursor % len];
        let b = bytecode[(cursor + 1) % len];
        Self::from_bytes([a, b])
    }

    #[inline(always)]
    pub fn from_bytes([a, b]: [u8; 2]) -> Self {
        Self(((a as u16) << 8) | b as u16)
    }

    #[inline(always)]
    pub fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Extract the instruction family from the upper nibble.
    #[inline(always)]
    pub fn class(self) -> u8 {
        ((self.0 & 0xF000) >> 12) as u8
    }

    /// Extract operand NNN, a 12-bit address.
    #[inline(always)]
    pub fn nnn(self) -> u16 {
        self.0 & 0x0FFF
    }

    /// Extract operand NN, an 8-bit immediate.
    #[inline(always)]
    pub fn nn(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// Extract register operand X.
    #[inline(always)]
    pub fn x(self) -> u8 {
        ((self.0 & 0x0F00) >> 8) as u8
    }

    /// Extract register operand Y.
    #[inline(always)]
    pub fn y(self) -> u8 {
        ((self.0 & 0x00F0) >> 4) as u8
    }

    /// Extract operand N, the lowest nibble.
    #[inline(always)]
    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl From<u16> for Opcode {
    fn from(word: u16) -> Self {
        Opcode(word)
    }
}
