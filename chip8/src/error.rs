//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Subroutine call while the call stack is already full.
    StackOverflow { pc: Address },
    /// Return from subroutine while the call stack is empty.
    StackUnderflow { pc: Address },
    /// Attempt to step a machine that was halted by a fatal error.
    Halted,
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize, max: usize },
    Io(std::io::Error),
    Fmt(fmt::Error),
}

impl Chip8Error {
    /// Whether the error leaves the machine in a state it cannot continue from.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StackOverflow { .. } | Self::StackUnderflow { .. } | Self::Halted
        )
    }
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow { pc } => write!(f, "call stack overflow at {pc:04X}"),
            Self::StackUnderflow { pc } => write!(f, "call stack underflow at {pc:04X}"),
            Self::Halted => write!(f, "machine is halted"),
            Self::LargeProgram { size, max } => write!(
                f,
                "program too large for VM memory: {size} bytes, max {max} bytes"
            ),
            Self::Io(err) => write!(f, "{}", err),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}
