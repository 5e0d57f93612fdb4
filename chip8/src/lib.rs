mod bytecode;
mod clock;
pub mod constants;
mod cpu;
mod devices;
mod disasm;
mod display;
mod error;
mod keypad;
mod vm;

pub use self::{
    bytecode::Opcode,
    clock::Clock,
    devices::{Devices, InvalidKeyCode, KeyCode, NullDevices},
    display::{Chip8DisplayBuffer, Display},
    error::{Chip8Error, Chip8Result},
    keypad::Keypad,
    vm::Hz,
};

/// Version of this crate.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        cpu::{Chip8Cpu, KeyWait, RunState},
        devices::{Devices, KeyCode},
        disasm::{Disassembler, Mnemonic},
        error::{Chip8Error, Chip8Result},
        vm::{check_program_size, Chip8Conf, Chip8Vm, Flow},
        Hz,
    };
}
