//! CPU and memory state.
use crate::{
    bytecode::Opcode,
    constants::*,
    display::Display,
    error::{Chip8Error, Chip8Result},
    keypad::Keypad,
};

/// Execution state of the machine, as seen by the frame driver.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Running,
    /// Frames are skipped until resumed.
    Paused,
    /// Stopped by a fatal error. Only loading a new program leaves this state.
    Halted,
}

/// Progress of the `Fx0A` (`LD Vx, K`) instruction, which spans multiple steps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum KeyWait {
    /// No key has been captured yet.
    #[default]
    AwaitPress,
    /// The key was captured, and the instruction completes once it's released.
    AwaitRelease(u8),
}

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction to fetch.
    pub(crate) pc: Address,
    /// Stack pointer, the number of return addresses on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Switch tracking whether the buzzer was last reported on or off.
    pub(crate) buzzer_state: bool,
    /// Progress of a pending wait for keyboard input.
    pub(crate) key_wait: KeyWait,
    /// Keyboard input state.
    pub(crate) keypad: Keypad,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn to.
    pub(crate) display: Display,

    // ------------------------------------------------------------------------
    // Control
    pub(crate) state: RunState,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: MEM_START as Address,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            buzzer_state: false,
            key_wait: KeyWait::AwaitPress,
            keypad: Keypad::new(),

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Display::new(),

            state: RunState::Running,
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Erase the contents of the memory buffers `ram`, `stack` and `display`.
    pub(crate) fn clear_memory(&mut self) {
        self.ram.fill(0);
        self.stack.fill(0);
        self.display.clear();
    }

    /// Put registers back into their power-on state, ready to execute from [`MEM_START`].
    pub(crate) fn reset_registers(&mut self) {
        self.pc = MEM_START as Address;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.buzzer_state = false;
        self.key_wait = KeyWait::AwaitPress;
        self.state = RunState::Running;
    }

    /// Push a return address onto the call stack.
    ///
    /// `origin` is the address of the calling instruction, for error reporting.
    pub(crate) fn push_return(&mut self, ret: Address, origin: Address) -> Chip8Result<()> {
        if self.sp >= STACK_SIZE {
            return Err(self.halt_with(Chip8Error::StackOverflow { pc: origin }));
        }

        self.stack[self.sp] = ret;
        self.sp += 1;
        Ok(())
    }

    /// Pop the most recent return address off the call stack.
    pub(crate) fn pop_return(&mut self, origin: Address) -> Chip8Result<Address> {
        match self.sp.checked_sub(1) {
            Some(sp) => {
                self.sp = sp;
                Ok(self.stack[sp])
            }
            None => Err(self.halt_with(Chip8Error::StackUnderflow { pc: origin })),
        }
    }

    fn halt_with(&mut self, err: Chip8Error) -> Chip8Error {
        self.state = RunState::Halted;
        err
    }

    /// Count down both timers, stopping at zero.
    #[inline]
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Extract the instruction at the current program counter.
    #[inline(always)]
    pub fn instr(&self) -> Opcode {
        Opcode::fetch(&*self.ram, self.pc as usize & MEM_MASK)
    }

    #[inline(always)]
    pub(crate) fn read(&self, addr: usize) -> u8 {
        self.ram[addr & MEM_MASK]
    }

    #[inline(always)]
    pub(crate) fn write(&mut self, addr: usize, value: u8) {
        self.ram[addr & MEM_MASK] = value;
    }
}

/// Inspection
impl Chip8Cpu {
    pub fn pc(&self) -> Address {
        self.pc
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn register(&self, index: usize) -> u8 {
        self.registers[index & 0xF]
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    /// Address register `I`.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn key_wait(&self) -> KeyWait {
        self.key_wait
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn ram(&self) -> &[u8; MEM_SIZE] {
        &self.ram
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn state(&self) -> RunState {
        self.state
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stack_capacity() {
        let mut cpu = Chip8Cpu::new();

        for i in 0..STACK_SIZE {
            cpu.push_return(0x200 + i as Address * 2, 0x300).unwrap();
        }
        assert_eq!(cpu.sp, STACK_SIZE);

        let err = cpu.push_return(0x400, 0x300).unwrap_err();
        assert!(matches!(err, Chip8Error::StackOverflow { pc: 0x300 }));
        assert_eq!(cpu.state, RunState::Halted);
        assert_eq!(cpu.sp, STACK_SIZE, "failed push must not move the stack pointer");
    }

    #[test]
    fn test_stack_order() {
        let mut cpu = Chip8Cpu::new();

        cpu.push_return(0x202, 0x200).unwrap();
        cpu.push_return(0x302, 0x300).unwrap();
        assert_eq!(cpu.pop_return(0x400).unwrap(), 0x302);
        assert_eq!(cpu.pop_return(0x400).unwrap(), 0x202);

        let err = cpu.pop_return(0x400).unwrap_err();
        assert!(matches!(err, Chip8Error::StackUnderflow { pc: 0x400 }));
        assert_eq!(cpu.state, RunState::Halted);
    }

    #[test]
    fn test_timers_floor_at_zero() {
        let mut cpu = Chip8Cpu::new();
        cpu.delay_timer = 2;
        cpu.sound_timer = 1;

        cpu.tick_timers();
        assert_eq!(cpu.delay_timer, 1);
        assert_eq!(cpu.sound_timer, 0);

        cpu.tick_timers();
        cpu.tick_timers();
        assert_eq!(cpu.delay_timer, 0);
        assert_eq!(cpu.sound_timer, 0);
    }

    #[test]
    fn test_memory_access_wraps() {
        let mut cpu = Chip8Cpu::new();
        cpu.write(MEM_SIZE + 3, 0xAB);
        assert_eq!(cpu.ram[3], 0xAB);
        assert_eq!(cpu.read(MEM_SIZE + 3), 0xAB);
    }
}
