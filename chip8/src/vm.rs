//! Virtual machine.
use std::{
    fmt::{self, Write},
    path::Path,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    bytecode::Opcode,
    constants::*,
    cpu::{Chip8Cpu, KeyWait, RunState},
    devices::{Devices, KeyCode},
    disasm::Mnemonic,
    display::Chip8DisplayBuffer,
    error::{Chip8Error, Chip8Result},
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    /// Source of randomness for `Cxnn` (`RND Vx, byte`).
    rng: StdRng,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let seed = conf.seed.unwrap_or_else(time_seed);
        log::debug!("random seed: {seed}");

        let mut vm = Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng: StdRng::seed_from_u64(seed),
            conf,
        };
        vm.load_builtin_font();
        vm
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Number of instructions executed in one 60Hz frame.
    pub fn instrs_per_frame(&self) -> u64 {
        self.conf.instr_rate.0 / DELAY_FREQUENCY
    }

    pub fn load_builtin_font(&mut self) {
        self.load_font(&FONTSET)
    }

    pub fn load_font(&mut self, fontset: &[u8; FONTSET_DATA_LENGTH]) {
        let start = FONTSET_START as usize;
        self.cpu.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(fontset);
    }

    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
                max: MAX_PROGRAM_SIZE,
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.cpu.clear_memory();

        // Reset fonts
        self.load_builtin_font();

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        // Reset the program counter to prepare for execution.
        self.cpu.reset_registers();

        log::debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Read a ROM image from the file system and load it.
    pub fn load_file(&mut self, filepath: impl AsRef<Path>) -> Chip8Result<()> {
        let bytecode = std::fs::read(filepath.as_ref())?;
        self.load_bytecode(&bytecode)
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer {
        self.cpu.display.buffer()
    }

    /// Read-only access to the machine state.
    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }
}

/// Check whether the program fits in the memory above [`MEM_START`].
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MAX_PROGRAM_SIZE
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// The machine is paused or halted, and did not execute.
    Interrupt,
    /// Program counter has jumped to a new address.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer was changed.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed and released, and loads the key value into `Vx`.
    KeyWait,
    /// The instruction is not recognised and was skipped.
    Unsupported,
}

/// VM Configuration Parameters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Chip8Conf {
    /// Number of instructions executed per second.
    pub instr_rate: Hz,
    /// Seed for the random number generator.
    ///
    /// When not given, a seed is derived from the system clock.
    pub seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            instr_rate: Hz(DEFAULT_INSTR_RATE),
            seed: None,
        }
    }
}

/// Frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(transparent))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Host control
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.keypad.set(key.as_u8(), pressed);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.keypad.clear()
    }

    pub fn state(&self) -> RunState {
        self.cpu.state
    }

    pub fn pause(&mut self) {
        if self.cpu.state == RunState::Running {
            log::debug!("paused");
            self.cpu.state = RunState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.cpu.state == RunState::Paused {
            log::debug!("resumed");
            self.cpu.state = RunState::Running;
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.cpu.state {
            RunState::Running => self.pause(),
            RunState::Paused => self.resume(),
            RunState::Halted => {}
        }
    }

    /// Stop the machine. Only loading a new program restarts it.
    pub fn halt(&mut self) {
        self.cpu.state = RunState::Halted;
    }

    /// Whether the buzzer should be sounding.
    pub fn is_buzzing(&self) -> bool {
        self.cpu.sound_timer > 0
    }
}

/// Frame driver
impl Chip8Vm {
    /// Count down the delay and sound timers.
    ///
    /// Must be called at 60Hz, independent of the instruction rate.
    pub fn tick_timers(&mut self) {
        self.cpu.tick_timers();
    }

    /// Run one 60Hz frame: the configured number of instructions, then one timer tick.
    ///
    /// Returns [`Flow::Draw`] if the display changed during the frame, and
    /// [`Flow::Interrupt`] without doing anything when the machine isn't running.
    pub fn run_frame(&mut self) -> Chip8Result<Flow> {
        if self.cpu.state != RunState::Running {
            return Ok(Flow::Interrupt);
        }

        let mut control_flow = Flow::Ok;

        for _ in 0..self.instrs_per_frame() {
            if self.step()? == Flow::Draw {
                control_flow = Flow::Draw;
            }
        }

        self.tick_timers();

        Ok(control_flow)
    }

    /// Run one frame and present the result to the output devices.
    pub fn frame(&mut self, devices: &mut dyn Devices) -> Chip8Result<Flow> {
        let control_flow = self.run_frame()?;

        // Buzzer should be on while sound timer counts down,
        // then turned off when the timer reaches zero.
        let buzzing = self.is_buzzing();
        if buzzing != self.cpu.buzzer_state {
            self.cpu.buzzer_state = buzzing;
            devices.buzz(buzzing);
        }

        devices.draw(self.display_buffer());

        Ok(control_flow)
    }

    /// Execute a fixed number of instructions, regardless of the run state.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut control_flow = Flow::Ok;

        for _ in 0..step_count {
            control_flow = self.step()?;
        }

        Ok(control_flow)
    }
}

/// Interpreter
impl Chip8Vm {
    /// Fetch, decode and execute a single instruction.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        if self.cpu.state == RunState::Halted {
            return Err(Chip8Error::Halted);
        }

        let origin = self.cpu.pc;
        let op = self.cpu.instr();
        log::trace!("{origin:04X}: {op} {}", Mnemonic(op));

        // Each instruction is two bytes, with the opcode identity in the first 4-bit nibble.
        let vx = op.x() as usize;
        let vy = op.y() as usize;
        let nn = op.nn();
        let nnn = op.nnn();

        // Advance before executing, so jumps overwrite the default.
        self.cpu.pc = origin.wrapping_add(2);

        let control_flow = match op.class() {
            // Miscellaneous instructions identified by nn
            0x0 | 0xE | 0xF => self.exec_misc(op, origin)?,
            // 1NNN (JP addr)
            //
            // Jump to address.
            0x1 => {
                self.cpu.pc = nnn;
                Flow::Jump
            }
            // 2NNN (CALL addr)
            //
            // Call subroutine at NNN.
            0x2 => {
                self.cpu.push_return(self.cpu.pc, origin)?;
                self.cpu.pc = nnn;
                Flow::Jump
            }
            // 3XNN (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            0x3 => self.skip_if(self.cpu.registers[vx] == nn),
            // 4XNN (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            0x4 => self.skip_if(self.cpu.registers[vx] != nn),
            // 5XY0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals value VY.
            0x5 => self.skip_if(self.cpu.registers[vx] == self.cpu.registers[vy]),
            // 6XNN (LD Vx, byte)
            //
            // Set register VX to value NN.
            0x6 => {
                self.cpu.registers[vx] = nn;
                Flow::Ok
            }
            // 7XNN (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            0x7 => {
                self.cpu.registers[vx] = self.cpu.registers[vx].wrapping_add(nn);
                Flow::Ok
            }
            // Arithmetic instructions identified by n
            0x8 => self.exec_math(op, origin),
            // 9XY0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            0x9 => self.skip_if(self.cpu.registers[vx] != self.cpu.registers[vy]),
            // ANNN (LD I, addr)
            //
            // Set address register I to value NNN.
            0xA => {
                self.cpu.address = nnn;
                Flow::Ok
            }
            // BNNN (JP V0, addr)
            //
            // Jump to address NNN offset by register V0.
            0xB => {
                self.cpu.pc = nnn + self.cpu.registers[0] as Address;
                Flow::Jump
            }
            // CXNN (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random byte and NN.
            0xC => {
                self.cpu.registers[vx] = nn & self.rng.gen::<u8>();
                Flow::Ok
            }
            // DXYN (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
            // Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // If the drawing operation erases existing pixels in the display buffer, register VF is set to
            // 1, and set to 0 if no display bits are unset. This is used for collision detection.
            0xD => {
                let (x, y) = (self.cpu.registers[vx], self.cpu.registers[vy]);
                let addr = self.cpu.address as usize;
                let ram = &self.cpu.ram;
                let rows = (0..op.n() as usize).map(|r| ram[(addr + r) & MEM_MASK]);

                let is_erased = self.cpu.display.draw_sprite(x, y, rows);

                // If a pixel was erased, then a collision occurred.
                self.cpu.registers[FLAG_REGISTER] = is_erased as u8;
                Flow::Draw
            }
            _ => unreachable!("opcode class is a single nibble"),
        };

        Ok(control_flow)
    }

    /// Skip the next instruction when the condition holds.
    #[inline]
    fn skip_if(&mut self, condition: bool) -> Flow {
        if condition {
            self.cpu.pc = self.cpu.pc.wrapping_add(2);
        }
        Flow::Ok
    }

    fn unsupported(&self, op: Opcode, origin: Address) -> Flow {
        log::warn!("unsupported opcode {op} at {origin:04X}");
        Flow::Unsupported
    }

    /// Execute an arithmetic instruction
    ///
    /// Instructions that set VF write the result to VX first, so when
    /// VX is VF the flag takes precedence.
    #[inline]
    #[must_use]
    fn exec_math(&mut self, op: Opcode, origin: Address) -> Flow {
        debug_assert_eq!(op.class(), 0x8);

        let (vx, vy) = (op.x() as usize, op.y() as usize);
        let (x, y) = (self.cpu.registers[vx], self.cpu.registers[vy]);

        let (result, flag) = match op.n() {
            // 8XY0 (LD Vx, Vy)
            //
            // Store the value of register VY in register VX.
            0x0 => (y, None),
            // 8XY1 (OR Vx, Vy)
            0x1 => (x | y, None),
            // 8XY2 (AND Vx, Vy)
            0x2 => (x & y, None),
            // 8XY3 (XOR Vx, Vy)
            0x3 => (x ^ y, None),
            // 8XY4 (ADD Vx, Vy)
            //
            // Overflow is wrapped. If overflow, set VF to 1, else 0.
            0x4 => {
                let (result, carry) = x.overflowing_add(y);
                (result, Some(carry as u8))
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            0x5 => {
                let (result, borrow) = x.overflowing_sub(y);
                (result, Some(!borrow as u8))
            }
            // 8XY6 (SHR Vx)
            //
            // The least-significant bit of Vx is shifted out into VF.
            // VY is unused.
            0x6 => (x >> 1, Some(x & 1)),
            // 8XY7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            0x7 => {
                let (result, borrow) = y.overflowing_sub(x);
                (result, Some(!borrow as u8))
            }
            // 8XYE (SHL Vx)
            //
            // The most-significant bit of Vx is shifted out into VF.
            // VY is unused.
            0xE => (x << 1, Some(x >> 7)),
            // ----------------------------------------------------------------
            // Unsupported operation.
            _ => return self.unsupported(op, origin),
        };

        self.cpu.registers[vx] = result;
        if let Some(flag) = flag {
            self.cpu.registers[FLAG_REGISTER] = flag;
        }

        Flow::Ok
    }

    /// Execute a miscellaneous instruction
    #[inline]
    fn exec_misc(&mut self, op: Opcode, origin: Address) -> Chip8Result<Flow> {
        let vx = op.x() as usize;

        let control_flow = match (op.class(), op.nn()) {
            // ----------------------------------------------------------------
            // 00E0 (CLS)
            //
            // Clear display
            (0x0, 0xE0) if op.x() == 0 => {
                self.cpu.display.clear();
                Flow::Draw
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Set the program counter to the value at the top of the stack.
            (0x0, 0xEE) if op.x() == 0 => {
                self.cpu.pc = self.cpu.pop_return(origin)?;
                Flow::Jump
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            //
            // Skip next instruction if the key with the value of Vx is pressed.
            (0xE, 0x9E) => self.skip_if(self.cpu.keypad.is_pressed(self.cpu.registers[vx])),
            // ExA1 (SKNP Vx)
            //
            // Skip next instruction if the key with the value of Vx is not pressed.
            (0xE, 0xA1) => self.skip_if(!self.cpu.keypad.is_pressed(self.cpu.registers[vx])),
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            (0xF, 0x07) => {
                self.cpu.registers[vx] = self.cpu.delay_timer;
                Flow::Ok
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // The instruction repeats until a key is pressed and released again.
            (0xF, 0x0A) => self.exec_key_wait(vx, origin),
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            (0xF, 0x15) => {
                self.cpu.delay_timer = self.cpu.registers[vx];
                Flow::Ok
            }
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            (0xF, 0x18) => {
                self.cpu.sound_timer = self.cpu.registers[vx];
                Flow::Sound
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I
            (0xF, 0x1E) => {
                let x = self.cpu.registers[vx] as Address;
                self.cpu.address = self.cpu.address.wrapping_add(x);
                Flow::Ok
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            (0xF, 0x29) => {
                let x = self.cpu.registers[vx] as Address;
                self.cpu.address = FONTSET_START + x * FONTSET_HEIGHT as Address;
                Flow::Ok
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            (0xF, 0x33) => {
                let addr = self.cpu.address as usize;
                let x = self.cpu.registers[vx];
                self.cpu.write(addr,     x / 100);
                self.cpu.write(addr + 1, x / 10 % 10);
                self.cpu.write(addr + 2, x      % 10);
                Flow::Ok
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            // I is left unchanged.
            (0xF, 0x55) => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx {
                    self.cpu.write(addr + v, self.cpu.registers[v]);
                }
                Flow::Ok
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            // I is left unchanged.
            (0xF, 0x65) => {
                let addr = self.cpu.address as usize;
                for v in 0..=vx {
                    self.cpu.registers[v] = self.cpu.read(addr + v);
                }
                Flow::Ok
            }
            // ----------------------------------------------------------------
            // Unsupported operation, including 0NNN (SYS addr).
            _ => self.unsupported(op, origin),
        };

        Ok(control_flow)
    }

    /// Fx0A (LD Vx, K)
    ///
    /// Blocking is realised by rewinding the program counter, so the
    /// instruction is executed again on the next step.
    fn exec_key_wait(&mut self, vx: usize, origin: Address) -> Flow {
        match self.cpu.key_wait {
            KeyWait::AwaitPress => {
                if let Some(key) = self.cpu.keypad.first_pressed() {
                    log::debug!("key wait captured k{key:x}");
                    self.cpu.key_wait = KeyWait::AwaitRelease(key);
                }
                // The captured key still has to be released.
                self.cpu.pc = origin;
                Flow::KeyWait
            }
            KeyWait::AwaitRelease(key) => {
                if self.cpu.keypad.is_pressed(key) {
                    self.cpu.pc = origin;
                    Flow::KeyWait
                } else {
                    log::debug!("key wait released k{key:x}");
                    self.cpu.registers[vx] = key;
                    self.cpu.key_wait = KeyWait::AwaitPress;
                    Flow::Ok
                }
            }
        }
    }
}

/// Troubleshooting
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the contents of the memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, self.cpu.read(i + 1))?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        self.cpu.display.dump()
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        self.cpu.keypad.dump()
    }

    pub fn dump_registers(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        write!(
            buf,
            "PC={:04X} I={:04X} SP={} DT={} ST={}",
            self.cpu.pc, self.cpu.address, self.cpu.sp, self.cpu.delay_timer, self.cpu.sound_timer
        )?;
        for (i, v) in self.cpu.registers.iter().enumerate() {
            write!(buf, " V{i:X}={v:02X}")?;
        }

        Ok(buf)
    }
}
