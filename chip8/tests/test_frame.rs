use chip8::{constants::*, prelude::*, Chip8DisplayBuffer};

const MAZE: &[u8] = include_bytes!("../programs/maze");

/// Records what the VM presents to the host.
#[derive(Default)]
struct Recorder {
    frames: usize,
    lit: Vec<usize>,
    buzz: Vec<bool>,
}

impl Devices for Recorder {
    fn draw(&mut self, display: Chip8DisplayBuffer) {
        self.frames += 1;
        self.lit.push(display.iter().filter(|px| **px).count());
    }

    fn buzz(&mut self, state: bool) {
        self.buzz.push(state);
    }
}

fn vm_with(bytecode: &[u8]) -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf {
        instr_rate: Hz(DEFAULT_INSTR_RATE),
        seed: Some(1234),
    });
    vm.load_bytecode(bytecode).unwrap();
    vm
}

#[test]
fn test_instrs_per_frame() {
    let vm = vm_with(&[]);
    assert_eq!(vm.instrs_per_frame(), 700 / 60);

    let slow = Chip8Vm::new(Chip8Conf {
        instr_rate: Hz(30),
        seed: None,
    });
    assert_eq!(slow.instrs_per_frame(), 0);
}

/// Instructions run before the timer tick of the same frame.
#[test]
#[rustfmt::skip]
fn test_timer_ticks_after_instructions() {
    let mut vm = vm_with(&[
        0x60, 0x05, // LD V0, 5
        0xF0, 0x15, // LD DT, V0
        0x12, 0x04, // JP 0x204
    ]);

    vm.run_frame().unwrap();
    assert_eq!(vm.cpu().delay_timer(), 4);

    vm.run_frame().unwrap();
    assert_eq!(vm.cpu().delay_timer(), 3);

    for _ in 0..10 {
        vm.run_frame().unwrap();
    }
    assert_eq!(vm.cpu().delay_timer(), 0);
}

#[test]
#[rustfmt::skip]
fn test_buzzer_edges() {
    let mut vm = vm_with(&[
        0x60, 0x02, // LD V0, 2
        0xF0, 0x18, // LD ST, V0
        0x12, 0x04, // JP 0x204
    ]);
    let mut devices = Recorder::default();

    vm.frame(&mut devices).unwrap(); // ST 2 -> 1
    assert!(vm.is_buzzing());
    vm.frame(&mut devices).unwrap(); // ST 1 -> 0
    vm.frame(&mut devices).unwrap();

    assert_eq!(devices.buzz, vec![true, false]);
    assert_eq!(devices.frames, 3);
}

#[test]
fn test_pause_skips_frames() {
    let mut vm = vm_with(&[0x70, 0x01, 0x12, 0x00]); // ADD V0, 1 ; JP 0x200

    vm.pause();
    assert_eq!(vm.state(), RunState::Paused);
    assert_eq!(vm.run_frame().unwrap(), Flow::Interrupt);
    assert_eq!(vm.cpu().pc(), 0x200);

    vm.toggle_pause();
    assert_eq!(vm.state(), RunState::Running);
    vm.run_frame().unwrap();
    assert_ne!(vm.cpu().register(0), 0);
}

#[test]
fn test_fatal_error_stops_frames() {
    let mut vm = vm_with(&[0x00, 0xEE]); // RET

    let err = vm.run_frame().unwrap_err();
    assert!(matches!(err, Chip8Error::StackUnderflow { .. }));
    assert_eq!(vm.state(), RunState::Halted);
    assert_eq!(vm.run_frame().unwrap(), Flow::Interrupt);

    // Resuming a halted machine is not possible.
    vm.toggle_pause();
    assert_eq!(vm.state(), RunState::Halted);

    // Loading a program starts afresh.
    vm.load_bytecode(&[0x12, 0x00]).unwrap();
    assert_eq!(vm.state(), RunState::Running);
}

#[test]
fn test_maze() {
    let mut vm = vm_with(MAZE);
    let mut devices = Recorder::default();

    let mut drawn = false;
    for _ in 0..200 {
        drawn |= vm.frame(&mut devices).unwrap() == Flow::Draw;
    }

    assert!(drawn);
    assert_eq!(devices.frames, 200);

    // 16 x 8 cells, each a diagonal line of 4 pixels that never overlap.
    assert_eq!(vm.cpu().display().count_lit(), 16 * 8 * 4);
    assert_eq!(vm.cpu().register(0xF), 0);

    // Program ends in an infinite loop.
    assert_eq!(vm.cpu().pc(), 0x218);
    assert_eq!(devices.lit.last().copied(), Some(512));
}
