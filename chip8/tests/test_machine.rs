use chip8::{constants::*, prelude::*};

fn vm_with(bytecode: &[u8]) -> Chip8Vm {
    let mut vm = Chip8Vm::new(Chip8Conf {
        seed: Some(42),
        ..Chip8Conf::default()
    });
    vm.load_bytecode(bytecode).unwrap();
    vm
}

#[test]
fn test_program_bounds() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());

    assert!(check_program_size(&vec![0; MAX_PROGRAM_SIZE]));
    assert!(!check_program_size(&vec![0; MAX_PROGRAM_SIZE + 1]));

    let mut rom = vec![0; MEM_SIZE - MEM_START];
    *rom.last_mut().unwrap() = 0xAA;
    vm.load_bytecode(&rom).unwrap();
    assert_eq!(vm.cpu().ram()[MEM_SIZE - 1], 0xAA);

    let err = vm.load_bytecode(&vec![0; MEM_SIZE - MEM_START + 1]).unwrap_err();
    assert!(matches!(err, Chip8Error::LargeProgram { .. }));
    assert!(!err.is_fatal());
}

#[test]
fn test_missing_file() {
    let mut vm = Chip8Vm::new(Chip8Conf::default());
    let err = vm
        .load_file("this/rom/does/not/exist.ch8")
        .unwrap_err();
    assert!(matches!(err, Chip8Error::Io(_)));
}

#[test]
fn test_reload_clears_previous_program() {
    let mut vm = vm_with(&[0x60, 0x01, 0x61, 0x02, 0x62, 0x03]);
    vm.run_steps(3).unwrap();

    vm.load_bytecode(&[0x12, 0x00]).unwrap();
    assert_eq!(vm.cpu().registers(), &[0; REGISTER_COUNT]);
    assert_eq!(&vm.cpu().ram()[MEM_START..MEM_START + 4], &[0x12, 0x00, 0x00, 0x00]);
    assert_eq!(vm.cpu().pc(), MEM_START as u16);
}

/// Every glyph of the builtin font can be drawn through `Fx29`.
#[test]
#[rustfmt::skip]
fn test_font_glyphs() {
    for digit in 0..16u8 {
        let mut vm = vm_with(&[
            0x60, digit, // LD V0, digit
            0xF0, 0x29,  // LD F, V0
            0x61, 0x00,  // LD V1, 0
            0xD1, 0x15,  // DRW V1, V1, 5
        ]);
        vm.run_steps(4).unwrap();

        assert_eq!(vm.cpu().address(), digit as u16 * 5);

        let start = digit as usize * FONTSET_HEIGHT;
        let glyph = &FONTSET[start..start + FONTSET_HEIGHT];
        for (y, row) in glyph.iter().enumerate() {
            for x in 0..8 {
                let expected = row & (0x80 >> x) != 0;
                assert_eq!(vm.cpu().display().pixel(x, y), expected, "digit {digit:X} at ({x}, {y})");
            }
        }
    }
}

/// Self-modifying code: a program may overwrite its own instructions.
#[test]
#[rustfmt::skip]
fn test_self_modifying_code() {
    let mut vm = vm_with(&[
        0x60, 0x63, // 200: LD V0, 0x63
        0x61, 0x07, // 202: LD V1, 0x07
        0xA2, 0x0A, // 204: LD I, 0x20A
        0xF1, 0x55, // 206: LD [I], V1
        0x00, 0x00, // 208:
        0x00, 0x00, // 20A: becomes LD V3, 0x07
    ]);
    vm.run_steps(4).unwrap();

    // The unsupported SYS at 0x208 is skipped.
    assert_eq!(vm.step().unwrap(), Flow::Unsupported);
    vm.step().unwrap();
    assert_eq!(vm.cpu().register(3), 0x07);
}

#[test]
fn test_key_wait_through_frames() {
    let mut vm = vm_with(&[0xF4, 0x0A, 0x12, 0x02]); // LD V4, K ; JP 0x202

    for _ in 0..3 {
        vm.run_frame().unwrap();
        assert_eq!(vm.cpu().pc(), 0x200);
    }

    vm.set_key(KeyCode::KeyE, true);
    vm.run_frame().unwrap();
    assert_eq!(vm.cpu().key_wait(), KeyWait::AwaitRelease(0xE));
    assert_eq!(vm.cpu().pc(), 0x200);

    vm.set_key(KeyCode::KeyE, false);
    vm.run_frame().unwrap();
    assert_eq!(vm.cpu().register(4), 0xE);
    assert_eq!(vm.cpu().pc(), 0x202);
}

#[test]
fn test_dumps() {
    let mut vm = vm_with(&[0x6A, 0xBC]);
    vm.step().unwrap();
    vm.set_key(KeyCode::Key1, true);

    assert_eq!(vm.dump_ram(2).unwrap(), "0200: 6ABC\n");
    assert_eq!(vm.dump_keys().unwrap(), "keys: k1");

    let registers = vm.dump_registers().unwrap();
    assert!(registers.starts_with("PC=0202 I=0000 SP=0"));
    assert!(registers.contains("VA=BC"));
}
