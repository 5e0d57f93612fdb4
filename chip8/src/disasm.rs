//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{bytecode::Opcode, constants::MEM_START};

pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    cursor: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            cursor: 0,
        }
    }

    pub fn print_bytecode(&mut self) -> fmt::Result {
        let mut s = String::new();
        self.disassemble_all(&mut s)?;
        println!("{}", s);
        Ok(())
    }

    /// Write every instruction in the bytecode to the given writer, one per line.
    ///
    /// A trailing odd byte is listed as data.
    pub fn disassemble_all<W: FmtWrite>(&mut self, w: &mut W) -> fmt::Result {
        self.cursor = 0;
        while self.cursor + 1 < self.bytecode.len() {
            self.disassemble(w)?;
            self.cursor += 2;
        }
        if self.cursor < self.bytecode.len() {
            let offset = MEM_START + self.cursor;
            writeln!(w, "{offset:04X}: {:02X}   DB 0x{:02X}", self.bytecode[self.cursor], self.bytecode[self.cursor])?;
        }
        self.cursor = 0;
        Ok(())
    }

    /// Write a single instruction to the given writer.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        let op = Opcode::fetch(self.bytecode, self.cursor);
        let offset = MEM_START + self.cursor;
        writeln!(w, "{offset:04X}: {op} {}", Mnemonic(op))
    }
}

/// Assembly text of a single instruction.
#[derive(Debug, Clone, Copy)]
pub struct Mnemonic(pub Opcode);

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.0;
        let (x, y, n, nn, nnn) = (op.x(), op.y(), op.n(), op.nn(), op.nnn());

        match op.class() {
            0x0 => match nnn {
                0x0E0 => write!(f, "CLS"),
                0x0EE => write!(f, "RET"),
                _ => write!(f, "SYS 0x{nnn:03X}"),
            },
            0x1 => write!(f, "JP 0x{nnn:03X}"),
            0x2 => write!(f, "CALL 0x{nnn:03X}"),
            0x3 => write!(f, "SE V{x:X}, 0x{nn:02X}"),
            0x4 => write!(f, "SNE V{x:X}, 0x{nn:02X}"),
            0x5 => write!(f, "SE V{x:X}, V{y:X}"),
            0x6 => write!(f, "LD V{x:X}, 0x{nn:02X}"),
            0x7 => write!(f, "ADD V{x:X}, 0x{nn:02X}"),
            0x8 => match n {
                0x0 => write!(f, "LD V{x:X}, V{y:X}"),
                0x1 => write!(f, "OR V{x:X}, V{y:X}"),
                0x2 => write!(f, "AND V{x:X}, V{y:X}"),
                0x3 => write!(f, "XOR V{x:X}, V{y:X}"),
                0x4 => write!(f, "ADD V{x:X}, V{y:X}"),
                0x5 => write!(f, "SUB V{x:X}, V{y:X}"),
                0x6 => write!(f, "SHR V{x:X}"),
                0x7 => write!(f, "SUBN V{x:X}, V{y:X}"),
                0xE => write!(f, "SHL V{x:X}"),
                _ => write!(f, "???"),
            },
            0x9 => write!(f, "SNE V{x:X}, V{y:X}"),
            0xA => write!(f, "LD I, 0x{nnn:03X}"),
            0xB => write!(f, "JP V0, 0x{nnn:03X}"),
            0xC => write!(f, "RND V{x:X}, 0x{nn:02X}"),
            0xD => write!(f, "DRW V{x:X}, V{y:X}, {n}"),
            0xE => match nn {
                0x9E => write!(f, "SKP V{x:X}"),
                0xA1 => write!(f, "SKNP V{x:X}"),
                _ => write!(f, "???"),
            },
            0xF => match nn {
                0x07 => write!(f, "LD V{x:X}, DT"),
                0x0A => write!(f, "LD V{x:X}, K"),
                0x15 => write!(f, "LD DT, V{x:X}"),
                0x18 => write!(f, "LD ST, V{x:X}"),
                0x1E => write!(f, "ADD I, V{x:X}"),
                0x29 => write!(f, "LD F, V{x:X}"),
                0x33 => write!(f, "LD B, V{x:X}"),
                0x55 => write!(f, "LD [I], V{x:X}"),
                0x65 => write!(f, "LD V{x:X}, [I]"),
                _ => write!(f, "???"),
            },
            _ => unreachable!("opcode class is a single nibble"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mnemonic(word: u16) -> String {
        Mnemonic(Opcode(word)).to_string()
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(mnemonic(0x00E0), "CLS");
        assert_eq!(mnemonic(0x00EE), "RET");
        assert_eq!(mnemonic(0x0123), "SYS 0x123");
        assert_eq!(mnemonic(0x1ABC), "JP 0xABC");
        assert_eq!(mnemonic(0x2ABC), "CALL 0xABC");
        assert_eq!(mnemonic(0x3A42), "SE VA, 0x42");
        assert_eq!(mnemonic(0x8124), "ADD V1, V2");
        assert_eq!(mnemonic(0x8126), "SHR V1");
        assert_eq!(mnemonic(0x812E), "SHL V1");
        assert_eq!(mnemonic(0x8128), "???");
        assert_eq!(mnemonic(0xB300), "JP V0, 0x300");
        assert_eq!(mnemonic(0xD125), "DRW V1, V2, 5");
        assert_eq!(mnemonic(0xE39E), "SKP V3");
        assert_eq!(mnemonic(0xE3A1), "SKNP V3");
        assert_eq!(mnemonic(0xE3FF), "???");
        assert_eq!(mnemonic(0xF40A), "LD V4, K");
        assert_eq!(mnemonic(0xF455), "LD [I], V4");
        assert_eq!(mnemonic(0xF465), "LD V4, [I]");
        assert_eq!(mnemonic(0xF4FF), "???");
    }

    #[test]
    fn test_listing() {
        #[rustfmt::skip]
        let bytecode = [
            0x60, 0x05, // LD V0, 0x05
            0x12, 0x00, // JP 0x200
            0xAB,       // stray byte
        ];
        let mut buf = String::new();
        Disassembler::new(&bytecode)
            .disassemble_all(&mut buf)
            .unwrap();

        let lines: Vec<&str> = buf.lines().collect();
        assert_eq!(
            lines,
            vec![
                "0200: 6005 LD V0, 0x05",
                "0202: 1200 JP 0x200",
                "0204: AB   DB 0xAB",
            ]
        );
    }
}
