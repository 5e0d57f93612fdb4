use chip8::prelude::*;

const ROM: &[u8] = include_bytes!("../programs/maze");

#[test]
fn test_disassemble_maze() {
    let mut buf = String::new();
    Disassembler::new(ROM).disassemble_all(&mut buf).unwrap();

    let lines: Vec<&str> = buf.lines().collect();
    assert_eq!(lines.len(), ROM.len() / 2);
    assert_eq!(lines[0], "0200: A21E LD I, 0x21E");
    assert_eq!(lines[1], "0202: C201 RND V2, 0x01");
    assert_eq!(lines[4], "0208: D014 DRW V0, V1, 4");
    assert_eq!(lines[12], "0218: 1218 JP 0x218");
}
