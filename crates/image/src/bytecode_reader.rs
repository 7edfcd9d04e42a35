// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use byteorder::{BigEndian, ByteOrder};
use c0vm_types::opcode::Opcode;

/// render a code array one instruction per line, e.g.
///
/// 0x0000  BIPUSH  3
/// 0x0002  NEWARRAY  4
/// 0x0004  DUP
///
/// bytes that decode to no instruction are printed raw, one per
/// line, so the reader resynchronizes on the next valid opcode.
pub fn format_bytecode_as_text(code: &[u8]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut offset = 0;

    while offset < code.len() {
        let opcode = match Opcode::from_u8(code[offset]) {
            Some(opcode) => opcode,
            None => {
                lines.push(format!("0x{:04x}  0x{:02x} ?", offset, code[offset]));
                offset += 1;
                continue;
            }
        };

        let length = opcode.length_in_bytes();
        if offset + length > code.len() {
            lines.push(format!("0x{:04x}  {:?} <truncated>", offset, opcode));
            break;
        }

        let line = match (opcode, length) {
            (Opcode::BIPUSH, _) => {
                format!("0x{:04x}  {:?}  {}", offset, opcode, code[offset + 1] as i8)
            }
            (_, 2) => format!("0x{:04x}  {:?}  {}", offset, opcode, code[offset + 1]),
            (
                Opcode::GOTO
                | Opcode::IF_CMPEQ
                | Opcode::IF_CMPNE
                | Opcode::IF_ICMPLT
                | Opcode::IF_ICMPGE
                | Opcode::IF_ICMPGT
                | Opcode::IF_ICMPLE,
                _,
            ) => {
                let branch_offset = BigEndian::read_i16(&code[offset + 1..offset + 3]);
                let target = offset as isize + branch_offset as isize;
                format!(
                    "0x{:04x}  {:?}  {:+}  ; 0x{:04x}",
                    offset, opcode, branch_offset, target
                )
            }
            (_, 3) => {
                let index = BigEndian::read_u16(&code[offset + 1..offset + 3]);
                format!("0x{:04x}  {:?}  {}", offset, opcode, index)
            }
            _ => format!("0x{:04x}  {:?}", offset, opcode),
        };
        lines.push(line);
        offset += length;
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use c0vm_types::opcode::Opcode;

    use crate::bytecode_reader::format_bytecode_as_text;
    use crate::bytecode_writer::BytecodeWriter;

    #[test]
    fn test_format_instructions() {
        let code = BytecodeWriter::new()
            .write_opcode_i8(Opcode::BIPUSH, -3)
            .write_opcode_u16(Opcode::ILDC, 7)
            .write_opcode_offset(Opcode::GOTO, -5)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        let text = format_bytecode_as_text(&code);
        assert_eq!(
            text,
            "0x0000  BIPUSH  -3\n\
             0x0002  ILDC  7\n\
             0x0005  GOTO  -5  ; 0x0000\n\
             0x0008  RETURN"
        );
    }

    #[test]
    fn test_format_invalid_and_truncated_bytes() {
        // 0xc0 is the first tagged-pointer extension opcode, unsupported
        let text = format_bytecode_as_text(&[0xc0, 0x10]);
        assert_eq!(text, "0x0000  0xc0 ?\n0x0001  BIPUSH <truncated>");
    }
}
