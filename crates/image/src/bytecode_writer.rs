// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use c0vm_types::opcode::Opcode;

/// builds a code array instruction by instruction.
///
/// every writer method emits exactly the instruction length the
/// decoder consumes, so code built here always satisfies the
/// encoding contract.
pub struct BytecodeWriter {
    buffer: Vec<u8>, // trait std::io::Write
}

impl BytecodeWriter {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            buffer: Vec::<u8>::new(),
        }
    }

    fn start_opcode(mut self, opcode: Opcode) -> Self {
        // writes into a Vec cannot fail
        self.buffer.write_all(&[opcode as u8]).unwrap();
        self
    }

    /// 1-byte instruction
    /// [opcode]
    pub fn write_opcode(self, opcode: Opcode) -> Self {
        self.start_opcode(opcode)
    }

    /// 2-byte instruction
    /// [opcode + signed byte], e.g. BIPUSH
    pub fn write_opcode_i8(self, opcode: Opcode, value: i8) -> Self {
        let mut new_self = self.start_opcode(opcode);
        new_self.buffer.write_i8(value).unwrap();
        new_self
    }

    /// 2-byte instruction
    /// [opcode + unsigned byte], e.g. VLOAD, NEW, NEWARRAY, AADDF
    pub fn write_opcode_u8(self, opcode: Opcode, value: u8) -> Self {
        let mut new_self = self.start_opcode(opcode);
        new_self.buffer.write_u8(value).unwrap();
        new_self
    }

    /// 3-byte instruction
    /// [opcode + big-endian u16], e.g. ILDC, INVOKESTATIC
    pub fn write_opcode_u16(self, opcode: Opcode, value: u16) -> Self {
        let mut new_self = self.start_opcode(opcode);
        new_self.buffer.write_u16::<BigEndian>(value).unwrap();
        new_self
    }

    /// 3-byte instruction
    /// [opcode + big-endian signed 16-bit offset], e.g. GOTO.
    /// the offset is relative to the pc of the opcode byte.
    pub fn write_opcode_offset(self, opcode: Opcode, offset: i16) -> Self {
        let mut new_self = self.start_opcode(opcode);
        new_self.buffer.write_i16::<BigEndian>(offset).unwrap();
        new_self
    }

    /// the pc the next written opcode byte will land on,
    /// for computing branch offsets while building code.
    pub fn address(&self) -> usize {
        self.buffer.len()
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
