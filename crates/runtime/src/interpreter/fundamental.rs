// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::Trap;

use super::HandleResult;

pub fn nop(_thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    Ok(HandleResult::Move(1))
}

pub fn pop(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    thread_context.operand_stack.pop()?;
    Ok(HandleResult::Move(1))
}

pub fn dup(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let value = thread_context.operand_stack.pop()?;
    thread_context.operand_stack.push(value);
    thread_context.operand_stack.push(value);
    Ok(HandleResult::Move(1))
}

pub fn swap(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let a = thread_context.operand_stack.pop()?;
    let b = thread_context.operand_stack.pop()?;
    thread_context.operand_stack.push(a);
    thread_context.operand_stack.push(b);
    Ok(HandleResult::Move(1))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use c0vm_image::bytecode_writer::BytecodeWriter;
    use c0vm_image::utils::helper_build_image_with_single_function;
    use c0vm_program::native_function::NativeFunctionTable;
    use c0vm_types::opcode::Opcode;
    use c0vm_types::{Trap, TrapKind};

    use crate::interpreter::execute;

    fn run(code: Vec<u8>) -> Result<i32, Trap> {
        let image = helper_build_image_with_single_function(0, code);
        let native_table = NativeFunctionTable::new();
        execute(&image, &native_table)
    }

    #[test]
    fn test_process_nop() {
        // bytecodes
        //
        // 0x0000 NOP
        // 0x0001 BIPUSH  9
        // 0x0003 RETURN
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::NOP)
            .write_opcode_i8(Opcode::BIPUSH, 9)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(code).unwrap(), 9);
    }

    #[test]
    fn test_process_pop() {
        // bytecodes
        //
        // 0x0000 BIPUSH  1
        // 0x0002 BIPUSH  2
        // 0x0004 POP
        // 0x0005 RETURN
        let code = BytecodeWriter::new()
            .write_opcode_i8(Opcode::BIPUSH, 1)
            .write_opcode_i8(Opcode::BIPUSH, 2)
            .write_opcode(Opcode::POP)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(code).unwrap(), 1);
    }

    #[test]
    fn test_process_dup() {
        // bytecodes
        //
        // 0x0000 BIPUSH  7
        // 0x0002 DUP
        // 0x0003 IADD
        // 0x0004 RETURN
        let code = BytecodeWriter::new()
            .write_opcode_i8(Opcode::BIPUSH, 7)
            .write_opcode(Opcode::DUP)
            .write_opcode(Opcode::IADD)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(code).unwrap(), 14);
    }

    #[test]
    fn test_process_swap() {
        // bytecodes
        //
        // 0x0000 BIPUSH  1
        // 0x0002 BIPUSH  2
        // 0x0004 SWAP        ;; [2 1]
        // 0x0005 ISUB        ;; 2 - 1
        // 0x0006 RETURN
        let code = BytecodeWriter::new()
            .write_opcode_i8(Opcode::BIPUSH, 1)
            .write_opcode_i8(Opcode::BIPUSH, 2)
            .write_opcode(Opcode::SWAP)
            .write_opcode(Opcode::ISUB)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(code).unwrap(), 1);
    }

    #[test]
    fn test_pop_on_an_empty_stack_is_fatal() {
        // bytecodes
        //
        // 0x0000 POP
        let code = BytecodeWriter::new().write_opcode(Opcode::POP).to_bytes();

        assert_eq!(run(code).unwrap_err().kind, TrapKind::Fatal);
    }
}
