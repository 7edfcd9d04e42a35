// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the store instructions pop the value first and the destination
// reference second. every dereference null-checks, the checks live
// in the memory accessors of the thread context.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::{Trap, Value};

use super::HandleResult;

pub fn new(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let size = thread_context.get_param_u8()?;
    let address = thread_context.heap.allocate_cell(size as usize);
    thread_context.operand_stack.push(Value::Ref(Some(address)));
    Ok(HandleResult::Move(2))
}

pub fn imload(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let reference = thread_context.operand_stack.pop_ref()?;
    let value = thread_context.memory_load_i32(reference)?;
    thread_context.operand_stack.push(Value::Int(value));
    Ok(HandleResult::Move(1))
}

pub fn imstore(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let value = thread_context.operand_stack.pop_int()?;
    let reference = thread_context.operand_stack.pop_ref()?;
    thread_context.memory_store_i32(reference, value)?;
    Ok(HandleResult::Move(1))
}

pub fn amload(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let reference = thread_context.operand_stack.pop_ref()?;
    let loaded = thread_context.memory_load_reference(reference)?;
    thread_context.operand_stack.push(Value::Ref(loaded));
    Ok(HandleResult::Move(1))
}

pub fn amstore(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let value = thread_context.operand_stack.pop_ref()?;
    let reference = thread_context.operand_stack.pop_ref()?;
    thread_context.memory_store_reference(reference, value)?;
    Ok(HandleResult::Move(1))
}

pub fn cmload(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let reference = thread_context.operand_stack.pop_ref()?;
    // one byte, sign-extended
    let value = thread_context.memory_load_i8(reference)?;
    thread_context.operand_stack.push(Value::Int(value as i32));
    Ok(HandleResult::Move(1))
}

pub fn cmstore(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let value = thread_context.operand_stack.pop_int()?;
    let reference = thread_context.operand_stack.pop_ref()?;
    // the character type is 7-bit, the stored byte is masked
    thread_context.memory_store_u8(reference, (value & 0x7f) as u8)?;
    Ok(HandleResult::Move(1))
}

pub fn aaddf(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let field_offset = thread_context.get_param_u8()?;
    let reference = thread_context.operand_stack.pop_ref()?;
    let address = reference.ok_or_else(|| Trap::memory("null pointer dereference"))?;
    thread_context
        .operand_stack
        .push(Value::Ref(Some(address.add_offset(field_offset as u32))));
    Ok(HandleResult::Move(2))
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

    fn run(num_vars: u8, code: Vec<u8>) -> Result<i32, Trap> {
        let image = helper_build_image_with_single_function(num_vars, code);
        let native_table = NativeFunctionTable::new();
        execute(&image, &native_table)
    }

    #[test]
    fn test_process_new_imstore_imload() {
        // bytecodes
        //
        // 0x0000 NEW  4
        // 0x0002 DUP
        // 0x0003 BIPUSH  -99
        // 0x0005 IMSTORE
        // 0x0006 IMLOAD
        // 0x0007 RETURN
        let code = BytecodeWriter::new()
            .write_opcode_u8(Opcode::NEW, 4)
            .write_opcode(Opcode::DUP)
            .write_opcode_i8(Opcode::BIPUSH, -99)
            .write_opcode(Opcode::IMSTORE)
            .write_opcode(Opcode::IMLOAD)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(0, code).unwrap(), -99);
    }

    #[test]
    fn test_new_cells_are_zero_initialized() {
        // bytecodes
        //
        // 0x0000 NEW  4
        // 0x0002 IMLOAD
        // 0x0003 RETURN
        let code = BytecodeWriter::new()
            .write_opcode_u8(Opcode::NEW, 4)
            .write_opcode(Opcode::IMLOAD)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(0, code).unwrap(), 0);
    }

    #[test]
    fn test_imload_through_null_traps() {
        // bytecodes
        //
        // 0x0000 ACONST_NULL
        // 0x0001 IMLOAD
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::ACONST_NULL)
            .write_opcode(Opcode::IMLOAD)
            .to_bytes();

        assert_eq!(run(0, code).unwrap_err().kind, TrapKind::MemoryError);
    }

    #[test]
    fn test_store_instructions_null_check_the_destination() {
        // ACONST_NULL; BIPUSH 1; IMSTORE
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::ACONST_NULL)
            .write_opcode_i8(Opcode::BIPUSH, 1)
            .write_opcode(Opcode::IMSTORE)
            .to_bytes();
        assert_eq!(run(0, code).unwrap_err().kind, TrapKind::MemoryError);

        // ACONST_NULL; ACONST_NULL; AMSTORE, the destination is null
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::ACONST_NULL)
            .write_opcode(Opcode::ACONST_NULL)
            .write_opcode(Opcode::AMSTORE)
            .to_bytes();
        assert_eq!(run(0, code).unwrap_err().kind, TrapKind::MemoryError);
    }

    #[test]
    fn test_process_aaddf_field_access() {
        // a record cell { int at 0, int at 4 }, write both fields
        // through AADDF and read the second one back
        //
        // 0x0000 NEW  8
        // 0x0002 VSTORE  0
        // 0x0004 VLOAD  0
        // 0x0006 AADDF  0
        // 0x0008 BIPUSH  17
        // 0x000a IMSTORE
        // 0x000b VLOAD  0
        // 0x000d AADDF  4
        // 0x000f BIPUSH  29
        // 0x0011 IMSTORE
        // 0x0012 VLOAD  0
        // 0x0014 AADDF  4
        // 0x0016 IMLOAD
        // 0x0017 RETURN
        let code = BytecodeWriter::new()
            .write_opcode_u8(Opcode::NEW, 8)
            .write_opcode_u8(Opcode::VSTORE, 0)
            .write_opcode_u8(Opcode::VLOAD, 0)
            .write_opcode_u8(Opcode::AADDF, 0)
            .write_opcode_i8(Opcode::BIPUSH, 17)
            .write_opcode(Opcode::IMSTORE)
            .write_opcode_u8(Opcode::VLOAD, 0)
            .write_opcode_u8(Opcode::AADDF, 4)
            .write_opcode_i8(Opcode::BIPUSH, 29)
            .write_opcode(Opcode::IMSTORE)
            .write_opcode_u8(Opcode::VLOAD, 0)
            .write_opcode_u8(Opcode::AADDF, 4)
            .write_opcode(Opcode::IMLOAD)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(1, code).unwrap(), 29);
    }

    #[test]
    fn test_process_amstore_amload_aliasing() {
        // store a cell reference into a pointer field, load it back
        // through the alias and write through it
        //
        // 0x0000 NEW  4              ;; the target cell
        // 0x0002 VSTORE  0
        // 0x0004 NEW  8              ;; the holder cell
        // 0x0006 VSTORE  1
        // 0x0008 VLOAD  1
        // 0x000a VLOAD  0
        // 0x000c AMSTORE             ;; holder.ptr = target
        // 0x000d VLOAD  1
        // 0x000f AMLOAD              ;; an alias of target
        // 0x0010 BIPUSH  77
        // 0x0012 IMSTORE             ;; write through the alias
        // 0x0013 VLOAD  0
        // 0x0015 IMLOAD              ;; visible through the original
        // 0x0016 RETURN
        let code = BytecodeWriter::new()
            .write_opcode_u8(Opcode::NEW, 4)
            .write_opcode_u8(Opcode::VSTORE, 0)
            .write_opcode_u8(Opcode::NEW, 8)
            .write_opcode_u8(Opcode::VSTORE, 1)
            .write_opcode_u8(Opcode::VLOAD, 1)
            .write_opcode_u8(Opcode::VLOAD, 0)
            .write_opcode(Opcode::AMSTORE)
            .write_opcode_u8(Opcode::VLOAD, 1)
            .write_opcode(Opcode::AMLOAD)
            .write_opcode_i8(Opcode::BIPUSH, 77)
            .write_opcode(Opcode::IMSTORE)
            .write_opcode_u8(Opcode::VLOAD, 0)
            .write_opcode(Opcode::IMLOAD)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(2, code).unwrap(), 77);
    }

    #[test]
    fn test_amload_of_a_zeroed_slot_is_null() {
        // a fresh cell reads as null through AMLOAD
        //
        // 0x0000 NEW  8
        // 0x0002 AMLOAD
        // 0x0003 ACONST_NULL
        // 0x0004 IF_CMPEQ  +8    ;; -> 0x000c
        // 0x0007 BIPUSH  0
        // 0x0009 GOTO  +5        ;; -> 0x000e
        // 0x000c BIPUSH  1
        // 0x000e RETURN
        let code = BytecodeWriter::new()
            .write_opcode_u8(Opcode::NEW, 8)
            .write_opcode(Opcode::AMLOAD)
            .write_opcode(Opcode::ACONST_NULL)
            .write_opcode_offset(Opcode::IF_CMPEQ, 8)
            .write_opcode_i8(Opcode::BIPUSH, 0)
            .write_opcode_offset(Opcode::GOTO, 5)
            .write_opcode_i8(Opcode::BIPUSH, 1)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(0, code).unwrap(), 1);
    }

    #[test]
    fn test_process_cmstore_masks_to_seven_bits() {
        // bytecodes
        //
        // 0x0000 NEW  1
        // 0x0002 DUP
        // 0x0003 BIPUSH  -1     ;; 0xff, stored as 0x7f
        // 0x0005 CMSTORE
        // 0x0006 CMLOAD
        // 0x0007 RETURN
        let code = BytecodeWriter::new()
            .write_opcode_u8(Opcode::NEW, 1)
            .write_opcode(Opcode::DUP)
            .write_opcode_i8(Opcode::BIPUSH, -1)
            .write_opcode(Opcode::CMSTORE)
            .write_opcode(Opcode::CMLOAD)
            .write_opcode(Opcode::RETURN)
            .to_bytes();

        assert_eq!(run(0, code).unwrap(), 0x7f);
    }

    #[test]
    fn test_access_outside_the_cell_traps() {
        // the cell is 4 bytes, the load at offset 2 needs 4 more
        //
        // 0x0000 NEW  4
        // 0x0002 AADDF  2
        // 0x0004 IMLOAD
        let code = BytecodeWriter::new()
            .write_opcode_u8(Opcode::NEW, 4)
            .write_opcode_u8(Opcode::AADDF, 2)
            .write_opcode(Opcode::IMLOAD)
            .to_bytes();

        assert_eq!(run(0, code).unwrap_err().kind, TrapKind::MemoryError);
    }

    #[test]
    fn test_aaddf_through_null_traps() {
        // bytecodes
        //
        // 0x0000 ACONST_NULL
        // 0x0001 AADDF  4
        let code = BytecodeWriter::new()
            .write_opcode(Opcode::ACONST_NULL)
            .write_opcode_u8(Opcode::AADDF, 4)
            .to_bytes();

        assert_eq!(run(0, code).unwrap_err().kind, TrapKind::MemoryError);
    }
}
