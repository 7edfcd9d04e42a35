// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_image::bytecode_image::BytecodeImage;
use c0vm_image::bytecode_reader::format_bytecode_as_text;
use c0vm_program::native_function::NativeFunctionTable;
use c0vm_program::thread_context::ThreadContext;
use c0vm_types::opcode::{Opcode, MAX_OPCODE_NUMBER};
use c0vm_types::Trap;

pub type HandleFunc = fn(&mut ThreadContext) -> Result<HandleResult, Trap>;

mod arithmetic;
mod array;
mod assertion;
mod calling;
mod control_flow;
mod fundamental;
mod immediate;
mod local;
mod memory;

pub enum HandleResult {
    // advance the pc by the instruction width
    // param (increment_in_bytes: usize)
    Move(usize),

    // set the pc to an absolute address: a branch target within the
    // current function, or address 0 / the resume address after the
    // call handlers switched frames
    // param (instruction_address: usize)
    Jump(usize),

    // the entry function returned
    // param (exit_value: i32)
    End(i32),
}

fn unsupported(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let opcode_byte = thread_context.get_opcode_byte()?;
    Err(Trap::fatal(format!(
        "invalid opcode 0x{:02x} at 0x{:04x} in function {}\n{}",
        opcode_byte,
        thread_context.pc,
        thread_context.function_index,
        format_bytecode_as_text(thread_context.code())
    )))
}

pub struct Handler {
    handlers: [HandleFunc; MAX_OPCODE_NUMBER],
}

impl Handler {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let mut handlers: [HandleFunc; MAX_OPCODE_NUMBER] = [unsupported; MAX_OPCODE_NUMBER];

        // operand stack
        handlers[Opcode::NOP as usize] = fundamental::nop;
        handlers[Opcode::POP as usize] = fundamental::pop;
        handlers[Opcode::DUP as usize] = fundamental::dup;
        handlers[Opcode::SWAP as usize] = fundamental::swap;

        // constants
        handlers[Opcode::BIPUSH as usize] = immediate::bipush;
        handlers[Opcode::ILDC as usize] = immediate::ildc;
        handlers[Opcode::ALDC as usize] = immediate::aldc;
        handlers[Opcode::ACONST_NULL as usize] = immediate::aconst_null;

        // arithmetic, logic and shifts
        handlers[Opcode::IADD as usize] = arithmetic::iadd;
        handlers[Opcode::ISUB as usize] = arithmetic::isub;
        handlers[Opcode::IMUL as usize] = arithmetic::imul;
        handlers[Opcode::IDIV as usize] = arithmetic::idiv;
        handlers[Opcode::IREM as usize] = arithmetic::irem;
        handlers[Opcode::IAND as usize] = arithmetic::iand;
        handlers[Opcode::IOR as usize] = arithmetic::ior;
        handlers[Opcode::IXOR as usize] = arithmetic::ixor;
        handlers[Opcode::ISHL as usize] = arithmetic::ishl;
        handlers[Opcode::ISHR as usize] = arithmetic::ishr;

        // local variables
        handlers[Opcode::VLOAD as usize] = local::vload;
        handlers[Opcode::VSTORE as usize] = local::vstore;

        // control flow
        handlers[Opcode::GOTO as usize] = control_flow::goto_;
        handlers[Opcode::IF_CMPEQ as usize] = control_flow::if_cmpeq;
        handlers[Opcode::IF_CMPNE as usize] = control_flow::if_cmpne;
        handlers[Opcode::IF_ICMPLT as usize] = control_flow::if_icmplt;
        handlers[Opcode::IF_ICMPGE as usize] = control_flow::if_icmpge;
        handlers[Opcode::IF_ICMPGT as usize] = control_flow::if_icmpgt;
        handlers[Opcode::IF_ICMPLE as usize] = control_flow::if_icmple;

        // calls
        handlers[Opcode::INVOKESTATIC as usize] = calling::invokestatic;
        handlers[Opcode::INVOKENATIVE as usize] = calling::invokenative;
        handlers[Opcode::RETURN as usize] = calling::return_;

        // memory
        handlers[Opcode::NEW as usize] = memory::new;
        handlers[Opcode::IMLOAD as usize] = memory::imload;
        handlers[Opcode::IMSTORE as usize] = memory::imstore;
        handlers[Opcode::AMLOAD as usize] = memory::amload;
        handlers[Opcode::AMSTORE as usize] = memory::amstore;
        handlers[Opcode::CMLOAD as usize] = memory::cmload;
        handlers[Opcode::CMSTORE as usize] = memory::cmstore;
        handlers[Opcode::AADDF as usize] = memory::aaddf;

        // arrays
        handlers[Opcode::NEWARRAY as usize] = array::newarray;
        handlers[Opcode::ARRAYLENGTH as usize] = array::arraylength;
        handlers[Opcode::AADDS as usize] = array::aadds;

        // assertions and user errors
        handlers[Opcode::ATHROW as usize] = assertion::athrow;
        handlers[Opcode::ASSERT as usize] = assertion::assert_;

        Self { handlers }
    }
}

pub fn process_next_instruction(
    handler: &Handler,
    thread_context: &mut ThreadContext,
) -> Result<HandleResult, Trap> {
    let opcode_byte = thread_context.get_opcode_byte()?;

    tracing::trace!(
        "function {} pc 0x{:04x} opcode 0x{:02x} operands {}",
        thread_context.function_index,
        thread_context.pc,
        opcode_byte,
        thread_context.operand_stack.len()
    );

    let handle_func = handler.handlers[opcode_byte as usize];
    handle_func(thread_context)
}

pub fn process_continuous_instructions(
    handler: &Handler,
    thread_context: &mut ThreadContext,
) -> Result<i32, Trap> {
    loop {
        match process_next_instruction(handler, thread_context)? {
            HandleResult::Move(increment) => {
                thread_context.pc += increment;
            }
            HandleResult::Jump(instruction_address) => {
                thread_context.pc = instruction_address;
            }
            HandleResult::End(exit_value) => {
                return Ok(exit_value);
            }
        }
    }
}

/// run a program from the entry function to its return.
///
/// this is the single operation the VM exposes to its embedder. the
/// native table must be installed (built) before execution starts and
/// is read-only for the whole run.
pub fn execute(image: &BytecodeImage, native_table: &NativeFunctionTable) -> Result<i32, Trap> {
    let handler = Handler::new();
    let mut thread_context = ThreadContext::new(image, native_table)?;

    let result = process_continuous_instructions(&handler, &mut thread_context);
    if let Err(trap) = &result {
        tracing::debug!("trap: {}", trap);
    }
    result
}
