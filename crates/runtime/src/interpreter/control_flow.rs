// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// branch offsets are signed 16-bit values relative to the pc of the
// branch opcode itself. the target is computed directly as
// `pc + offset`, a branch not taken advances past the opcode and its
// two offset bytes.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::Trap;

use super::HandleResult;

pub fn goto_(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    Ok(HandleResult::Jump(branch_target(thread_context)?))
}

pub fn if_cmpeq(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    // structural equality across both variants
    let b = thread_context.operand_stack.pop()?;
    let a = thread_context.operand_stack.pop()?;
    branch_if(thread_context, a == b)
}

pub fn if_cmpne(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop()?;
    let a = thread_context.operand_stack.pop()?;
    branch_if(thread_context, a != b)
}

pub fn if_icmplt(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    branch_if(thread_context, a < b)
}

pub fn if_icmpge(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    branch_if(thread_context, a >= b)
}

pub fn if_icmpgt(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    branch_if(thread_context, a > b)
}

pub fn if_icmple(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    branch_if(thread_context, a <= b)
}

fn branch_if(thread_context: &mut ThreadContext, taken: bool) -> Result<HandleResult, Trap> {
    if taken {
        Ok(HandleResult::Jump(branch_target(thread_context)?))
    } else {
        Ok(HandleResult::Move(3))
    }
}

fn branch_target(thread_context: &mut ThreadContext) -> Result<usize, Trap> {
    let offset = thread_context.get_param_i16()? as isize;
    let target = thread_context.pc as isize + offset;
    if target < 0 || target >= thread_context.code().len() as isize {
        return Err(Trap::fatal(format!("jump target {} out of range", target)));
    }
    Ok(target as usize)
}
