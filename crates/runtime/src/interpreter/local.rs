// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::Trap;

use super::HandleResult;

pub fn vload(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let index = thread_context.get_param_u8()? as usize;
    let value = *thread_context
        .local_variables
        .get(index)
        .ok_or_else(|| Trap::fatal(format!("local variable index {} out of range", index)))?;
    thread_context.operand_stack.push(value);
    Ok(HandleResult::Move(2))
}

pub fn vstore(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let index = thread_context.get_param_u8()? as usize;
    let value = thread_context.operand_stack.pop()?;
    let slot = thread_context
        .local_variables
        .get_mut(index)
        .ok_or_else(|| Trap::fatal(format!("local variable index {} out of range", index)))?;
    *slot = value;
    Ok(HandleResult::Move(2))
}
