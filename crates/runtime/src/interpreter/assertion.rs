// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::Trap;

use super::HandleResult;

pub fn athrow(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let reference = thread_context.operand_stack.pop_ref()?;
    let message = thread_context.read_string(reference)?;
    Err(Trap::user(message))
}

pub fn assert_(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    // the message reference sits on top of the condition
    let reference = thread_context.operand_stack.pop_ref()?;
    let condition = thread_context.operand_stack.pop_int()?;

    if condition == 0 {
        let message = thread_context.read_string(reference)?;
        Err(Trap::assertion(message))
    } else {
        Ok(HandleResult::Move(1))
    }
}
