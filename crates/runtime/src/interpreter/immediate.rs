// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::{Address, Trap, Value};

use super::HandleResult;

pub fn bipush(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    // the immediate byte is sign-extended
    let value = thread_context.get_param_i8()? as i32;
    thread_context.operand_stack.push(Value::Int(value));
    Ok(HandleResult::Move(2))
}

pub fn ildc(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let index = thread_context.get_param_u16()?;
    let value = thread_context
        .image
        .get_int(index)
        .ok_or_else(|| Trap::fatal(format!("int pool index {} out of range", index)))?;
    thread_context.operand_stack.push(Value::Int(value));
    Ok(HandleResult::Move(3))
}

pub fn aldc(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let offset = thread_context.get_param_u16()?;
    // the reference must designate a terminated pool string
    thread_context
        .image
        .get_string(offset)
        .ok_or_else(|| Trap::fatal(format!("string pool offset {} out of range", offset)))?;
    thread_context
        .operand_stack
        .push(Value::Ref(Some(Address::StringPool {
            offset: offset as u32,
        })));
    Ok(HandleResult::Move(3))
}

pub fn aconst_null(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    thread_context.operand_stack.push(Value::null());
    Ok(HandleResult::Move(1))
}
