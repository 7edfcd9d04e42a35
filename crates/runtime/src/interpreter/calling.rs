// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::{Trap, Value};

use super::HandleResult;

pub fn invokestatic(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let function_index = thread_context.get_param_u16()? as usize;

    // the caller resumes at the instruction after INVOKESTATIC,
    // the callee starts at address 0 of its own code
    let return_address = thread_context.pc + 3;
    thread_context.create_frame(function_index, return_address)?;
    Ok(HandleResult::Jump(0))
}

pub fn invokenative(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let native_index = thread_context.get_param_u16()?;
    let image = thread_context.image;
    let native = *image.get_native(native_index).ok_or_else(|| {
        Trap::fatal(format!("native pool index {} out of range", native_index))
    })?;

    // pop the arguments in reverse, the topmost operand is the last
    let num_args = native.num_args as usize;
    let mut args = vec![Value::zero(); num_args];
    for i in (0..num_args).rev() {
        args[i] = thread_context.operand_stack.pop()?;
    }

    let native_function = thread_context
        .native_table
        .get(native.function_table_index)
        .ok_or_else(|| {
            Trap::fatal(format!(
                "native function {} is not installed",
                native.function_table_index
            ))
        })?;

    // the native runs synchronously and may itself trap
    let result = native_function(thread_context, &args)?;
    thread_context.operand_stack.push(result);
    Ok(HandleResult::Move(3))
}

pub fn return_(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let return_value = thread_context.operand_stack.pop()?;

    match thread_context.exit_frame(return_value)? {
        Some(resume_address) => Ok(HandleResult::Jump(resume_address)),
        None => match return_value {
            Value::Int(exit_value) => Ok(HandleResult::End(exit_value)),
            Value::Ref(_) => Err(Trap::fatal("the entry function returned a reference")),
        },
    }
}
