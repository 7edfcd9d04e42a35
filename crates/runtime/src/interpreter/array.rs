// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::{Address, Trap, Value};

use super::HandleResult;

pub fn newarray(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let element_size = thread_context.get_param_u8()?;
    let count = thread_context.operand_stack.pop_int()?;
    if count < 0 {
        return Err(Trap::assertion("negative array size"));
    }

    let address = thread_context
        .heap
        .allocate_array(element_size as u32, count as u32)?;
    thread_context.operand_stack.push(Value::Ref(Some(address)));
    Ok(HandleResult::Move(2))
}

pub fn arraylength(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let reference = thread_context.operand_stack.pop_ref()?;
    let address = reference.ok_or_else(|| Trap::memory("null pointer dereference"))?;

    let count = match address {
        Address::Heap { alloc_index, .. } => {
            let (_element_size, count) = thread_context.heap.array_info(alloc_index)?;
            count
        }
        Address::StringPool { .. } => return Err(Trap::memory("not an array")),
    };

    thread_context.operand_stack.push(Value::Int(count as i32));
    Ok(HandleResult::Move(1))
}

pub fn aadds(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let index = thread_context.operand_stack.pop_int()?;
    let reference = thread_context.operand_stack.pop_ref()?;
    let address = reference.ok_or_else(|| Trap::memory("null pointer dereference"))?;

    let element_address = match address {
        Address::Heap { alloc_index, .. } => {
            let (element_size, count) = thread_context.heap.array_info(alloc_index)?;
            if index < 0 || index as u32 >= count {
                return Err(Trap::memory("array index out of bounds"));
            }
            // the product stays within the allocation, which is
            // size-checked at creation
            Address::Heap {
                alloc_index,
                offset: element_size * index as u32,
            }
        }
        Address::StringPool { .. } => return Err(Trap::memory("not an array")),
    };

    thread_context
        .operand_stack
        .push(Value::Ref(Some(element_address)));
    Ok(HandleResult::Move(1))
}
