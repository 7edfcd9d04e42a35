// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use std::io::Write;

use c0vm_types::{Trap, Value};

use crate::thread_context::ThreadContext;

/// the signature of a host-provided native function.
///
/// the bytecode reaches a native through the native pool: the pool
/// entry names an index into this table and an arity, INVOKENATIVE
/// pops that many operands into the argument vector and pushes the
/// returned value. the VM knows nothing about the semantics of an
/// individual native, a native may itself trap.
///
/// natives receive the thread context so they can read string
/// arguments through the managed memory and allocate results.
pub type NativeFunction = fn(&mut ThreadContext, &[Value]) -> Result<Value, Trap>;

/// the read-only indexed table of native functions.
///
/// the embedder builds the table once, before execution starts, and
/// keeps it unchanged for the lifetime of the process.
pub struct NativeFunctionTable {
    functions: Vec<NativeFunction>,
}

impl NativeFunctionTable {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
        }
    }

    pub fn with_functions(functions: Vec<NativeFunction>) -> Self {
        Self { functions }
    }

    pub fn get(&self, index: u16) -> Option<NativeFunction> {
        self.functions.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

// the console natives of the standard table, at fixed indices
pub const NATIVE_PRINT: u16 = 0;
pub const NATIVE_PRINTLN: u16 = 1;
pub const NATIVE_PRINTINT: u16 = 2;
pub const NATIVE_PRINTBOOL: u16 = 3;
pub const NATIVE_PRINTCHAR: u16 = 4;
pub const NATIVE_ERROR: u16 = 5;

/// the standard table the CLI installs.
pub fn standard_native_table() -> NativeFunctionTable {
    NativeFunctionTable::with_functions(vec![
        native_print,
        native_println,
        native_printint,
        native_printbool,
        native_printchar,
        native_error,
    ])
}

fn native_print(
    thread_context: &mut ThreadContext,
    args: &[Value],
) -> Result<Value, Trap> {
    let text = string_argument(thread_context, args, 0)?;
    write_stdout(text.as_bytes())?;
    Ok(Value::Int(0))
}

fn native_println(
    thread_context: &mut ThreadContext,
    args: &[Value],
) -> Result<Value, Trap> {
    let mut text = string_argument(thread_context, args, 0)?;
    text.push('\n');
    write_stdout(text.as_bytes())?;
    Ok(Value::Int(0))
}

fn native_printint(
    _thread_context: &mut ThreadContext,
    args: &[Value],
) -> Result<Value, Trap> {
    let value = int_argument(args, 0)?;
    write_stdout(value.to_string().as_bytes())?;
    Ok(Value::Int(0))
}

fn native_printbool(
    _thread_context: &mut ThreadContext,
    args: &[Value],
) -> Result<Value, Trap> {
    let value = int_argument(args, 0)?;
    let text = if value == 0 { "false" } else { "true" };
    write_stdout(text.as_bytes())?;
    Ok(Value::Int(0))
}

fn native_printchar(
    _thread_context: &mut ThreadContext,
    args: &[Value],
) -> Result<Value, Trap> {
    let value = int_argument(args, 0)?;
    // the character type is 7-bit
    write_stdout(&[(value & 0x7f) as u8])?;
    Ok(Value::Int(0))
}

fn native_error(
    thread_context: &mut ThreadContext,
    args: &[Value],
) -> Result<Value, Trap> {
    let message = string_argument(thread_context, args, 0)?;
    Err(Trap::user(message))
}

fn string_argument(
    thread_context: &mut ThreadContext,
    args: &[Value],
    index: usize,
) -> Result<String, Trap> {
    match args.get(index) {
        Some(Value::Ref(reference)) => thread_context.read_string(*reference),
        _ => Err(Trap::fatal("native argument type mismatch")),
    }
}

fn int_argument(args: &[Value], index: usize) -> Result<i32, Trap> {
    match args.get(index) {
        Some(Value::Int(value)) => Ok(*value),
        _ => Err(Trap::fatal("native argument type mismatch")),
    }
}

fn write_stdout(bytes: &[u8]) -> Result<(), Trap> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(bytes)
        .and_then(|_| stdout.flush())
        .map_err(|_| Trap::fatal("write to stdout failed"))
}
