// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// every binary operation pops b then a, so the operand pushed first
// is the left-hand side. add/sub/mul wrap in two's complement.

use c0vm_program::thread_context::ThreadContext;
use c0vm_types::{Trap, Value};

use super::HandleResult;

pub fn iadd(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    thread_context
        .operand_stack
        .push(Value::Int(a.wrapping_add(b)));
    Ok(HandleResult::Move(1))
}

pub fn isub(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    thread_context
        .operand_stack
        .push(Value::Int(a.wrapping_sub(b)));
    Ok(HandleResult::Move(1))
}

pub fn imul(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    thread_context
        .operand_stack
        .push(Value::Int(a.wrapping_mul(b)));
    Ok(HandleResult::Move(1))
}

pub fn idiv(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    check_division(a, b)?;
    thread_context.operand_stack.push(Value::Int(a / b));
    Ok(HandleResult::Move(1))
}

pub fn irem(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    check_division(a, b)?;
    thread_context.operand_stack.push(Value::Int(a % b));
    Ok(HandleResult::Move(1))
}

fn check_division(a: i32, b: i32) -> Result<(), Trap> {
    if b == 0 {
        Err(Trap::arithmetic("division by zero"))
    } else if a == i32::MIN && b == -1 {
        Err(Trap::arithmetic("division overflow"))
    } else {
        Ok(())
    }
}

pub fn iand(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    thread_context.operand_stack.push(Value::Int(a & b));
    Ok(HandleResult::Move(1))
}

pub fn ior(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    thread_context.operand_stack.push(Value::Int(a | b));
    Ok(HandleResult::Move(1))
}

pub fn ixor(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    thread_context.operand_stack.push(Value::Int(a ^ b));
    Ok(HandleResult::Move(1))
}

pub fn ishl(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    check_shift(b)?;
    thread_context.operand_stack.push(Value::Int(a << b));
    Ok(HandleResult::Move(1))
}

pub fn ishr(thread_context: &mut ThreadContext) -> Result<HandleResult, Trap> {
    let b = thread_context.operand_stack.pop_int()?;
    let a = thread_context.operand_stack.pop_int()?;
    check_shift(b)?;
    // arithmetic shift, the sign bit is replicated
    thread_context.operand_stack.push(Value::Int(a >> b));
    Ok(HandleResult::Move(1))
}

fn check_shift(b: i32) -> Result<(), Trap> {
    if !(0..=31).contains(&b) {
        Err(Trap::arithmetic("shift amount out of range"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use c0vm_image::bytecode_writer::BytecodeWriter;
    use c0vm_image::utils::{helper_build_image, HelperFunctionEntry};
    use c0vm_program::native_function::NativeFunctionTable;
    use c0vm_types::opcode::Opcode;
    use c0vm_types::{Trap, TrapKind};

    use crate::interpreter::execute;

    // push a and b from the int pool, apply the operation, return
    fn run_binary(opcode: Opcode, a: i32, b: i32) -> Result<i32, Trap> {
        let code = BytecodeWriter::new()
            .write_opcode_u16(Opcode::ILDC, 0)
            .write_opcode_u16(Opcode::ILDC, 1)
            .write_opcode(opcode)
            .write_opcode(Opcode::RETURN)
            .to_bytes();
        let image = helper_build_image(
            vec![a, b],
            &[],
            vec![HelperFunctionEntry {
                num_args: 0,
                num_vars: 0,
                code,
            }],
            vec![],
        );
        let native_table = NativeFunctionTable::new();
        execute(&image, &native_table)
    }

    #[test]
    fn test_process_iadd() {
        // bytecodes
        //
        // 0x0000 ILDC  0        ;; 2
        // 0x0003 ILDC  1        ;; 3
        // 0x0006 IADD
        // 0x0007 RETURN
        assert_eq!(run_binary(Opcode::IADD, 2, 3).unwrap(), 5);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        // two's-complement wrap-around, mod 2^32
        assert_eq!(run_binary(Opcode::IADD, i32::MAX, 1).unwrap(), i32::MIN);
        assert_eq!(run_binary(Opcode::ISUB, i32::MIN, 1).unwrap(), i32::MAX);
        assert_eq!(run_binary(Opcode::IMUL, 0x40000000, 2).unwrap(), i32::MIN);

        let pairs = [
            (0, 0),
            (1, -1),
            (1234567, 7654321),
            (i32::MAX, i32::MAX),
            (i32::MIN, i32::MIN),
            (i32::MIN, i32::MAX),
        ];
        for (a, b) in pairs {
            assert_eq!(run_binary(Opcode::IADD, a, b).unwrap(), a.wrapping_add(b));
            assert_eq!(run_binary(Opcode::ISUB, a, b).unwrap(), a.wrapping_sub(b));
            assert_eq!(run_binary(Opcode::IMUL, a, b).unwrap(), a.wrapping_mul(b));
        }
    }

    #[test]
    fn test_process_idiv_irem() {
        // truncated division and the matching remainder
        let pairs = [
            (7, 2),
            (-7, 2),
            (7, -2),
            (-7, -2),
            (0, 5),
            (i32::MAX, 1),
            (i32::MIN, 1),
            (i32::MAX, -1),
        ];
        for (a, b) in pairs {
            let quotient = run_binary(Opcode::IDIV, a, b).unwrap();
            let remainder = run_binary(Opcode::IREM, a, b).unwrap();
            assert_eq!(quotient, a / b);
            assert_eq!(remainder, a % b);
            // a == (a / b) * b + a % b
            assert_eq!(quotient * b + remainder, a);
        }
    }

    #[test]
    fn test_division_by_zero_traps() {
        let trap = run_binary(Opcode::IDIV, 7, 0).unwrap_err();
        assert_eq!(trap, Trap::arithmetic("division by zero"));

        let trap = run_binary(Opcode::IREM, 7, 0).unwrap_err();
        assert_eq!(trap.kind, TrapKind::ArithmeticError);
    }

    #[test]
    fn test_division_overflow_traps() {
        assert_eq!(
            run_binary(Opcode::IDIV, i32::MIN, -1).unwrap_err().kind,
            TrapKind::ArithmeticError
        );
        assert_eq!(
            run_binary(Opcode::IREM, i32::MIN, -1).unwrap_err().kind,
            TrapKind::ArithmeticError
        );
    }

    #[test]
    fn test_process_bitwise() {
        assert_eq!(run_binary(Opcode::IAND, 0b1100, 0b1010).unwrap(), 0b1000);
        assert_eq!(run_binary(Opcode::IOR, 0b1100, 0b1010).unwrap(), 0b1110);
        assert_eq!(run_binary(Opcode::IXOR, 0b1100, 0b1010).unwrap(), 0b0110);
        assert_eq!(run_binary(Opcode::IAND, -1, 0x0f0f).unwrap(), 0x0f0f);
    }

    #[test]
    fn test_process_shifts() {
        for b in [0, 1, 15, 31] {
            assert_eq!(run_binary(Opcode::ISHL, 1, b).unwrap(), 1 << b);
            assert_eq!(run_binary(Opcode::ISHL, -1, b).unwrap(), -1 << b);
            assert_eq!(run_binary(Opcode::ISHR, i32::MAX, b).unwrap(), i32::MAX >> b);
            // the arithmetic right shift replicates the sign bit
            assert_eq!(run_binary(Opcode::ISHR, -1, b).unwrap(), -1);
        }

        // ILDC 0; BIPUSH 31; ISHR with int_pool[0] = -1
        assert_eq!(run_binary(Opcode::ISHR, -1, 31).unwrap(), -1);
    }

    #[test]
    fn test_shift_out_of_range_traps() {
        for b in [-1, 32, 100] {
            assert_eq!(
                run_binary(Opcode::ISHL, 1, b).unwrap_err().kind,
                TrapKind::ArithmeticError
            );
            assert_eq!(
                run_binary(Opcode::ISHR, 1, b).unwrap_err().kind,
                TrapKind::ArithmeticError
            );
        }
    }
}
