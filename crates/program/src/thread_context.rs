// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use c0vm_image::bytecode_image::BytecodeImage;
use c0vm_types::{Address, Trap, Value};

use crate::heap::{decode_reference, encode_reference, Heap};
use crate::native_function::NativeFunctionTable;
use crate::stack::OperandStack;

/// one suspended function activation.
///
/// a frame owns its operand stack and its local variables, nothing is
/// shared between frames. the active frame lives directly in the
/// thread context and is moved onto the call stack (whole, by value)
/// when a call suspends it.
pub struct Frame {
    pub operand_stack: OperandStack,
    pub local_variables: Vec<Value>,
    pub function_index: usize,
    // the pc in this frame's code to resume at when the callee returns
    pub return_address: usize,
}

/// the complete execution state of one running program.
///
/// the VM is strictly single-threaded, one context runs one program
/// from the entry function to its return. the context is NOT thread
/// safe, do not call its functions from multiple threads.
pub struct ThreadContext<'a> {
    // the active frame, kept unpacked for direct access
    pub operand_stack: OperandStack,
    pub local_variables: Vec<Value>,
    pub function_index: usize,

    // the position of the next executing instruction within the
    // active function's code array
    pub pc: usize,

    // the suspended callers, empty while the entry function runs
    pub call_stack: Vec<Frame>,

    pub heap: Heap,

    // read-only during execution
    pub image: &'a BytecodeImage,
    pub native_table: &'a NativeFunctionTable,
}

impl<'a> ThreadContext<'a> {
    /// a context positioned at pc 0 of the entry function (function 0).
    pub fn new(
        image: &'a BytecodeImage,
        native_table: &'a NativeFunctionTable,
    ) -> Result<Self, Trap> {
        let entry = image
            .get_function(0)
            .ok_or_else(|| Trap::fatal("the image has no entry function"))?;

        Ok(Self {
            operand_stack: OperandStack::new(),
            local_variables: vec![Value::zero(); entry.num_vars as usize],
            function_index: 0,
            pc: 0,
            call_stack: Vec::new(),
            heap: Heap::new(),
            image,
            native_table,
        })
    }

    /// the code array of the active function.
    pub fn code(&self) -> &[u8] {
        // the function index was validated when the frame was created
        &self.image.function_pool[self.function_index].code
    }

    pub fn get_opcode_byte(&self) -> Result<u8, Trap> {
        self.code().get(self.pc).copied().ok_or_else(|| {
            Trap::fatal(format!("program counter 0x{:04x} out of range", self.pc))
        })
    }

    // ---------- immediate operands ----------
    //
    // immediates follow the opcode in-stream, multi-byte immediates
    // are big-endian.

    pub fn get_param_u8(&self) -> Result<u8, Trap> {
        self.code()
            .get(self.pc + 1)
            .copied()
            .ok_or_else(|| self.truncated_instruction())
    }

    pub fn get_param_i8(&self) -> Result<i8, Trap> {
        Ok(self.get_param_u8()? as i8)
    }

    pub fn get_param_u16(&self) -> Result<u16, Trap> {
        let code = self.code();
        let bytes = code
            .get(self.pc + 1..self.pc + 3)
            .ok_or_else(|| self.truncated_instruction())?;
        Ok(BigEndian::read_u16(bytes))
    }

    pub fn get_param_i16(&self) -> Result<i16, Trap> {
        Ok(self.get_param_u16()? as i16)
    }

    fn truncated_instruction(&self) -> Trap {
        Trap::fatal(format!(
            "truncated instruction at 0x{:04x}",
            self.pc
        ))
    }

    // ---------- frame management ----------

    /// suspend the active frame and install a fresh one for the
    /// called function: an empty operand stack, zero-initialized
    /// local variables, and the arguments popped from the caller's
    /// operand stack into the first local variable slots (in reverse,
    /// the topmost operand is the last argument). the caller resumes
    /// at `return_address`.
    pub fn create_frame(
        &mut self,
        function_index: usize,
        return_address: usize,
    ) -> Result<(), Trap> {
        let image = self.image;
        let target = image
            .get_function(function_index as u16)
            .ok_or_else(|| {
                Trap::fatal(format!("function pool index {} out of range", function_index))
            })?;

        let num_args = target.num_args as usize;
        let num_vars = target.num_vars as usize;
        if num_args > num_vars {
            return Err(Trap::fatal(format!(
                "function {} declares more arguments than local variables",
                function_index
            )));
        }

        let mut local_variables = vec![Value::zero(); num_vars];
        for i in (0..num_args).rev() {
            local_variables[i] = self.operand_stack.pop()?;
        }

        let caller = Frame {
            operand_stack: std::mem::replace(&mut self.operand_stack, OperandStack::new()),
            local_variables: std::mem::replace(&mut self.local_variables, local_variables),
            function_index: std::mem::replace(&mut self.function_index, function_index),
            return_address,
        };
        self.call_stack.push(caller);

        Ok(())
    }

    /// leave the active frame. its operand stack must already be
    /// empty (the return value popped off). returns the caller's
    /// resume pc, or None when the entry function returned.
    ///
    /// the returning frame's operand stack and local variables are
    /// released here, on every control path.
    pub fn exit_frame(&mut self, return_value: Value) -> Result<Option<usize>, Trap> {
        if !self.operand_stack.is_empty() {
            return Err(Trap::fatal("operand stack not empty on return"));
        }

        match self.call_stack.pop() {
            Some(caller) => {
                self.operand_stack = caller.operand_stack;
                self.local_variables = caller.local_variables;
                self.function_index = caller.function_index;
                self.operand_stack.push(return_value);
                Ok(Some(caller.return_address))
            }
            None => Ok(None),
        }
    }

    // ---------- memory access ----------
    //
    // loads and stores route through the address: into a heap
    // allocation buffer, or into the read-only string pool of the
    // image. every dereference null-checks and bounds-checks.

    pub fn memory_load_i32(&self, reference: Option<Address>) -> Result<i32, Trap> {
        Ok(LittleEndian::read_i32(self.memory_read(reference, 4)?))
    }

    pub fn memory_store_i32(
        &mut self,
        reference: Option<Address>,
        value: i32,
    ) -> Result<(), Trap> {
        let mut bytes = [0u8; 4];
        LittleEndian::write_i32(&mut bytes, value);
        self.memory_write(reference, &bytes)
    }

    pub fn memory_load_i8(&self, reference: Option<Address>) -> Result<i8, Trap> {
        Ok(self.memory_read(reference, 1)?[0] as i8)
    }

    pub fn memory_store_u8(&mut self, reference: Option<Address>, value: u8) -> Result<(), Trap> {
        self.memory_write(reference, &[value])
    }

    pub fn memory_load_reference(
        &self,
        reference: Option<Address>,
    ) -> Result<Option<Address>, Trap> {
        decode_reference(LittleEndian::read_u64(self.memory_read(reference, 8)?))
    }

    pub fn memory_store_reference(
        &mut self,
        reference: Option<Address>,
        value: Option<Address>,
    ) -> Result<(), Trap> {
        let mut bytes = [0u8; 8];
        LittleEndian::write_u64(&mut bytes, encode_reference(value));
        self.memory_write(reference, &bytes)
    }

    /// the bytes of a NUL-terminated string through a reference,
    /// for ASSERT/ATHROW messages and the console natives.
    pub fn read_string(&self, reference: Option<Address>) -> Result<String, Trap> {
        let address =
            reference.ok_or_else(|| Trap::memory("null pointer dereference"))?;

        let region = match address {
            Address::Heap {
                alloc_index,
                offset,
            } => self
                .heap
                .buffer(alloc_index)?
                .get(offset as usize..)
                .ok_or_else(|| Trap::memory("address out of bounds"))?,
            Address::StringPool { offset } => self
                .image
                .string_pool
                .get(offset as usize..)
                .ok_or_else(|| Trap::memory("address out of bounds"))?,
        };

        match region.iter().position(|&byte| byte == 0) {
            Some(end) => Ok(String::from_utf8_lossy(&region[..end]).into_owned()),
            None => Err(Trap::memory("unterminated string")),
        }
    }

    fn memory_read(&self, reference: Option<Address>, length: usize) -> Result<&[u8], Trap> {
        let address =
            reference.ok_or_else(|| Trap::memory("null pointer dereference"))?;

        match address {
            Address::Heap {
                alloc_index,
                offset,
            } => self
                .heap
                .buffer(alloc_index)?
                .get(offset as usize..offset as usize + length)
                .ok_or_else(|| Trap::memory("address out of bounds")),
            Address::StringPool { offset } => self
                .image
                .string_pool
                .get(offset as usize..offset as usize + length)
                .ok_or_else(|| Trap::memory("address out of bounds")),
        }
    }

    fn memory_write(&mut self, reference: Option<Address>, bytes: &[u8]) -> Result<(), Trap> {
        let address =
            reference.ok_or_else(|| Trap::memory("null pointer dereference"))?;

        match address {
            Address::Heap {
                alloc_index,
                offset,
            } => {
                let slot = self
                    .heap
                    .buffer_mut(alloc_index)?
                    .get_mut(offset as usize..offset as usize + bytes.len())
                    .ok_or_else(|| Trap::memory("address out of bounds"))?;
                slot.copy_from_slice(bytes);
                Ok(())
            }
            Address::StringPool { .. } => Err(Trap::memory("write to read-only memory")),
        }
    }
}
