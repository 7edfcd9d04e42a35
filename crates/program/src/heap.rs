// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

use c0vm_types::{Address, Trap};

// the 8-byte encoding of a reference stored inside heap memory
// (the slots AMLOAD/AMSTORE access). the all-zero pattern is the
// null reference, so zero-initialized cells read as null.
const REF_TAG_HEAP: u64 = 1 << 63;
const REF_TAG_STRING_POOL: u64 = 1 << 62;

/// allocation buffers are capped so byte offset arithmetic never
/// leaves the u32 range of `Address` offsets.
pub const MAX_ALLOCATION_SIZE_IN_BYTES: u64 = i32::MAX as u64;

/// the managed heap.
///
/// objects are created by NEW and NEWARRAY and live until the process
/// exits, there is no collection. an `Address` therefore can never
/// dangle, only a corrupted reference slot can produce an unknown
/// allocation index.
pub struct Heap {
    allocations: Vec<Allocation>,
}

pub enum Allocation {
    // a scalar or record cell, fields are compile-time byte offsets
    Cell { data: Vec<u8> },
    // an array descriptor with its elements buffer
    Array {
        element_size: u32,
        count: u32,
        elements: Vec<u8>,
    },
}

impl Heap {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            allocations: Vec::new(),
        }
    }

    pub fn allocate_cell(&mut self, size: usize) -> Address {
        let alloc_index = self.allocations.len() as u32;
        self.allocations.push(Allocation::Cell {
            data: vec![0u8; size],
        });
        Address::Heap {
            alloc_index,
            offset: 0,
        }
    }

    pub fn allocate_array(&mut self, element_size: u32, count: u32) -> Result<Address, Trap> {
        let total = element_size as u64 * count as u64;
        if total > MAX_ALLOCATION_SIZE_IN_BYTES {
            return Err(Trap::memory("array allocation too large"));
        }

        let alloc_index = self.allocations.len() as u32;
        self.allocations.push(Allocation::Array {
            element_size,
            count,
            elements: vec![0u8; total as usize],
        });
        Ok(Address::Heap {
            alloc_index,
            offset: 0,
        })
    }

    /// (element_size, count) of an array allocation.
    pub fn array_info(&self, alloc_index: u32) -> Result<(u32, u32), Trap> {
        match self.allocation(alloc_index)? {
            Allocation::Array {
                element_size,
                count,
                ..
            } => Ok((*element_size, *count)),
            Allocation::Cell { .. } => Err(Trap::memory("not an array")),
        }
    }

    /// the addressable bytes of an allocation: the cell data, or the
    /// elements of an array.
    pub fn buffer(&self, alloc_index: u32) -> Result<&[u8], Trap> {
        match self.allocation(alloc_index)? {
            Allocation::Cell { data } => Ok(data),
            Allocation::Array { elements, .. } => Ok(elements),
        }
    }

    pub fn buffer_mut(&mut self, alloc_index: u32) -> Result<&mut [u8], Trap> {
        match self
            .allocations
            .get_mut(alloc_index as usize)
            .ok_or_else(|| Trap::memory("invalid reference"))?
        {
            Allocation::Cell { data } => Ok(data),
            Allocation::Array { elements, .. } => Ok(elements),
        }
    }

    fn allocation(&self, alloc_index: u32) -> Result<&Allocation, Trap> {
        self.allocations
            .get(alloc_index as usize)
            .ok_or_else(|| Trap::memory("invalid reference"))
    }
}

pub fn encode_reference(reference: Option<Address>) -> u64 {
    match reference {
        None => 0,
        Some(Address::Heap {
            alloc_index,
            offset,
        }) => REF_TAG_HEAP | ((alloc_index as u64) << 32) | offset as u64,
        Some(Address::StringPool { offset }) => REF_TAG_STRING_POOL | offset as u64,
    }
}

pub fn decode_reference(bits: u64) -> Result<Option<Address>, Trap> {
    if bits == 0 {
        Ok(None)
    } else if bits & REF_TAG_HEAP != 0 {
        Ok(Some(Address::Heap {
            alloc_index: ((bits >> 32) & 0x7fff_ffff) as u32,
            offset: bits as u32,
        }))
    } else if bits & REF_TAG_STRING_POOL != 0 {
        Ok(Some(Address::StringPool {
            offset: bits as u32,
        }))
    } else {
        // an integer was written over a reference slot
        Err(Trap::memory("corrupted reference slot"))
    }
}
