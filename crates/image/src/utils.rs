// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// helper functions for building images directly in memory,
// they are mainly used for testing the interpreter.

use crate::bytecode_image::{BytecodeImage, FunctionEntry, NativeEntry, IMAGE_VERSION};

pub struct HelperFunctionEntry {
    pub num_args: u8,
    pub num_vars: u8,
    pub code: Vec<u8>,
}

/// an image whose only function is the entry function with
/// no arguments and `num_vars` zero-initialized local variables.
pub fn helper_build_image_with_single_function(num_vars: u8, code: Vec<u8>) -> BytecodeImage {
    helper_build_image(
        vec![],
        &[],
        vec![HelperFunctionEntry {
            num_args: 0,
            num_vars,
            code,
        }],
        vec![],
    )
}

pub fn helper_build_image(
    int_pool: Vec<i32>,
    strings: &[&str],
    functions: Vec<HelperFunctionEntry>,
    native_pool: Vec<NativeEntry>,
) -> BytecodeImage {
    let (string_pool, _offsets) = helper_build_string_pool(strings);
    BytecodeImage {
        version: IMAGE_VERSION,
        int_pool,
        string_pool,
        function_pool: functions
            .into_iter()
            .map(|entry| FunctionEntry {
                num_args: entry.num_args,
                num_vars: entry.num_vars,
                code: entry.code,
            })
            .collect(),
        native_pool,
    }
}

/// concatenate NUL-terminated strings into a pool, returning the
/// byte offset of each string (the ids ALDC takes).
pub fn helper_build_string_pool(strings: &[&str]) -> (Vec<u8>, Vec<u16>) {
    let mut pool: Vec<u8> = Vec::new();
    let mut offsets: Vec<u16> = Vec::new();
    for string in strings {
        offsets.push(pool.len() as u16);
        pool.extend_from_slice(string.as_bytes());
        pool.push(0);
    }
    (pool, offsets)
}
