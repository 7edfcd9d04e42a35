// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the program container is a text file of whitespace-separated pairs
// of hex digits, a '#' starts a comment that runs to the end of the
// line. the decoded byte stream has this big-endian layout:
//
// u32  magic = 0xC0C0FFEE
// u16  version
// u16  int pool count         ; i32 x count follows
// u16  string pool byte count ; raw bytes follow
// u16  function pool count
//      per function: u16 num_args, u16 num_vars, u16 code_length, code
// u16  native pool count
//      per native:   u16 num_args, u16 function_table_index

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::bytecode_image::{BytecodeImage, FunctionEntry, NativeEntry, IMAGE_MAGIC};
use crate::ImageError;

pub fn load_image_from_text(text: &str) -> Result<BytecodeImage, ImageError> {
    let bytes = decode_hex_text(text)?;
    load_image_from_bytes(&bytes)
}

pub fn load_image_from_bytes(data: &[u8]) -> Result<BytecodeImage, ImageError> {
    let mut cursor = Cursor::new(data);

    let magic = read_u32(&mut cursor, "magic number")?;
    if magic != IMAGE_MAGIC {
        return Err(ImageError::new(format!(
            "bad magic number 0x{:08x}, expected 0x{:08x}",
            magic, IMAGE_MAGIC
        )));
    }

    let version = read_u16(&mut cursor, "version")?;

    let int_count = read_u16(&mut cursor, "int pool count")?;
    let mut int_pool = Vec::with_capacity(int_count as usize);
    for _ in 0..int_count {
        int_pool.push(read_i32(&mut cursor, "int pool entry")?);
    }

    let string_pool_length = read_u16(&mut cursor, "string pool byte count")?;
    let string_pool = read_bytes(&mut cursor, string_pool_length as usize, "string pool")?;

    let function_count = read_u16(&mut cursor, "function pool count")?;
    if function_count == 0 {
        return Err(ImageError::new("the function pool is empty"));
    }
    let mut function_pool = Vec::with_capacity(function_count as usize);
    for index in 0..function_count {
        let num_args = read_u16(&mut cursor, "function num_args")?;
        let num_vars = read_u16(&mut cursor, "function num_vars")?;
        if num_args > 255 || num_vars > 255 {
            return Err(ImageError::new(format!(
                "function {} has an oversized frame ({} args, {} vars)",
                index, num_args, num_vars
            )));
        }
        if num_args > num_vars {
            return Err(ImageError::new(format!(
                "function {} declares more arguments than local variables",
                index
            )));
        }
        let code_length = read_u16(&mut cursor, "function code length")?;
        let code = read_bytes(&mut cursor, code_length as usize, "function code")?;
        function_pool.push(FunctionEntry {
            num_args: num_args as u8,
            num_vars: num_vars as u8,
            code,
        });
    }

    let native_count = read_u16(&mut cursor, "native pool count")?;
    let mut native_pool = Vec::with_capacity(native_count as usize);
    for _ in 0..native_count {
        let num_args = read_u16(&mut cursor, "native num_args")?;
        let function_table_index = read_u16(&mut cursor, "native function table index")?;
        native_pool.push(NativeEntry {
            num_args,
            function_table_index,
        });
    }

    if cursor.position() != data.len() as u64 {
        return Err(ImageError::new(format!(
            "{} trailing bytes after the native pool",
            data.len() as u64 - cursor.position()
        )));
    }

    Ok(BytecodeImage {
        version,
        int_pool,
        string_pool,
        function_pool,
        native_pool,
    })
}

/// the inverse of `load_image_from_bytes`, used by the container
/// round-trip tests and by tools that assemble images.
pub fn save_image_to_bytes(image: &BytecodeImage) -> Vec<u8> {
    let mut buffer: Vec<u8> = Vec::new();

    // writes into a Vec cannot fail
    buffer.write_u32::<BigEndian>(IMAGE_MAGIC).unwrap();
    buffer.write_u16::<BigEndian>(image.version).unwrap();

    buffer
        .write_u16::<BigEndian>(image.int_pool.len() as u16)
        .unwrap();
    for value in &image.int_pool {
        buffer.write_i32::<BigEndian>(*value).unwrap();
    }

    buffer
        .write_u16::<BigEndian>(image.string_pool.len() as u16)
        .unwrap();
    buffer.extend_from_slice(&image.string_pool);

    buffer
        .write_u16::<BigEndian>(image.function_pool.len() as u16)
        .unwrap();
    for function in &image.function_pool {
        buffer.write_u16::<BigEndian>(function.num_args as u16).unwrap();
        buffer.write_u16::<BigEndian>(function.num_vars as u16).unwrap();
        buffer
            .write_u16::<BigEndian>(function.code.len() as u16)
            .unwrap();
        buffer.extend_from_slice(&function.code);
    }

    buffer
        .write_u16::<BigEndian>(image.native_pool.len() as u16)
        .unwrap();
    for native in &image.native_pool {
        buffer.write_u16::<BigEndian>(native.num_args).unwrap();
        buffer
            .write_u16::<BigEndian>(native.function_table_index)
            .unwrap();
    }

    buffer
}

/// render an image as container text, 16 byte pairs per line.
pub fn format_image_as_text(image: &BytecodeImage) -> String {
    let bytes = save_image_to_bytes(image);
    let mut text = String::from("# bytecode container\n");
    for (index, byte) in bytes.iter().enumerate() {
        if index > 0 {
            if index % 16 == 0 {
                text.push('\n');
            } else {
                text.push(' ');
            }
        }
        text.push_str(&format!("{:02X}", byte));
    }
    text.push('\n');
    text
}

fn decode_hex_text(text: &str) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    for line in text.lines() {
        let content = match line.find('#') {
            Some(position) => &line[..position],
            None => line,
        };
        for word in content.split_whitespace() {
            if word.len() != 2 {
                return Err(ImageError::new(format!(
                    "malformed hex byte \"{}\"",
                    word
                )));
            }
            let byte = u8::from_str_radix(word, 16)
                .map_err(|_| ImageError::new(format!("malformed hex byte \"{}\"", word)))?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}

fn read_u16(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<u16, ImageError> {
    cursor
        .read_u16::<BigEndian>()
        .map_err(|_| truncated(field))
}

fn read_u32(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<u32, ImageError> {
    cursor
        .read_u32::<BigEndian>()
        .map_err(|_| truncated(field))
}

fn read_i32(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<i32, ImageError> {
    cursor
        .read_i32::<BigEndian>()
        .map_err(|_| truncated(field))
}

fn read_bytes(
    cursor: &mut Cursor<&[u8]>,
    length: usize,
    field: &str,
) -> Result<Vec<u8>, ImageError> {
    let mut bytes = vec![0u8; length];
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| truncated(field))?;
    Ok(bytes)
}

fn truncated(field: &str) -> ImageError {
    ImageError::new(format!("truncated image: incomplete {}", field))
}
