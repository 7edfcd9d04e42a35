// Copyright (c) 2023 Hemashushu <hippospark@gmail.com>, All rights reserved.
//
// This Source Code Form is subject to the terms of
// the Mozilla Public License version 2.0 and additional exceptions,
// more details in file LICENSE and CONTRIBUTING.

// the runner: map the container file, parse it, install the standard
// native table and execute from function 0.
//
// the exit status separates a normal return from the trap kinds:
// a normal return prints the returned integer on stdout and exits 0,
// traps report on stderr and exit with
//   1  error raised by the program (ATHROW / the 'error' native)
//   2  assertion failure
//   3  arithmetic error
//   4  memory error
//   5  fatal (malformed bytecode) or a load error
//
// set RUST_LOG=trace for the per-instruction dispatch trace.

use std::fs::File;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use memmap2::Mmap;

use c0vm_image::bytecode_image::BytecodeImage;
use c0vm_image::bytecode_reader::format_bytecode_as_text;
use c0vm_image::loader::load_image_from_text;
use c0vm_program::native_function::standard_native_table;
use c0vm_runtime::interpreter::execute;
use c0vm_types::TrapKind;

const EXIT_CODE_LOAD_ERROR: i32 = 5;

#[derive(Parser)]
#[command(name = "c0vm", version, about = "a bytecode virtual machine")]
struct Args {
    /// the program container file
    path: PathBuf,

    /// print the code of every function instead of executing
    #[arg(long)]
    disassemble: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    process::exit(run(&args));
}

fn run(args: &Args) -> i32 {
    let file = match File::open(&args.path) {
        Ok(file) => file,
        Err(error) => {
            eprintln!("c0vm: cannot open {}: {}", args.path.display(), error);
            return EXIT_CODE_LOAD_ERROR;
        }
    };

    let mmap = match unsafe { Mmap::map(&file) } {
        Ok(mmap) => mmap,
        Err(error) => {
            eprintln!("c0vm: cannot map {}: {}", args.path.display(), error);
            return EXIT_CODE_LOAD_ERROR;
        }
    };

    let text = String::from_utf8_lossy(&mmap);
    let image = match load_image_from_text(&text) {
        Ok(image) => image,
        Err(error) => {
            eprintln!("c0vm: {}", error);
            return EXIT_CODE_LOAD_ERROR;
        }
    };

    if args.disassemble {
        disassemble(&image);
        return 0;
    }

    let native_table = standard_native_table();
    match execute(&image, &native_table) {
        Ok(exit_value) => {
            println!("{}", exit_value);
            0
        }
        Err(trap) => {
            eprintln!("c0vm: {}", trap);
            match trap.kind {
                TrapKind::UserError => 1,
                TrapKind::AssertionFailure => 2,
                TrapKind::ArithmeticError => 3,
                TrapKind::MemoryError => 4,
                TrapKind::Fatal => 5,
            }
        }
    }
}

fn disassemble(image: &BytecodeImage) {
    for (index, function) in image.function_pool.iter().enumerate() {
        println!(
            "function {} (args: {}, vars: {})",
            index, function.num_args, function.num_vars
        );
        println!("{}", format_bytecode_as_text(&function.code));
        println!();
    }
}
