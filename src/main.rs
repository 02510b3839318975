// marmoset - A small expression-oriented language with a bytecode compiler and stack VM
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use marmoset_parser::Parser;
use marmoset_vm::value::NULL;
use marmoset_vm::{Compiler, GLOBALS_SIZE, VM};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Handle --version flag
    if args.len() == 2 && (args[1] == "--version" || args[1] == "-v") {
        println!("Marmoset v0.1.0");
        return;
    }

    // If files provided, run them; otherwise start the REPL
    if args.len() > 1 {
        run_files(&args[1..]);
    } else {
        run_repl();
    }
}

/// Compile and run a sequence of source files
fn run_files(files: &[String]) {
    for file_path in files {
        if let Err(e) = run_file(file_path) {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Compile and run a single source file
fn run_file(file_path: &str) -> Result<(), String> {
    let path = Path::new(file_path);

    // Validate file extension
    match path.extension().and_then(|e| e.to_str()) {
        Some("mar") => {}
        Some(ext) => {
            return Err(format!(
                "Error: unsupported file extension '.{}' for '{}'",
                ext, file_path
            ));
        }
        None => {
            return Err(format!(
                "Error: file '{}' has no extension (expected .mar)",
                file_path
            ));
        }
    }

    let source =
        fs::read_to_string(path).map_err(|e| format!("Error reading '{}': {}", file_path, e))?;

    let program = Parser::parse_source(&source).map_err(|errors| {
        let mut message = format!("Parse errors in '{}':", file_path);
        for error in errors {
            message.push_str(&format!("\n  {}", error));
        }
        message
    })?;

    let mut compiler = Compiler::new();
    compiler
        .compile(&program)
        .map_err(|e| format!("Compile error in '{}': {}", file_path, e))?;

    let mut machine = VM::new(compiler.bytecode());
    machine
        .run()
        .map_err(|e| format!("Runtime error in '{}': {}", file_path, e))?;

    Ok(())
}

/// Run the interactive REPL
fn run_repl() {
    println!("Marmoset v0.1.0");

    // Symbol table, constants pool, and globals persist across lines.
    let (mut symbols, mut constants) = Compiler::new().into_state();
    let mut globals = vec![NULL; GLOBALS_SIZE];

    loop {
        print!(">> ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }

                let program = match Parser::parse_source(input) {
                    Ok(program) => program,
                    Err(errors) => {
                        eprintln!("Well, that went bananas. Parser errors:");
                        for error in errors {
                            eprintln!("  {}", error);
                        }
                        continue;
                    }
                };

                let mut compiler = Compiler::with_state(symbols, constants);
                if let Err(e) = compiler.compile(&program) {
                    eprintln!("Compile error: {}", e);
                    (symbols, constants) = compiler.into_state();
                    continue;
                }

                let bytecode = compiler.bytecode();
                (symbols, constants) = compiler.into_state();

                let mut machine = VM::with_globals(bytecode, globals);
                match machine.run() {
                    Ok(()) => println!("{}", machine.last_popped()),
                    Err(e) => eprintln!("Runtime error: {}", e),
                }
                globals = machine.into_globals();
            }
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
}
