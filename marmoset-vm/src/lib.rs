// marmoset-vm - Bytecode compiler and virtual machine for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler and stack-based virtual machine for Marmoset.
//!
//! The compiler walks the AST produced by `marmoset-parser` and emits a
//! linear byte-encoded instruction stream plus a constants pool. The VM
//! executes that bytecode on a fixed-capacity operand stack with explicit
//! call frames, closures, and a small built-in library.

pub mod builtins;
pub mod bytecode;
pub mod compiler;
pub mod opcode;
pub mod value;
pub mod vm;

pub use bytecode::{Bytecode, Instructions, make, read_operands, read_u8, read_u16};
pub use compiler::{CompileError, Compiler, Symbol, SymbolScope, SymbolTable};
pub use opcode::Op;
pub use value::{Closure, CompiledFunction, HashKey, HashPair, Value};
pub use vm::{GLOBALS_SIZE, MAX_FRAMES, RuntimeError, STACK_SIZE, VM};
