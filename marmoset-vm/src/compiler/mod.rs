// marmoset-vm - Bytecode compiler for the Marmoset programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms the Marmoset AST to bytecode.
//!
//! Scope and closure analysis happen inline during the walk: the symbol
//! table resolves names against nested scopes, promoting captures to
//! free symbols, and the compiler emits the matching load instructions
//! when it closes over a function.

pub mod codegen;
pub mod scope;
pub mod symbols;

pub use codegen::{CompileError, Compiler, Result};
pub use scope::{CompilationScope, EmittedInstruction};
pub use symbols::{Symbol, SymbolScope, SymbolTable};
