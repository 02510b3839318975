// marmoset-vm - Code generation for the Marmoset compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: transforms the AST into bytecode.
//!
//! The compiler is a recursive walker over the statement and expression
//! enums. It keeps a stack of compilation scopes (one per function being
//! compiled), a single shared constants pool, and the current symbol
//! table. Forward jumps are emitted with a placeholder operand and
//! back-patched once the target offset is known.

use std::fmt;
use std::rc::Rc;

use marmoset_parser::ast::{BlockStatement, Expression, Program, Statement};

use crate::builtins::BUILTINS;
use crate::bytecode::{Bytecode, Instructions, make};
use crate::opcode::Op;
use crate::value::{CompiledFunction, Value};

use super::scope::CompilationScope;
use super::symbols::{Symbol, SymbolScope, SymbolTable};

/// Error during compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Reference to a name no scope defines.
    UndefinedVariable(String),
    /// Infix operator the compiler has no opcode for.
    UnknownOperator(String),
    /// Prefix operator the compiler has no opcode for.
    UnknownPrefixOperator(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UndefinedVariable(name) => write!(f, "undefined variable {}", name),
            CompileError::UnknownOperator(op) => write!(f, "unknown operator {}", op),
            CompileError::UnknownPrefixOperator(op) => {
                write!(f, "unknown prefix operator {}", op)
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// The bytecode compiler.
pub struct Compiler {
    constants: Vec<Value>,
    symbols: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    /// Create a compiler with a fresh symbol table. Builtins are
    /// pre-defined in the root scope.
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbols.define_builtin(index, builtin.name);
        }

        Compiler {
            constants: Vec::new(),
            symbols,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Create a compiler that continues from existing state. The REPL
    /// uses this to share the symbol table and constants pool across
    /// lines.
    pub fn with_state(symbols: SymbolTable, constants: Vec<Value>) -> Self {
        Compiler {
            constants,
            symbols,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Hand the symbol table and constants pool back, for the next
    /// incremental compilation.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbols, self.constants)
    }

    /// Compile a program into the current scope.
    pub fn compile(&mut self, program: &Program) -> Result<()> {
        for statement in &program.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// Snapshot of the top-level instructions and the constants pool.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.current_scope().instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compile_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Let { name, value } => {
                // Defined before the value compiles so the value can
                // refer to the binding (global recursion).
                let symbol = self.symbols.define(name);
                self.compile_expression(value)?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Op::SetGlobal, &[symbol.index]),
                    _ => self.emit(Op::SetLocal, &[symbol.index]),
                };
            }
            Statement::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Op::ReturnValue, &[]);
            }
            Statement::Expression(expression) => {
                self.compile_expression(expression)?;
                self.emit(Op::Pop, &[]);
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<()> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn compile_expression(&mut self, expression: &Expression) -> Result<()> {
        match expression {
            Expression::IntegerLiteral(value) => {
                let index = self.add_constant(Value::Integer(*value));
                self.emit(Op::Constant, &[index]);
            }

            Expression::StringLiteral(value) => {
                let index = self.add_constant(Value::string(value.as_str()));
                self.emit(Op::Constant, &[index]);
            }

            Expression::BooleanLiteral(true) => {
                self.emit(Op::True, &[]);
            }
            Expression::BooleanLiteral(false) => {
                self.emit(Op::False, &[]);
            }

            Expression::Identifier(name) => {
                let symbol = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.load_symbol(&symbol);
            }

            Expression::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator.as_str() {
                    "-" => self.emit(Op::Minus, &[]),
                    "!" => self.emit(Op::Bang, &[]),
                    other => {
                        return Err(CompileError::UnknownPrefixOperator(other.to_string()));
                    }
                };
            }

            Expression::Infix {
                left,
                operator,
                right,
            } => {
                // There is no less-than opcode: compile the operands
                // swapped and emit greater-than.
                if operator == "<" {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Op::GreaterThan, &[]);
                    return Ok(());
                }

                self.compile_expression(left)?;
                self.compile_expression(right)?;
                let op = match operator.as_str() {
                    "+" => Op::Add,
                    "-" => Op::Sub,
                    "*" => Op::Mul,
                    "/" => Op::Div,
                    ">" => Op::GreaterThan,
                    "==" => Op::Equal,
                    "!=" => Op::NotEqual,
                    other => return Err(CompileError::UnknownOperator(other.to_string())),
                };
                self.emit(op, &[]);
            }

            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                // Placeholder target, patched after the consequence.
                let jump_not_truthy = self.emit(Op::JumpNotTruthy, &[9999]);

                self.compile_block(consequence)?;
                if self.current_scope().last_is(Op::Pop) {
                    self.current_scope_mut().remove_last();
                }

                let jump = self.emit(Op::Jump, &[9999]);

                let after_consequence = self.current_scope().instructions.len();
                self.change_operand(jump_not_truthy, after_consequence);

                match alternative {
                    None => {
                        self.emit(Op::Null, &[]);
                    }
                    Some(alternative) => {
                        self.compile_block(alternative)?;
                        if self.current_scope().last_is(Op::Pop) {
                            self.current_scope_mut().remove_last();
                        }
                    }
                }

                let after_alternative = self.current_scope().instructions.len();
                self.change_operand(jump, after_alternative);
            }

            Expression::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Op::Array, &[elements.len()]);
            }

            Expression::HashLiteral(pairs) => {
                // The pair list comes in source order; sort by the key's
                // source form so compilation output is deterministic.
                let mut sorted: Vec<&(Expression, Expression)> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());

                for (key, value) in sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Op::Hash, &[pairs.len() * 2]);
            }

            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Op::Index, &[]);
            }

            Expression::FunctionLiteral { parameters, body } => {
                self.enter_scope();

                for parameter in parameters {
                    self.symbols.define(parameter);
                }

                self.compile_block(body)?;

                // A body ending in an expression statement keeps its
                // value: the trailing pop becomes the return.
                if self.current_scope().last_is(Op::Pop) {
                    self.replace_last_with_return();
                }
                if !self.current_scope().last_is(Op::ReturnValue) {
                    self.emit(Op::Return, &[]);
                }

                let (instructions, free_symbols, num_locals) = self.leave_scope();

                for free in &free_symbols {
                    self.load_symbol(free);
                }

                let function = CompiledFunction {
                    instructions,
                    num_locals,
                    num_parameters: parameters.len(),
                };
                let index = self.add_constant(Value::Function(Rc::new(function)));
                self.emit(Op::Closure, &[index, free_symbols.len()]);
            }

            Expression::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Op::Call, &[arguments.len()]);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Emission helpers
    // ========================================================================

    /// Append a constant to the pool and return its index. Indices are
    /// stable for the lifetime of the pool.
    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Encode and append an instruction to the current scope, returning
    /// its byte position.
    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let scope = self.current_scope_mut();
        let position = scope.instructions.append(&instruction);
        scope.record(op, position);
        position
    }

    /// Re-encode the instruction at `position` with a new operand. The
    /// opcode (and therefore the operand width) stays the same.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let byte = self.current_scope().instructions.as_bytes()[position];
        match Op::from_byte(byte) {
            Some(op) => {
                let instruction = make(op, &[operand]);
                self.current_scope_mut()
                    .instructions
                    .replace_at(position, instruction.as_bytes());
            }
            None => debug_assert!(false, "change_operand at non-opcode byte {}", byte),
        }
    }

    /// Replace the last emitted instruction (an `OpPop`) with
    /// `OpReturnValue`; both are operand-free so widths match.
    fn replace_last_with_return(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = &mut scope.last {
            let position = last.position;
            last.opcode = Op::ReturnValue;
            let instruction = make(Op::ReturnValue, &[]);
            scope.instructions.replace_at(position, instruction.as_bytes());
        }
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Op::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Op::GetFree, &[symbol.index]),
        };
    }

    // ========================================================================
    // Scope management
    // ========================================================================

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().expect("no compilation scope")
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("no compilation scope")
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = std::mem::take(&mut self.symbols);
        self.symbols = SymbolTable::enclosed(outer);
    }

    /// Pop the current function scope. Returns its instructions, the
    /// free symbols it captured (in capture order), and its local count.
    fn leave_scope(&mut self) -> (Instructions, Vec<Symbol>, usize) {
        let num_locals = self.symbols.num_definitions;
        let free_symbols = std::mem::take(&mut self.symbols.free_symbols);

        let scope = self.scopes.pop().expect("no compilation scope");
        self.symbols = self.symbols.take_outer().unwrap_or_default();

        (scope.instructions, free_symbols, num_locals)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
