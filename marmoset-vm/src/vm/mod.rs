// marmoset-vm - Stack-based virtual machine for Marmoset
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing Marmoset bytecode.
//!
//! Execution is single-threaded and runs to completion: `run` either
//! drains the main frame's instructions or stops at the first runtime
//! error. A synthetic "main" closure wraps the top-level instructions so
//! the dispatch loop only ever deals with frames.

pub mod error;
pub mod frame;
pub mod stack;

use std::rc::Rc;

use im::HashMap;

use crate::builtins::{BUILTINS, Builtin};
use crate::bytecode::{Bytecode, read_u16, read_u8};
use crate::opcode::Op;
use crate::value::{Closure, CompiledFunction, FALSE, HashPair, NULL, TRUE, Value};

pub use error::{Result, RuntimeError};
pub use frame::Frame;
pub use stack::{STACK_SIZE, ValueStack};

/// Globals array capacity. A u16 operand cannot address beyond it.
pub const GLOBALS_SIZE: usize = 65536;

/// Maximum call depth.
pub const MAX_FRAMES: usize = 1024;

/// The Marmoset virtual machine.
pub struct VM {
    constants: Vec<Value>,
    stack: ValueStack,
    globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl VM {
    /// Create a VM for a compiled program.
    pub fn new(bytecode: Bytecode) -> Self {
        VM::with_globals(bytecode, vec![NULL; GLOBALS_SIZE])
    }

    /// Create a VM that reuses an existing globals array. The REPL uses
    /// this to keep globals alive across lines.
    pub fn with_globals(bytecode: Bytecode, globals: Vec<Value>) -> Self {
        let main_fn = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Closure {
            function: Rc::new(main_fn),
            free: Vec::new(),
        };

        let mut frames = Vec::with_capacity(MAX_FRAMES);
        frames.push(Frame::new(Rc::new(main_closure), 0));

        VM {
            constants: bytecode.constants,
            stack: ValueStack::new(),
            globals,
            frames,
        }
    }

    /// Hand the globals array back, for the next incremental run.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The value most recently popped off the operand stack. For a
    /// program that ran to completion this is the value of its last
    /// expression statement.
    pub fn last_popped(&self) -> &Value {
        self.stack.last_popped()
    }

    /// Execute until the main frame runs out of instructions or a
    /// runtime error occurs.
    pub fn run(&mut self) -> Result<()> {
        while self.current_frame().ip < self.current_frame().instructions().len() as isize - 1 {
            let op = self.fetch()?;

            match op {
                // Constants & stack
                Op::Constant => {
                    let index = self.read_u16_operand();
                    let value = self.constants[index].clone();
                    self.stack.push(value)?;
                }
                Op::Pop => {
                    self.stack.pop()?;
                }

                // Operators
                Op::Add | Op::Sub | Op::Mul | Op::Div => {
                    self.execute_binary_operation(op)?;
                }
                Op::True => self.stack.push(TRUE)?,
                Op::False => self.stack.push(FALSE)?,
                Op::Equal | Op::NotEqual | Op::GreaterThan => {
                    self.execute_comparison(op)?;
                }
                Op::Bang => self.execute_bang_operator()?,
                Op::Minus => self.execute_minus_operator()?,

                // Control flow
                Op::Jump => {
                    let target = self.read_u16_operand();
                    // -1 because the loop pre-increments.
                    self.current_frame_mut().ip = target as isize - 1;
                }
                Op::JumpNotTruthy => {
                    let target = self.read_u16_operand();
                    let condition = self.stack.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target as isize - 1;
                    }
                }
                Op::Null => self.stack.push(NULL)?,

                // Variables
                Op::SetGlobal => {
                    let index = self.read_u16_operand();
                    self.globals[index] = self.stack.pop()?;
                }
                Op::GetGlobal => {
                    let index = self.read_u16_operand();
                    let value = self.globals[index].clone();
                    self.stack.push(value)?;
                }
                Op::SetLocal => {
                    let slot = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack.pop()?;
                    self.stack.set(base + slot, value);
                }
                Op::GetLocal => {
                    let slot = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack.get(base + slot).clone();
                    self.stack.push(value)?;
                }
                Op::GetBuiltin => {
                    let index = self.read_u8_operand();
                    self.stack.push(Value::Builtin(&BUILTINS[index]))?;
                }
                Op::GetFree => {
                    let index = self.read_u8_operand();
                    let value = self.current_frame().closure().free[index].clone();
                    self.stack.push(value)?;
                }

                // Composites
                Op::Array => {
                    let count = self.read_u16_operand();
                    let sp = self.stack.sp();
                    let elements = self.stack.slice(sp - count, sp).iter().cloned().collect();
                    self.stack.set_sp(sp - count);
                    self.stack.push(Value::Array(elements))?;
                }
                Op::Hash => {
                    let count = self.read_u16_operand();
                    let sp = self.stack.sp();
                    let hash = build_hash(self.stack.slice(sp - count, sp))?;
                    self.stack.set_sp(sp - count);
                    self.stack.push(hash)?;
                }
                Op::Index => {
                    let index = self.stack.pop()?;
                    let left = self.stack.pop()?;
                    self.execute_index_expression(left, index)?;
                }

                // Functions & closures
                Op::Call => {
                    let num_args = self.read_u8_operand();
                    self.execute_call(num_args)?;
                }
                Op::ReturnValue => {
                    let value = self.stack.pop()?;
                    let frame = self.pop_frame();
                    self.stack.set_sp(frame.base_pointer - 1);
                    self.stack.push(value)?;
                }
                Op::Return => {
                    let frame = self.pop_frame();
                    self.stack.set_sp(frame.base_pointer - 1);
                    self.stack.push(NULL)?;
                }
                Op::Closure => {
                    let const_index = self.read_u16_operand();
                    let num_free = self.read_u8_operand();
                    self.push_closure(const_index, num_free)?;
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // Dispatch helpers
    // ========================================================================

    /// Advance the instruction pointer and decode the opcode there.
    fn fetch(&mut self) -> Result<Op> {
        let frame = self.current_frame_mut();
        frame.ip += 1;
        let byte = frame.instructions().as_bytes()[frame.ip as usize];
        Op::from_byte(byte).ok_or(RuntimeError::UnknownOpcode(byte))
    }

    fn read_u16_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let ip = frame.ip as usize;
        let value = read_u16(&frame.instructions().as_bytes()[ip + 1..]) as usize;
        frame.ip += 2;
        value
    }

    fn read_u8_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let ip = frame.ip as usize;
        let value = read_u8(&frame.instructions().as_bytes()[ip + 1..]) as usize;
        frame.ip += 1;
        value
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("no active frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    fn pop_frame(&mut self) -> Frame {
        self.frames.pop().expect("no active frame")
    }

    // ========================================================================
    // Operator semantics
    // ========================================================================

    fn execute_binary_operation(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => {
                self.execute_binary_integer_operation(op, *l, *r)
            }
            (Value::Str(l), Value::Str(r)) => {
                if op != Op::Add {
                    return Err(RuntimeError::UnknownStringOperator { operator: op.name() });
                }
                let mut concat = String::with_capacity(l.len() + r.len());
                concat.push_str(l);
                concat.push_str(r);
                self.stack.push(Value::string(concat))
            }
            _ => Err(RuntimeError::UnsupportedBinaryTypes {
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    /// Integer arithmetic wraps on overflow.
    fn execute_binary_integer_operation(&mut self, op: Op, left: i64, right: i64) -> Result<()> {
        let result = match op {
            Op::Add => left.wrapping_add(right),
            Op::Sub => left.wrapping_sub(right),
            Op::Mul => left.wrapping_mul(right),
            Op::Div => {
                if right == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                left.wrapping_div(right)
            }
            other => return Err(RuntimeError::UnknownOpcode(other as u8)),
        };
        self.stack.push(Value::Integer(result))
    }

    fn execute_comparison(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        if let (Value::Integer(l), Value::Integer(r)) = (&left, &right) {
            let result = match op {
                Op::Equal => l == r,
                Op::NotEqual => l != r,
                Op::GreaterThan => l > r,
                other => return Err(RuntimeError::UnknownOpcode(other as u8)),
            };
            return self.stack.push(Value::from_native_bool(result));
        }

        // Non-integer comparison is by identity: booleans and null are
        // interned, so they compare by value; everything else compares
        // by reference.
        match op {
            Op::Equal => self
                .stack
                .push(Value::from_native_bool(identity_eq(&left, &right))),
            Op::NotEqual => self
                .stack
                .push(Value::from_native_bool(!identity_eq(&left, &right))),
            _ => Err(RuntimeError::UnsupportedBinaryTypes {
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn execute_bang_operator(&mut self) -> Result<()> {
        let operand = self.stack.pop()?;
        let result = match operand {
            Value::Boolean(true) => FALSE,
            Value::Boolean(false) => TRUE,
            Value::Null => TRUE,
            _ => FALSE,
        };
        self.stack.push(result)
    }

    fn execute_minus_operator(&mut self) -> Result<()> {
        let operand = self.stack.pop()?;
        match operand {
            Value::Integer(value) => self.stack.push(Value::Integer(value.wrapping_neg())),
            other => Err(RuntimeError::UnsupportedNegation {
                operand: other.type_name(),
            }),
        }
    }

    // ========================================================================
    // Indexing
    // ========================================================================

    fn execute_index_expression(&mut self, left: Value, index: Value) -> Result<()> {
        match (left, index) {
            (Value::Array(elements), Value::Integer(i)) => {
                if i < 0 || i as usize >= elements.len() {
                    self.stack.push(NULL)
                } else {
                    self.stack.push(elements[i as usize].clone())
                }
            }
            (Value::Hash(pairs), index) => {
                let key = index.hash_key().ok_or(RuntimeError::UnusableHashKey {
                    key: index.type_name(),
                })?;
                match pairs.get(&key) {
                    Some(pair) => self.stack.push(pair.value.clone()),
                    None => self.stack.push(NULL),
                }
            }
            (left, _) => Err(RuntimeError::NotIndexable {
                left: left.type_name(),
            }),
        }
    }

    // ========================================================================
    // Calls, returns, closures
    // ========================================================================

    fn execute_call(&mut self, num_args: usize) -> Result<()> {
        let callee = self.stack.get(self.stack.sp() - 1 - num_args).clone();
        match callee {
            Value::Closure(closure) => self.call_closure(closure, num_args),
            Value::Builtin(builtin) => self.call_builtin(builtin, num_args),
            _ => Err(RuntimeError::NotCallable),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, num_args: usize) -> Result<()> {
        if num_args != closure.function.num_parameters {
            return Err(RuntimeError::WrongArguments {
                want: closure.function.num_parameters,
                got: num_args,
            });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::FrameOverflow);
        }

        // Arguments already sit in the first local slots; the rest of the
        // locals are reserved by bumping sp past them.
        let base_pointer = self.stack.sp() - num_args;
        let frame_sp = base_pointer + closure.function.num_locals;
        if frame_sp > STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }

        self.frames.push(Frame::new(closure, base_pointer));
        self.stack.set_sp(frame_sp);
        Ok(())
    }

    fn call_builtin(&mut self, builtin: &'static Builtin, num_args: usize) -> Result<()> {
        let sp = self.stack.sp();
        let args: Vec<Value> = self.stack.slice(sp - num_args, sp).to_vec();

        let result = (builtin.func)(&args)?;

        // Drop arguments and the callee, then push the result.
        self.stack.set_sp(sp - num_args - 1);
        self.stack.push(result)
    }

    fn push_closure(&mut self, const_index: usize, num_free: usize) -> Result<()> {
        let function = match &self.constants[const_index] {
            Value::Function(function) => Rc::clone(function),
            other => {
                return Err(RuntimeError::NotAFunction {
                    got: other.type_name(),
                });
            }
        };

        let sp = self.stack.sp();
        let free = self.stack.slice(sp - num_free, sp).to_vec();
        self.stack.set_sp(sp - num_free);

        self.stack
            .push(Value::Closure(Rc::new(Closure { function, free })))
    }
}

/// Guest-level identity equality: booleans and null by value, everything
/// else by reference. Structurally equal strings are *not* equal here.
fn identity_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Boolean(l), Value::Boolean(r)) => l == r,
        (Value::Null, Value::Null) => true,
        (Value::Str(l), Value::Str(r)) => Rc::ptr_eq(l, r),
        (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
        (Value::Closure(l), Value::Closure(r)) => Rc::ptr_eq(l, r),
        (Value::Builtin(l), Value::Builtin(r)) => std::ptr::eq(*l, *r),
        _ => false,
    }
}

/// Build a hash from key/value pairs laid out flat on the stack.
fn build_hash(slots: &[Value]) -> Result<Value> {
    let mut pairs = HashMap::new();
    for pair in slots.chunks(2) {
        let key = &pair[0];
        let value = &pair[1];
        let hash_key = key.hash_key().ok_or(RuntimeError::UnusableHashKey {
            key: key.type_name(),
        })?;
        pairs.insert(
            hash_key,
            HashPair {
                key: key.clone(),
                value: value.clone(),
            },
        );
    }
    Ok(Value::Hash(pairs))
}
