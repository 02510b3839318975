// marmoset-vm - Runtime errors for the Marmoset VM
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.

use std::fmt;

/// Runtime error during VM execution. Errors are fatal to the guest
/// program: they propagate out of `run` and halt execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Operand stack capacity exceeded.
    StackOverflow,
    /// Pop from an empty operand stack.
    StackUnderflow,
    /// Frame stack capacity exceeded.
    FrameOverflow,
    /// Wrong number of call arguments.
    WrongArguments { want: usize, got: usize },
    /// Binary operator applied to an unsupported type combination.
    UnsupportedBinaryTypes {
        left: &'static str,
        right: &'static str,
    },
    /// Binary operator other than `+` applied to two strings.
    UnknownStringOperator { operator: &'static str },
    /// Unary minus applied to a non-integer.
    UnsupportedNegation { operand: &'static str },
    /// Integer division by zero.
    DivisionByZero,
    /// Hash construction or lookup with an unhashable key.
    UnusableHashKey { key: &'static str },
    /// Call of a value that is neither a closure nor a builtin.
    NotCallable,
    /// Index operator applied to a non-indexable value.
    NotIndexable { left: &'static str },
    /// A closure constant slot did not hold a compiled function.
    NotAFunction { got: &'static str },
    /// Built-in invoked with an argument of the wrong type.
    UnsupportedArgument {
        builtin: &'static str,
        got: &'static str,
    },
    /// Dispatch hit an undefined opcode byte.
    UnknownOpcode(u8),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackOverflow => write!(f, "stack overflow"),
            RuntimeError::StackUnderflow => write!(f, "stack underflow"),
            RuntimeError::FrameOverflow => write!(f, "frame overflow"),
            RuntimeError::WrongArguments { want, got } => {
                write!(f, "wrong number of arguments: want={}, got={}", want, got)
            }
            RuntimeError::UnsupportedBinaryTypes { left, right } => {
                write!(f, "unsupported types for binary operation: {} {}", left, right)
            }
            RuntimeError::UnknownStringOperator { operator } => {
                write!(f, "unknown string operator: {}", operator)
            }
            RuntimeError::UnsupportedNegation { operand } => {
                write!(f, "unsupported type for negation: {}", operand)
            }
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::UnusableHashKey { key } => {
                write!(f, "unusable as hash key: {}", key)
            }
            RuntimeError::NotCallable => write!(f, "calling non-function/non-builtin"),
            RuntimeError::NotIndexable { left } => {
                write!(f, "index operator not supported: {}", left)
            }
            RuntimeError::NotAFunction { got } => write!(f, "not a function: {}", got),
            RuntimeError::UnsupportedArgument { builtin, got } => {
                write!(f, "argument to {} not supported: {}", builtin, got)
            }
            RuntimeError::UnknownOpcode(byte) => write!(f, "unknown opcode: {}", byte),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
