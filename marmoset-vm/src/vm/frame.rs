// marmoset-vm - Call frames for the Marmoset VM
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use crate::bytecode::Instructions;
use crate::value::Closure;

/// A call frame on the VM's frame stack.
#[derive(Debug)]
pub struct Frame {
    closure: Rc<Closure>,

    /// Instruction pointer into the closure's bytecode. Starts at -1:
    /// the dispatch loop pre-increments before every fetch.
    pub ip: isize,

    /// Index of the first local slot on the operand stack. Arguments
    /// occupy the first `num_parameters` local slots.
    pub base_pointer: usize,
}

impl Frame {
    /// Create a frame for a closure whose locals start at `base_pointer`.
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Frame {
            closure,
            ip: -1,
            base_pointer,
        }
    }

    /// The closure being executed.
    #[inline]
    pub fn closure(&self) -> &Rc<Closure> {
        &self.closure
    }

    /// The bytecode this frame is executing.
    #[inline]
    pub fn instructions(&self) -> &Instructions {
        &self.closure.function.instructions
    }
}
