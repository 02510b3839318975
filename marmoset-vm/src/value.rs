// marmoset-vm - Runtime value types for Marmoset
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Core value type for Marmoset.
//!
//! `Value` is the central enum representing all runtime values, shared by
//! the compiler (constants pool) and the VM (operand stack, globals).
//!
//! Equality comes in two flavours. The derived `PartialEq` is structural
//! and exists for host code and tests. The guest language's `==`/`!=` use
//! identity semantics instead (see `vm`): booleans and null are interned
//! and compare by value, everything else by reference.

use std::fmt;
use std::rc::Rc;

use im::{HashMap, Vector};

use crate::builtins::Builtin;
use crate::bytecode::Instructions;

/// The canonical `true` value.
pub const TRUE: Value = Value::Boolean(true);

/// The canonical `false` value.
pub const FALSE: Value = Value::Boolean(false);

/// The canonical null value.
pub const NULL: Value = Value::Null;

/// A Marmoset runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A 64-bit signed integer.
    Integer(i64),

    /// A boolean. Guest code only ever sees the canonical [`TRUE`] and
    /// [`FALSE`] values.
    Boolean(bool),

    /// The null value.
    Null,

    /// An immutable string. Shared by reference; the guest `==` compares
    /// string references, not contents.
    Str(Rc<str>),

    /// A zero-indexed, insertion-ordered array.
    Array(Vector<Value>),

    /// A hash table keyed by [`HashKey`], storing the original key
    /// alongside each value. Iteration order is unspecified.
    Hash(HashMap<HashKey, HashPair>),

    /// A compiled function body. Lives in the constants pool; guest code
    /// only ever handles closures.
    Function(Rc<CompiledFunction>),

    /// A compiled function bound to its captured free variables.
    Closure(Rc<Closure>),

    /// A built-in function provided by the host.
    Builtin(&'static Builtin),
}

impl Value {
    /// Create a string value.
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    /// Create an array value from a vector of elements.
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Vector::from(elements))
    }

    /// The canonical boolean for a host bool.
    #[inline]
    pub fn from_native_bool(b: bool) -> Value {
        if b { TRUE } else { FALSE }
    }

    /// The type name for display and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
            Value::Function(_) => "compiled-function",
            Value::Closure(_) => "closure",
            Value::Builtin(_) => "builtin",
        }
    }

    /// Everything is truthy except `false` and `null`.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    /// Derive the hash key for this value, or `None` if the type is not
    /// hashable. Only integers, booleans, and strings are hashable.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Integer(n) => Some(HashKey {
                tag: HashKeyTag::Integer,
                value: *n as u64,
            }),
            Value::Boolean(b) => Some(HashKey {
                tag: HashKeyTag::Boolean,
                value: u64::from(*b),
            }),
            Value::Str(s) => Some(HashKey {
                tag: HashKeyTag::String,
                value: fnv1a_64(s.as_bytes()),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(elements) => {
                let elems: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elems.join(", "))
            }
            Value::Hash(pairs) => {
                let pairs: Vec<String> = pairs
                    .values()
                    .map(|p| format!("{}: {}", p.key, p.value))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Value::Function(_) => write!(f, "#<compiled-fn>"),
            Value::Closure(_) => write!(f, "#<closure>"),
            Value::Builtin(b) => write!(f, "#<builtin {}>", b.name),
        }
    }
}

/// Type tag of a hash key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKeyTag {
    Integer,
    Boolean,
    String,
}

/// Derived hash key: a type tag plus a 64-bit value.
///
/// Integers reinterpret their bits as unsigned, booleans map to 0/1, and
/// strings hash their bytes with FNV-1a. Two structurally equal hashable
/// values always derive equal keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub tag: HashKeyTag,
    pub value: u64,
}

/// A key/value entry of a hash, keeping the original key for display.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

/// A compiled function body.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    /// The function's bytecode.
    pub instructions: Instructions,

    /// Number of local slots needed (parameters included).
    pub num_locals: usize,

    /// Number of declared parameters.
    pub num_parameters: usize,
}

/// A runtime-bound function: a compiled body plus the values of its free
/// variables captured at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub function: Rc<CompiledFunction>,

    /// Captured free variables, in the order the compiler emitted them.
    pub free: Vec<Value>,
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over a byte slice.
fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_hash_keys_match_for_equal_contents() {
        let a = Value::string("Hello World");
        let b = Value::string("Hello World");
        let c = Value::string("My name is johnny");
        assert_eq!(a.hash_key(), b.hash_key());
        assert_ne!(a.hash_key(), c.hash_key());
    }

    #[test]
    fn integer_and_boolean_hash_keys() {
        assert_eq!(
            Value::Integer(-1).hash_key(),
            Some(HashKey {
                tag: HashKeyTag::Integer,
                value: (-1i64) as u64,
            })
        );
        assert_eq!(
            TRUE.hash_key(),
            Some(HashKey {
                tag: HashKeyTag::Boolean,
                value: 1,
            })
        );
        assert_eq!(FALSE.hash_key().map(|k| k.value), Some(0));
    }

    #[test]
    fn same_value_different_types_get_different_keys() {
        assert_ne!(Value::Integer(1).hash_key(), TRUE.hash_key());
    }

    #[test]
    fn unhashable_values() {
        assert_eq!(Value::array(vec![]).hash_key(), None);
        assert_eq!(NULL.hash_key(), None);
    }

    #[test]
    fn truthiness() {
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(TRUE.is_truthy());
        assert!(!FALSE.is_truthy());
        assert!(!NULL.is_truthy());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Integer(5).to_string(), "5");
        assert_eq!(TRUE.to_string(), "true");
        assert_eq!(NULL.to_string(), "null");
        assert_eq!(Value::string("hi").to_string(), "hi");
        let arr = Value::array(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(arr.to_string(), "[1, 2]");
    }
}
