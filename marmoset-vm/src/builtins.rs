// marmoset-vm - Built-in functions for Marmoset
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The built-in function library: len, puts, first, last, rest, push.
//!
//! Builtins are registered in the compiler's root symbol table in the
//! order they appear in [`BUILTINS`]; `OpGetBuiltin` operands index this
//! table directly.

use crate::value::{NULL, Value};
use crate::vm::error::{Result, RuntimeError};

/// Host function signature for builtins.
pub type BuiltinFn = fn(&[Value]) -> Result<Value>;

/// A named built-in function.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// All builtins, in registration order. Indices are stable: `OpGetBuiltin n`
/// pushes `BUILTINS[n]`.
pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "len",
        func: builtin_len,
    },
    Builtin {
        name: "puts",
        func: builtin_puts,
    },
    Builtin {
        name: "first",
        func: builtin_first,
    },
    Builtin {
        name: "last",
        func: builtin_last,
    },
    Builtin {
        name: "rest",
        func: builtin_rest,
    },
    Builtin {
        name: "push",
        func: builtin_push,
    },
];

// ============================================================================
// Implementations
// ============================================================================

/// (len x) - length of a string, array, or hash.
fn builtin_len(args: &[Value]) -> Result<Value> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Integer(s.len() as i64)),
        Value::Array(elements) => Ok(Value::Integer(elements.len() as i64)),
        Value::Hash(pairs) => Ok(Value::Integer(pairs.len() as i64)),
        other => Err(RuntimeError::UnsupportedArgument {
            builtin: "len",
            got: other.type_name(),
        }),
    }
}

/// (puts ...) - print each argument's display form on its own line.
fn builtin_puts(args: &[Value]) -> Result<Value> {
    for arg in args {
        println!("{}", arg);
    }
    Ok(NULL)
}

/// (first array) - first element, or null for an empty array.
fn builtin_first(args: &[Value]) -> Result<Value> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => Ok(elements.front().cloned().unwrap_or(NULL)),
        other => Err(RuntimeError::UnsupportedArgument {
            builtin: "first",
            got: other.type_name(),
        }),
    }
}

/// (last array) - last element, or null for an empty array.
fn builtin_last(args: &[Value]) -> Result<Value> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => Ok(elements.back().cloned().unwrap_or(NULL)),
        other => Err(RuntimeError::UnsupportedArgument {
            builtin: "last",
            got: other.type_name(),
        }),
    }
}

/// (rest array) - a new array without the first element, or null for an
/// empty array.
fn builtin_rest(args: &[Value]) -> Result<Value> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::Array(elements) => {
            if elements.is_empty() {
                Ok(NULL)
            } else {
                Ok(Value::Array(elements.clone().split_off(1)))
            }
        }
        other => Err(RuntimeError::UnsupportedArgument {
            builtin: "rest",
            got: other.type_name(),
        }),
    }
}

/// (push array x) - a new array with x appended.
fn builtin_push(args: &[Value]) -> Result<Value> {
    check_arity(args, 2)?;
    match &args[0] {
        Value::Array(elements) => {
            let mut extended = elements.clone();
            extended.push_back(args[1].clone());
            Ok(Value::Array(extended))
        }
        other => Err(RuntimeError::UnsupportedArgument {
            builtin: "push",
            got: other.type_name(),
        }),
    }
}

fn check_arity(args: &[Value], want: usize) -> Result<()> {
    if args.len() != want {
        return Err(RuntimeError::WrongArguments {
            want,
            got: args.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_of_strings_arrays_hashes() {
        assert_eq!(
            builtin_len(&[Value::string("four")]),
            Ok(Value::Integer(4))
        );
        assert_eq!(builtin_len(&[Value::string("")]), Ok(Value::Integer(0)));
        assert_eq!(
            builtin_len(&[Value::array(vec![Value::Integer(1), Value::Integer(2)])]),
            Ok(Value::Integer(2))
        );
    }

    #[test]
    fn len_rejects_other_types() {
        assert_eq!(
            builtin_len(&[Value::Integer(1)]),
            Err(RuntimeError::UnsupportedArgument {
                builtin: "len",
                got: "integer",
            })
        );
    }

    #[test]
    fn len_arity() {
        assert_eq!(
            builtin_len(&[Value::string("a"), Value::string("b")]),
            Err(RuntimeError::WrongArguments { want: 1, got: 2 })
        );
    }

    #[test]
    fn first_and_last() {
        let arr = Value::array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(builtin_first(&[arr.clone()]), Ok(Value::Integer(1)));
        assert_eq!(builtin_last(&[arr]), Ok(Value::Integer(3)));
        assert_eq!(builtin_first(&[Value::array(vec![])]), Ok(NULL));
        assert_eq!(builtin_last(&[Value::array(vec![])]), Ok(NULL));
    }

    #[test]
    fn rest_drops_the_head_without_mutating() {
        let arr = Value::array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(
            builtin_rest(&[arr.clone()]),
            Ok(Value::array(vec![Value::Integer(2), Value::Integer(3)]))
        );
        // Original array untouched.
        assert_eq!(
            arr,
            Value::array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)])
        );
        assert_eq!(builtin_rest(&[Value::array(vec![])]), Ok(NULL));
    }

    #[test]
    fn push_appends_to_a_copy() {
        let arr = Value::array(vec![]);
        assert_eq!(
            builtin_push(&[arr.clone(), Value::Integer(1)]),
            Ok(Value::array(vec![Value::Integer(1)]))
        );
        assert_eq!(arr, Value::array(vec![]));
    }

    #[test]
    fn registration_order_is_stable() {
        let names: Vec<&str> = BUILTINS.iter().map(|b| b.name).collect();
        assert_eq!(names, ["len", "puts", "first", "last", "rest", "push"]);
    }
}
