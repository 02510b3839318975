// marmoset-parser - AST node types for Marmoset
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! AST node types for Marmoset.
//!
//! Every node implements `Display`, producing a stable, parenthesised
//! source form. The compiler relies on this form being deterministic:
//! hash-literal keys are ordered by it before code generation.

use std::fmt;

/// A complete parsed program: a sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let <name> = <value>;`
    Let { name: String, value: Expression },

    /// `return <value>;`
    Return(Expression),

    /// A bare expression in statement position.
    Expression(Expression),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "let {} = {};", name, value),
            Statement::Return(value) => write!(f, "return {};", value),
            Statement::Expression(expr) => write!(f, "{}", expr),
        }
    }
}

/// A brace-delimited sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A variable reference.
    Identifier(String),

    /// An integer literal.
    IntegerLiteral(i64),

    /// A string literal.
    StringLiteral(String),

    /// `true` or `false`.
    BooleanLiteral(bool),

    /// A prefix operation: `-x` or `!x`.
    Prefix {
        operator: String,
        right: Box<Expression>,
    },

    /// A binary operation: `a + b`, `a == b`, ...
    Infix {
        left: Box<Expression>,
        operator: String,
        right: Box<Expression>,
    },

    /// `if (<condition>) { <consequence> } else { <alternative> }`.
    /// The else branch is optional; an if-expression produces a value.
    If {
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },

    /// `fn(<parameters>) { <body> }`.
    FunctionLiteral {
        parameters: Vec<String>,
        body: BlockStatement,
    },

    /// `<function>(<arguments>)`.
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },

    /// `[a, b, c]`.
    ArrayLiteral(Vec<Expression>),

    /// `{k1: v1, k2: v2}`, pairs in source order.
    HashLiteral(Vec<(Expression, Expression)>),

    /// `<left>[<index>]`.
    Index {
        left: Box<Expression>,
        index: Box<Expression>,
    },
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::IntegerLiteral(n) => write!(f, "{}", n),
            Expression::StringLiteral(s) => write!(f, "{}", s),
            Expression::BooleanLiteral(b) => write!(f, "{}", b),
            Expression::Prefix { operator, right } => write!(f, "({}{})", operator, right),
            Expression::Infix {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            Expression::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if{} {}", condition, consequence)?;
                if let Some(alt) = alternative {
                    write!(f, "else {}", alt)?;
                }
                Ok(())
            }
            Expression::FunctionLiteral { parameters, body } => {
                write!(f, "fn({}) {}", parameters.join(", "), body)
            }
            Expression::Call {
                function,
                arguments,
            } => {
                let args: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", function, args.join(", "))
            }
            Expression::ArrayLiteral(elements) => {
                let elems: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elems.join(", "))
            }
            Expression::HashLiteral(pairs) => {
                let pairs: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k, v))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Expression::Index { left, index } => write!(f, "({}[{}])", left, index),
        }
    }
}
