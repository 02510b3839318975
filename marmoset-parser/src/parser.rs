// marmoset-parser - Parser for Marmoset
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Pratt parser for Marmoset source code.
//!
//! Converts tokens into `Program` AST nodes. Errors are collected per
//! statement so a single bad statement does not abort the whole parse.

use std::fmt;

use crate::ast::{BlockStatement, Expression, Program, Statement};
use crate::lexer::{Lexer, LexerError, Token};

/// Parser error with position information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at {}:{}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

impl From<LexerError> for ParseError {
    fn from(e: LexerError) -> Self {
        ParseError {
            message: e.message,
            line: e.line,
            column: e.column,
        }
    }
}

/// Operator binding strength, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,      // == !=
    LessGreater, // < >
    Sum,         // + -
    Product,     // * /
    Prefix,      // -x !x
    Call,        // f(x)
    Index,       // xs[i]
}

fn token_precedence(tok: &Token) -> Precedence {
    match tok {
        Token::Eq | Token::NotEq => Precedence::Equals,
        Token::Lt | Token::Gt => Precedence::LessGreater,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Slash | Token::Asterisk => Precedence::Product,
        Token::LParen => Precedence::Call,
        Token::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

/// The parser converts tokens into `Program` AST nodes.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    peek: Token,
    errors: Vec<ParseError>,
    cur_pos: (usize, usize),
    peek_pos: (usize, usize),
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source code.
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let cur_pos = (lexer.line(), lexer.column());
        let current = lexer.next_token()?;
        let peek_pos = (lexer.line(), lexer.column());
        let peek = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            peek,
            errors: Vec::new(),
            cur_pos,
            peek_pos,
        })
    }

    /// Parse an entire program. Errors are collected; check [`errors`]
    /// afterwards.
    ///
    /// [`errors`]: Parser::errors
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while self.current != Token::Eof {
            match self.parse_statement() {
                Ok(stmt) => {
                    program.statements.push(stmt);
                    if let Err(e) = self.advance() {
                        self.errors.push(e);
                        self.synchronize();
                    }
                }
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        program
    }

    /// Errors collected during `parse_program`.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Parse a source string into a program (convenience function).
    pub fn parse_source(source: &str) -> Result<Program, Vec<ParseError>> {
        let mut parser = Parser::new(source).map_err(|e| vec![e])?;
        let program = parser.parse_program();
        if parser.errors.is_empty() {
            Ok(program)
        } else {
            Err(parser.errors)
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current {
            Token::Let => self.parse_let_statement(),
            Token::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Result<Statement, ParseError> {
        let name = match &self.peek {
            Token::Ident(name) => name.clone(),
            other => {
                return Err(ParseError {
                    message: format!("expected next token to be an identifier, got {}", other),
                    line: self.peek_pos.0,
                    column: self.peek_pos.1,
                });
            }
        };
        self.advance()?;
        self.expect_peek(&Token::Assign)?;
        self.advance()?;

        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek == Token::Semicolon {
            self.advance()?;
        }
        Ok(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek == Token::Semicolon {
            self.advance()?;
        }
        Ok(Statement::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expr = self.parse_expression(Precedence::Lowest)?;

        if self.peek == Token::Semicolon {
            self.advance()?;
        }
        Ok(Statement::Expression(expr))
    }

    fn parse_block_statement(&mut self) -> Result<BlockStatement, ParseError> {
        // current is '{'
        let mut block = BlockStatement::default();
        self.advance()?;

        while self.current != Token::RBrace {
            if self.current == Token::Eof {
                return Err(self.error("unterminated block".to_string()));
            }
            block.statements.push(self.parse_statement()?);
            self.advance()?;
        }

        Ok(block)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression, ParseError> {
        let mut left = self.parse_prefix()?;

        while self.peek != Token::Semicolon && precedence < token_precedence(&self.peek) {
            left = match self.peek {
                Token::Plus
                | Token::Minus
                | Token::Slash
                | Token::Asterisk
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::Gt => {
                    self.advance()?;
                    self.parse_infix_expression(left)?
                }
                Token::LParen => {
                    self.advance()?;
                    self.parse_call_expression(left)?
                }
                Token::LBracket => {
                    self.advance()?;
                    self.parse_index_expression(left)?
                }
                _ => break,
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        match self.current.clone() {
            Token::Ident(name) => Ok(Expression::Identifier(name)),
            Token::Int(value) => Ok(Expression::IntegerLiteral(value)),
            Token::Str(value) => Ok(Expression::StringLiteral(value)),
            Token::True => Ok(Expression::BooleanLiteral(true)),
            Token::False => Ok(Expression::BooleanLiteral(false)),
            Token::Bang | Token::Minus => self.parse_prefix_expression(),
            Token::LParen => self.parse_grouped_expression(),
            Token::If => self.parse_if_expression(),
            Token::Function => self.parse_function_literal(),
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_hash_literal(),
            other => Err(self.error(format!("no prefix parse rule for {}", other))),
        }
    }

    fn parse_prefix_expression(&mut self) -> Result<Expression, ParseError> {
        let operator = self.current.to_string();
        self.advance()?;
        let right = self.parse_expression(Precedence::Prefix)?;
        Ok(Expression::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let operator = self.current.to_string();
        let precedence = token_precedence(&self.current);
        self.advance()?;
        let right = self.parse_expression(precedence)?;
        Ok(Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance()?;
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(&Token::RParen)?;
        Ok(expr)
    }

    fn parse_if_expression(&mut self) -> Result<Expression, ParseError> {
        self.expect_peek(&Token::LParen)?;
        self.advance()?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(&Token::RParen)?;
        self.expect_peek(&Token::LBrace)?;
        let consequence = self.parse_block_statement()?;

        let alternative = if self.peek == Token::Else {
            self.advance()?;
            self.expect_peek(&Token::LBrace)?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Ok(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Result<Expression, ParseError> {
        self.expect_peek(&Token::LParen)?;
        let parameters = self.parse_function_parameters()?;
        self.expect_peek(&Token::LBrace)?;
        let body = self.parse_block_statement()?;
        Ok(Expression::FunctionLiteral { parameters, body })
    }

    fn parse_function_parameters(&mut self) -> Result<Vec<String>, ParseError> {
        let mut parameters = Vec::new();

        if self.peek == Token::RParen {
            self.advance()?;
            return Ok(parameters);
        }

        self.advance()?;
        parameters.push(self.current_identifier()?);

        while self.peek == Token::Comma {
            self.advance()?;
            self.advance()?;
            parameters.push(self.current_identifier()?);
        }

        self.expect_peek(&Token::RParen)?;
        Ok(parameters)
    }

    fn parse_call_expression(&mut self, function: Expression) -> Result<Expression, ParseError> {
        let arguments = self.parse_expression_list(&Token::RParen)?;
        Ok(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        let elements = self.parse_expression_list(&Token::RBracket)?;
        Ok(Expression::ArrayLiteral(elements))
    }

    fn parse_hash_literal(&mut self) -> Result<Expression, ParseError> {
        let mut pairs = Vec::new();

        while self.peek != Token::RBrace {
            self.advance()?;
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect_peek(&Token::Colon)?;
            self.advance()?;
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if self.peek != Token::RBrace {
                self.expect_peek(&Token::Comma)?;
            }
        }

        self.expect_peek(&Token::RBrace)?;
        Ok(Expression::HashLiteral(pairs))
    }

    fn parse_index_expression(&mut self, left: Expression) -> Result<Expression, ParseError> {
        self.advance()?;
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(&Token::RBracket)?;
        Ok(Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    fn parse_expression_list(&mut self, end: &Token) -> Result<Vec<Expression>, ParseError> {
        let mut list = Vec::new();

        if &self.peek == end {
            self.advance()?;
            return Ok(list);
        }

        self.advance()?;
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek == Token::Comma {
            self.advance()?;
            self.advance()?;
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Ok(list)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = std::mem::replace(&mut self.peek, Token::Eof);
        self.cur_pos = self.peek_pos;
        self.peek_pos = (self.lexer.line(), self.lexer.column());
        self.peek = self.lexer.next_token()?;
        Ok(())
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            line: self.cur_pos.0,
            column: self.cur_pos.1,
        }
    }

    fn expect_peek(&mut self, expected: &Token) -> Result<(), ParseError> {
        if &self.peek == expected {
            self.advance()
        } else {
            Err(ParseError {
                message: format!(
                    "expected next token to be {}, got {}",
                    expected, self.peek
                ),
                line: self.peek_pos.0,
                column: self.peek_pos.1,
            })
        }
    }

    fn current_identifier(&self) -> Result<String, ParseError> {
        match &self.current {
            Token::Ident(name) => Ok(name.clone()),
            other => Err(self.error(format!("expected an identifier, got {}", other))),
        }
    }

    /// Skip to the start of the next statement after a parse error.
    fn synchronize(&mut self) {
        while self.current != Token::Semicolon && self.current != Token::Eof {
            if self.advance().is_err() {
                // Lexer errors during recovery are dropped; the original
                // error has already been recorded.
            }
        }
        if self.current == Token::Semicolon {
            let _ = self.advance();
        }
    }
}
