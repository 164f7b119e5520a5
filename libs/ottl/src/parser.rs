//! Statement parser - converts statement text to AST
//!
//! Recursive descent parser. Condition precedence (lowest to highest):
//! 1. or
//! 2. and
//! 3. not
//! 4. comparison (==, !=, <, <=, >, >=)
//! 5. term (value, parenthesized condition)

use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::path::{Field, Path};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Parser for statements
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    recursion_depth: usize,
}

const MAX_RECURSION_DEPTH: usize = 100;

impl Parser {
    /// Create a new parser for the given input string
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Self {
            lexer,
            current_token,
            recursion_depth: 0,
        }
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current_token, next)
    }

    fn current_token_is(&self, token_type: TokenType) -> bool {
        self.current_token.token_type == token_type
    }

    /// Error for the current token. Lexical errors carry their own message.
    fn unexpected(&self, expected: &str) -> Error {
        let token = &self.current_token;
        match token.token_type {
            TokenType::Error => Error::ParseError(format!(
                "{} at line {}, column {}",
                token.value, token.line, token.column
            )),
            TokenType::Eof => Error::ParseError(format!(
                "Expected {}, but reached end of input",
                expected
            )),
            other => Error::ParseError(format!(
                "Expected {}, got {:?} `{}` at line {}, column {}",
                expected, other, token.value, token.line, token.column
            )),
        }
    }

    /// Expect a specific token type and advance
    fn expect(&mut self, token_type: TokenType) -> Result<Token> {
        if self.current_token_is(token_type) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("{:?}", token_type)))
        }
    }

    fn check_recursion_depth(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(Error::ParseError(format!(
                "Statement too deeply nested (max depth: {})",
                MAX_RECURSION_DEPTH
            )));
        }
        Ok(())
    }

    fn decrement_recursion_depth(&mut self) {
        self.recursion_depth -= 1;
    }

    /// Parse a whole statement (top-level entry point)
    pub fn parse_statement(&mut self) -> Result<StatementAst> {
        if !self.current_token_is(TokenType::Identifier) {
            return Err(self.unexpected("function invocation"));
        }
        let name = self.advance();
        let invocation = self.parse_invocation(name)?;

        let condition = if self.current_token_is(TokenType::Where) {
            self.advance();
            Some(self.parse_or()?)
        } else {
            None
        };

        if !self.current_token_is(TokenType::Eof) {
            return Err(self.unexpected("end of statement"));
        }

        Ok(StatementAst {
            invocation,
            condition,
        })
    }

    /// Parse a standalone condition, as used by `where`-only filters
    pub fn parse_condition(&mut self) -> Result<BoolExpr> {
        let condition = self.parse_or()?;
        if !self.current_token_is(TokenType::Eof) {
            return Err(self.unexpected("end of condition"));
        }
        Ok(condition)
    }

    /// Parse `name(args...)`; the name token is already consumed.
    fn parse_invocation(&mut self, name: Token) -> Result<InvocationAst> {
        self.check_recursion_depth()?;
        self.expect(TokenType::OpenParen)?;

        let mut args = Vec::new();
        if !self.current_token_is(TokenType::CloseParen) {
            loop {
                args.push(self.parse_value()?);
                if self.current_token_is(TokenType::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenType::CloseParen)?;
        self.decrement_recursion_depth();

        Ok(InvocationAst {
            name: name.value,
            args,
            line: name.line,
            column: name.column,
        })
    }

    fn parse_or(&mut self) -> Result<BoolExpr> {
        let mut left = self.parse_and()?;
        while self.current_token_is(TokenType::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = BoolExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<BoolExpr> {
        let mut left = self.parse_not()?;
        while self.current_token_is(TokenType::And) {
            self.advance();
            let right = self.parse_not()?;
            left = BoolExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<BoolExpr> {
        self.check_recursion_depth()?;
        let expr = if self.current_token_is(TokenType::Not) {
            self.advance();
            BoolExpr::Not(Box::new(self.parse_not()?))
        } else {
            self.parse_comparison()?
        };
        self.decrement_recursion_depth();
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<BoolExpr> {
        if self.current_token_is(TokenType::OpenParen) {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(TokenType::CloseParen)?;
            return Ok(inner);
        }

        let start = (self.current_token.line, self.current_token.column);
        let left = self.parse_value()?;

        if let Some(op) = compare_op(self.current_token.token_type) {
            self.advance();
            let right = self.parse_value()?;
            return Ok(BoolExpr::Comparison { left, op, right });
        }

        match left {
            ValueExpr::Literal(Value::Bool(_)) | ValueExpr::Invocation(_) => Ok(BoolExpr::Term(left)),
            other => Err(Error::ParseError(format!(
                "Expected a boolean expression, got {} at line {}, column {}",
                other.describe(),
                start.0,
                start.1
            ))),
        }
    }

    /// Parse a value: literal, path, enum symbol, invocation or list
    fn parse_value(&mut self) -> Result<ValueExpr> {
        let token_type = self.current_token.token_type;
        match token_type {
            TokenType::StringLiteral => Ok(ValueExpr::Literal(Value::String(self.advance().value))),
            TokenType::IntLiteral => {
                let token = self.advance();
                token.value.parse::<i64>().map(|i| ValueExpr::Literal(Value::Int(i))).map_err(
                    |_| {
                        Error::ParseError(format!(
                            "Integer literal out of range: {} at line {}, column {}",
                            token.value, token.line, token.column
                        ))
                    },
                )
            }
            TokenType::FloatLiteral => {
                let token = self.advance();
                token.value.parse::<f64>().map(|d| ValueExpr::Literal(Value::Double(d))).map_err(
                    |_| {
                        Error::ParseError(format!(
                            "Invalid float literal: {} at line {}, column {}",
                            token.value, token.line, token.column
                        ))
                    },
                )
            }
            TokenType::BytesLiteral => {
                let token = self.advance();
                hex::decode(&token.value)
                    .map(|b| ValueExpr::Literal(Value::Bytes(b)))
                    .map_err(|e| Error::ParseError(format!("Invalid bytes literal: {}", e)))
            }
            TokenType::True => {
                self.advance();
                Ok(ValueExpr::Literal(Value::Bool(true)))
            }
            TokenType::False => {
                self.advance();
                Ok(ValueExpr::Literal(Value::Bool(false)))
            }
            TokenType::Nil => {
                self.advance();
                Ok(ValueExpr::Literal(Value::Nil))
            }
            TokenType::OpenBracket => self.parse_list(),
            TokenType::Identifier => {
                let name = self.advance();
                if self.current_token_is(TokenType::OpenParen) {
                    return self.parse_invocation(name).map(ValueExpr::Invocation);
                }
                if is_enum_symbol(&name.value) {
                    return Ok(ValueExpr::Enum(name.value));
                }
                self.parse_path(name).map(ValueExpr::Path)
            }
            _ => Err(self.unexpected("value")),
        }
    }

    fn parse_list(&mut self) -> Result<ValueExpr> {
        self.check_recursion_depth()?;
        self.expect(TokenType::OpenBracket)?;
        let mut items = Vec::new();
        if !self.current_token_is(TokenType::CloseBracket) {
            loop {
                items.push(self.parse_value()?);
                if self.current_token_is(TokenType::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenType::CloseBracket)?;
        self.decrement_recursion_depth();
        Ok(ValueExpr::List(items))
    }

    /// Parse `field ("." field)*`; the first name token is already consumed.
    fn parse_path(&mut self, first: Token) -> Result<Path> {
        let mut fields = vec![self.parse_field_key(first.value)?];
        while self.current_token_is(TokenType::Dot) {
            self.advance();
            let name = self.expect(TokenType::Identifier)?;
            fields.push(self.parse_field_key(name.value)?);
        }
        Path::new(fields)
    }

    fn parse_field_key(&mut self, name: String) -> Result<Field> {
        if !self.current_token_is(TokenType::OpenBracket) {
            return Ok(Field::new(name));
        }
        self.advance();
        let key = self.expect(TokenType::StringLiteral)?;
        self.expect(TokenType::CloseBracket)?;
        Ok(Field::keyed(name, key.value))
    }
}

fn compare_op(token_type: TokenType) -> Option<CompareOp> {
    match token_type {
        TokenType::Equal => Some(CompareOp::Equal),
        TokenType::NotEqual => Some(CompareOp::NotEqual),
        TokenType::LessThan => Some(CompareOp::LessThan),
        TokenType::LessThanOrEqual => Some(CompareOp::LessThanOrEqual),
        TokenType::GreaterThan => Some(CompareOp::GreaterThan),
        TokenType::GreaterThanOrEqual => Some(CompareOp::GreaterThanOrEqual),
        _ => None,
    }
}

/// Enum symbols are written in upper snake case, e.g. `FLAG_NO_RECORDED_VALUE`.
fn is_enum_symbol(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Parse one statement.
pub fn parse_statement(input: &str) -> Result<StatementAst> {
    Parser::new(input).parse_statement()
}

/// Parse one condition.
pub fn parse_condition(input: &str) -> Result<BoolExpr> {
    Parser::new(input).parse_condition()
}
