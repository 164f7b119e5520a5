//! Token types for the statement lexer
//!
//! Tokens represent the lexical elements of a statement.

/// Token types for the statement lexer
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub enum TokenType {
    // Literals
    StringLiteral,
    IntLiteral,
    FloatLiteral,
    BytesLiteral,

    // Identifiers
    Identifier,

    // Keywords
    True,
    False,
    Nil,
    Where,
    And,
    Or,
    Not,

    // Comparison operators
    Equal,              // ==
    NotEqual,           // !=
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=

    // Delimiters
    Dot,          // .
    Comma,        // ,
    OpenParen,    // (
    CloseParen,   // )
    OpenBracket,  // [
    CloseBracket, // ]

    // End of input
    Eof,

    // Error
    Error, // For lexical errors
}

impl TokenType {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenType::Equal
                | TokenType::NotEqual
                | TokenType::LessThan
                | TokenType::LessThanOrEqual
                | TokenType::GreaterThan
                | TokenType::GreaterThanOrEqual
        )
    }
}

/// A token in a statement
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: String,
        position: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            value,
            position,
            line,
            column,
        }
    }

    pub fn eof(position: usize, line: usize, column: usize) -> Self {
        Self {
            token_type: TokenType::Eof,
            value: String::new(),
            position,
            line,
            column,
        }
    }

    pub fn error(message: String, position: usize, line: usize, column: usize) -> Self {
        Self {
            token_type: TokenType::Error,
            value: message,
            position,
            line,
            column,
        }
    }
}
