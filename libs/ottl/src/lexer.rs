//! Statement lexer - tokenizes statement text
//!
//! Converts statement strings into a stream of tokens. String literals are
//! double-quoted, bytes literals are `0x`-prefixed hex and numbers may carry a
//! leading minus sign since the grammar has no arithmetic.

use crate::error::{Error, Result};
use crate::token::{Token, TokenType};

/// The statement lexer
pub struct Lexer {
    position: usize,
    line: usize,
    column: usize,
    chars: Vec<char>,
    current_char: Option<char>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            position: 0,
            line: 1,
            column: 1,
            chars,
            current_char,
        }
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if let Some(c) = self.current_char {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let start_pos = self.position;

        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        self.chars[start_pos..self.position].iter().collect()
    }

    /// Read a string literal: "string"
    fn read_string(&mut self) -> Result<String> {
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(c) = self.current_char {
            match c {
                '"' => {
                    self.advance();
                    return Ok(value);
                }
                '\\' => {
                    self.advance(); // Skip backslash
                    let Some(escaped) = self.current_char else {
                        break;
                    };
                    match escaped {
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'u' => {
                            self.advance(); // Skip 'u'
                            value.push(self.read_unicode_escape()?);
                            continue;
                        }
                        // Unknown escapes are kept verbatim so regex patterns survive.
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                    self.advance();
                }
                _ => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Err(Error::ParseError("Unterminated string literal".into()))
    }

    /// Read the four hex digits of a \uXXXX escape
    fn read_unicode_escape(&mut self) -> Result<char> {
        let mut hex = String::new();
        for _ in 0..4 {
            match self.current_char {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(h);
                    self.advance();
                }
                Some(_) => {
                    return Err(Error::ParseError("Invalid unicode escape sequence".into()))
                }
                None => {
                    return Err(Error::ParseError(
                        "Incomplete unicode escape sequence".into(),
                    ))
                }
            }
        }
        let code = u32::from_str_radix(&hex, 16)
            .map_err(|_| Error::ParseError("Invalid unicode code point".into()))?;
        char::from_u32(code).ok_or_else(|| Error::ParseError("Invalid unicode character".into()))
    }

    fn read_digits(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read an int or float literal, including an optional leading minus sign.
    fn read_number(&mut self) -> Result<(String, TokenType)> {
        let start_pos = self.position;
        let mut token_type = TokenType::IntLiteral;

        if self.current_char == Some('-') {
            self.advance();
        }
        self.read_digits();

        if self.current_char == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            token_type = TokenType::FloatLiteral;
            self.advance(); // Skip '.'
            self.read_digits();
        }

        if matches!(self.current_char, Some('e') | Some('E')) {
            token_type = TokenType::FloatLiteral;
            self.advance();
            if matches!(self.current_char, Some('+') | Some('-')) {
                self.advance();
            }
            if !self.current_char.is_some_and(|c| c.is_ascii_digit()) {
                return Err(Error::ParseError("Missing exponent digits".into()));
            }
            self.read_digits();
        }

        if self.current_char.is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(Error::ParseError(format!(
                "Invalid character {:?} in number",
                self.current_char.unwrap_or_default()
            )));
        }

        let value: String = self.chars[start_pos..self.position].iter().collect();
        Ok((value, token_type))
    }

    /// Read a bytes literal: 0x followed by an even number of hex digits
    fn read_bytes(&mut self) -> Result<String> {
        self.advance(); // Skip '0'
        self.advance(); // Skip 'x'

        let start_pos = self.position;
        while let Some(c) = self.current_char {
            if c.is_ascii_hexdigit() {
                self.advance();
            } else {
                break;
            }
        }

        let value: String = self.chars[start_pos..self.position].iter().collect();
        if value.is_empty() || value.len() % 2 != 0 {
            return Err(Error::ParseError(format!(
                "Bytes literal must have an even, non-zero number of hex digits: 0x{}",
                value
            )));
        }
        Ok(value)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = self.position;
        let line = self.line;
        let column = self.column;

        let Some(c) = self.current_char else {
            return Token::eof(position, line, column);
        };

        let single = |token_type: TokenType, text: &str| {
            Token::new(token_type, text.into(), position, line, column)
        };

        match c {
            '.' => {
                self.advance();
                single(TokenType::Dot, ".")
            }
            ',' => {
                self.advance();
                single(TokenType::Comma, ",")
            }
            '(' => {
                self.advance();
                single(TokenType::OpenParen, "(")
            }
            ')' => {
                self.advance();
                single(TokenType::CloseParen, ")")
            }
            '[' => {
                self.advance();
                single(TokenType::OpenBracket, "[")
            }
            ']' => {
                self.advance();
                single(TokenType::CloseBracket, "]")
            }
            '"' => match self.read_string() {
                Ok(value) => Token::new(TokenType::StringLiteral, value, position, line, column),
                Err(e) => Token::error(format!("String error: {}", e), position, line, column),
            },
            '=' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    single(TokenType::Equal, "==")
                } else {
                    Token::error(
                        "Unexpected '=' character, did you mean '=='?".into(),
                        position,
                        line,
                        column,
                    )
                }
            }
            '!' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    single(TokenType::NotEqual, "!=")
                } else {
                    Token::error("Unexpected '!' character".into(), position, line, column)
                }
            }
            '<' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    single(TokenType::LessThanOrEqual, "<=")
                } else {
                    single(TokenType::LessThan, "<")
                }
            }
            '>' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    single(TokenType::GreaterThanOrEqual, ">=")
                } else {
                    single(TokenType::GreaterThan, ">")
                }
            }
            '0' if matches!(self.peek(), Some('x') | Some('X')) => match self.read_bytes() {
                Ok(value) => Token::new(TokenType::BytesLiteral, value, position, line, column),
                Err(e) => Token::error(format!("Bytes error: {}", e), position, line, column),
            },
            '-' if !self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                Token::error("Unexpected '-' character".into(), position, line, column)
            }
            _ if c.is_ascii_digit() || c == '-' => match self.read_number() {
                Ok((value, token_type)) => Token::new(token_type, value, position, line, column),
                Err(e) => Token::error(format!("Number error: {}", e), position, line, column),
            },
            _ if c.is_alphabetic() || c == '_' => {
                let ident = self.read_identifier();
                let token_type = match ident.as_str() {
                    "true" => TokenType::True,
                    "false" => TokenType::False,
                    "nil" => TokenType::Nil,
                    "where" => TokenType::Where,
                    "and" => TokenType::And,
                    "or" => TokenType::Or,
                    "not" => TokenType::Not,
                    _ => TokenType::Identifier,
                };
                Token::new(token_type, ident, position, line, column)
            }
            _ => Token::error(
                format!("Unexpected character: {}", c),
                position,
                line,
                column,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let is_eof = matches!(token.token_type, TokenType::Eof | TokenType::Error);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    #[test]
    fn test_identifiers_and_keywords() {
        let tokens = tokenize("set where and or not nil");
        let types: Vec<_> = tokens.iter().map(|t| t.token_type).collect();
        assert_eq!(
            types,
            vec![
                TokenType::Identifier,
                TokenType::Where,
                TokenType::And,
                TokenType::Or,
                TokenType::Not,
                TokenType::Nil,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn test_unknown_escape_is_kept() {
        let tokens = tokenize(r#""a\.b""#);
        assert_eq!(tokens[0].token_type, TokenType::StringLiteral);
        assert_eq!(tokens[0].value, r"a\.b");
    }

    #[test]
    fn test_odd_bytes_literal() {
        let tokens = tokenize("0xabc");
        assert_eq!(tokens[0].token_type, TokenType::Error);
    }

    #[test]
    fn test_line_and_column() {
        let tokens = tokenize("a\n  b");
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }
}
