//! FILENAME: parser/src/lexer.rs
//! PURPOSE: Scans a raw expression string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing (with optional exponent), bare column
//! names and backtick-quoted column names.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / ( )
//! - Quoted identifiers: `Column With Spaces`

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,

            // Backticks delimit column names that are not plain identifiers
            Some('`') => self.read_quoted_identifier(),

            // Numbers start with a digit or a dot
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),

            Some(ch) if is_letter(ch) => self.read_identifier(ch),

            None => Token::EOF,

            Some(ch) => Token::Illegal(ch),
        }
    }

    /// Collects every remaining token, EOF included.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token == Token::EOF;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// Reads a backtick-quoted identifier. A doubled backtick is an escaped backtick.
    fn read_quoted_identifier(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.input.next() {
            if ch == '`' {
                if self.input.peek() == Some(&'`') {
                    result.push('`');
                    self.input.next();
                } else {
                    return Token::QuotedIdentifier(result);
                }
            } else {
                result.push(ch);
            }
        }
        // Unterminated quote
        Token::Illegal('`')
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';
        let mut has_exponent = false;

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot && !has_exponent {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else if (ch == 'e' || ch == 'E') && !has_exponent {
                has_exponent = true;
                number_str.push(ch);
                self.input.next();
                if let Some(&sign) = self.input.peek() {
                    if sign == '+' || sign == '-' {
                        number_str.push(sign);
                        self.input.next();
                    }
                }
            } else {
                break;
            }
        }

        match number_str.parse::<f64>() {
            Ok(n) => Token::Number(n),
            // e.g. a lone "." or "1e"
            Err(_) => Token::Illegal(first_char),
        }
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if is_letter(ch) || ch.is_ascii_digit() {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        // Column names are case-sensitive, so no normalization here
        Token::Identifier(ident)
    }
}

/// Returns true if `ch` can start an identifier.
/// Accepts any alphabetic character (headers are not always ASCII) and underscore.
fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}
