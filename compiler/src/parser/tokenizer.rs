use crate::ast::Value;
use crate::error::{ErrorKind, SyntaxError};
use serde::Serialize;

/// Byte range in source, end-exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Identifier,
    NumericLiteral,
    StringLiteral,
    Punctuation,
    Operator,
}

/// Tokens produced by the tokenizer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Raw source text, quotes included for strings
    pub text: String,
    /// Decoded value for string and numeric literals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub constant: bool,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn is_punctuation(&self, text: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.text == text
    }

    pub fn is_operator(&self, text: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == text
    }
}

const PUNCTUATION: &[char] = &['(', ')', '{', '}', '[', ']', ',', '.', '?', ':'];

// Longest first: the first prefix match wins
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "%", "!",
    "|",
];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Tokenizer for expression source text.
///
/// Holds its own cursor; create one per source string.
pub struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Tokenize the entire source
    pub fn tokenize(&mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let start = self.pos;

            if c.is_whitespace() {
                self.bump();
                continue;
            }

            let token = if is_ident_start(c) {
                self.eat_while(is_ident_char);
                self.token(TokenKind::Identifier, start, None)
            } else if c == '"' || c == '\'' {
                self.string(c)?
            } else if c.is_ascii_digit() || (c == '.' && self.peek_nth(1).is_some_and(|n| n.is_ascii_digit())) {
                self.number()?
            } else if PUNCTUATION.contains(&c) {
                self.bump();
                self.token(TokenKind::Punctuation, start, None)
            } else if let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(**op)) {
                self.pos += op.len();
                self.token(TokenKind::Operator, start, None)
            } else {
                self.bump();
                return Err(SyntaxError::unexpected_token(
                    ErrorKind::InvalidToken,
                    &self.source[start..self.pos],
                    Span::new(start, self.pos),
                ));
            };

            tokens.push(token);
        }

        Ok(tokens)
    }

    // === Cursor helpers ===

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn token(&self, kind: TokenKind, start: usize, value: Option<Value>) -> Token {
        Token {
            kind,
            text: self.source[start..self.pos].to_string(),
            constant: value.is_some(),
            value,
            start,
            end: self.pos,
        }
    }

    // === Literals ===

    fn string(&mut self, quote: char) -> Result<Token, SyntaxError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();

        loop {
            let Some(c) = self.bump() else {
                return Err(SyntaxError::new(
                    ErrorKind::UnterminatedString,
                    "Unexpected end of string",
                    Span::new(start, self.pos),
                )
                .with_help(format!("Close the string with {}", quote)));
            };

            if c == quote {
                break;
            }
            if c == '\\' {
                self.escape(start, &mut value)?;
            } else {
                value.push(c);
            }
        }

        Ok(self.token(TokenKind::StringLiteral, start, Some(Value::String(value))))
    }

    /// Decode one escape sequence; the backslash is already consumed
    fn escape(&mut self, string_start: usize, out: &mut String) -> Result<(), SyntaxError> {
        let escape_start = self.pos - 1;
        let Some(c) = self.bump() else {
            return Err(SyntaxError::new(
                ErrorKind::UnterminatedString,
                "Unexpected end of string",
                Span::new(string_start, self.pos),
            ));
        };

        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek().is_some_and(|n| n.is_ascii_digit()) => out.push('\0'),
            '0'..='7' => {
                self.eat_while(|n| n.is_ascii_digit());
                return Err(self.invalid_escape(escape_start));
            }
            'x' => {
                let code = self.hex_digits(2).ok_or_else(|| self.invalid_escape(escape_start))?;
                out.push(char::from_u32(code).ok_or_else(|| self.invalid_escape(escape_start))?);
            }
            'u' => {
                let mut code = self.unicode_code();
                // A high surrogate may pair with a following `\uDC00`-`\uDFFF`
                if let Some(high @ 0xD800..=0xDBFF) = code {
                    if self.rest().starts_with("\\u") {
                        let resume = self.pos;
                        self.pos += 2;
                        match self.unicode_code() {
                            Some(low @ 0xDC00..=0xDFFF) => {
                                code = Some(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00));
                            }
                            _ => self.pos = resume,
                        }
                    }
                }
                let ch = code
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.invalid_escape(escape_start))?;
                out.push(ch);
            }
            // Line continuations
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }

        Ok(())
    }

    /// Code point of a `\u` escape body, `{X..}` or exactly four digits
    fn unicode_code(&mut self) -> Option<u32> {
        if self.peek() != Some('{') {
            return self.hex_digits(4);
        }
        self.bump();
        let digits_start = self.pos;
        self.eat_while(|n| n.is_ascii_hexdigit());
        let digits = &self.source[digits_start..self.pos];
        if digits.is_empty() || digits.len() > 6 || self.peek() != Some('}') {
            return None;
        }
        self.bump();
        u32::from_str_radix(digits, 16).ok()
    }

    /// Read exactly `count` hex digits
    fn hex_digits(&mut self, count: usize) -> Option<u32> {
        let start = self.pos;
        for _ in 0..count {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.bump();
                }
                _ => return None,
            }
        }
        u32::from_str_radix(&self.source[start..self.pos], 16).ok()
    }

    fn invalid_escape(&self, escape_start: usize) -> SyntaxError {
        SyntaxError::new(
            ErrorKind::InvalidEscape,
            format!(
                "Invalid escape sequence \"{}\"",
                &self.source[escape_start..self.pos]
            ),
            Span::new(escape_start, self.pos),
        )
    }

    fn number(&mut self) -> Result<Token, SyntaxError> {
        let start = self.pos;

        let radix = match (self.peek(), self.peek_nth(1)) {
            (Some('0'), Some('b' | 'B')) => Some(2),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('x' | 'X')) => Some(16),
            _ => None,
        };

        let value = if let Some(radix) = radix {
            self.pos += 2;
            let digits_start = self.pos;
            self.eat_while(|c| c.is_digit(radix));
            let digits = &self.source[digits_start..self.pos];
            if digits.is_empty() {
                return Err(self.number_suffix_error(start));
            }
            // Accumulate as f64 so long literals degrade like JS instead of overflowing
            digits
                .chars()
                .filter_map(|c| c.to_digit(radix))
                .fold(0.0, |acc, d| acc * radix as f64 + d as f64)
        } else {
            self.eat_while(|c| c.is_ascii_digit());
            if self.peek() == Some('.') {
                self.bump();
                self.eat_while(|c| c.is_ascii_digit());
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let has_exponent = match self.peek_nth(1) {
                    Some('+' | '-') => self.peek_nth(2).is_some_and(|c| c.is_ascii_digit()),
                    Some(c) => c.is_ascii_digit(),
                    None => false,
                };
                if has_exponent {
                    self.bump();
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.bump();
                    }
                    self.eat_while(|c| c.is_ascii_digit());
                }
            }
            let text = &self.source[start..self.pos];
            text.parse::<f64>()
                .map_err(|_| self.number_suffix_error(start))?
        };

        // `1px`, `0x1g`: a literal may not run straight into an identifier
        if self.peek().is_some_and(is_ident_char) {
            return Err(self.number_suffix_error(start));
        }

        Ok(self.token(TokenKind::NumericLiteral, start, Some(Value::Number(value))))
    }

    fn number_suffix_error(&mut self, start: usize) -> SyntaxError {
        self.eat_while(is_ident_char);
        SyntaxError::unexpected_token(
            ErrorKind::InvalidToken,
            &self.source[start..self.pos],
            Span::new(start, self.pos),
        )
    }
}

/// Convenience function to tokenize source
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Tokenizer::new(source).tokenize()
}
