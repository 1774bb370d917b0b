use crate::parser::positions::Position;
use crate::parser::tokenizer::Span;
use std::fmt;

/// Stage of the pipeline that rejected the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Lex,
    Parse,
    PreProcess,
}

/// Kind of syntax error
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Tokenizer hit a character run it cannot match
    InvalidToken,
    UnterminatedString,
    InvalidEscape,
    /// Parser found a token where the grammar does not allow one
    UnexpectedToken,
    UnexpectedEndOfExpression,
    NotPrimaryExpression,
    InvalidKey,
    InvalidIdentifier,
    NestingTooDeep,
    /// Pre-processor ran out of input inside a decorator
    UnexpectedEndOfSource,
    MismatchedBracket,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidToken => "Invalid token",
            ErrorKind::UnterminatedString => "Unterminated string",
            ErrorKind::InvalidEscape => "Invalid escape sequence",
            ErrorKind::UnexpectedToken => "Unexpected token",
            ErrorKind::UnexpectedEndOfExpression => "Unexpected end of expression",
            ErrorKind::NotPrimaryExpression => "Not a primary expression",
            ErrorKind::InvalidKey => "Invalid key",
            ErrorKind::InvalidIdentifier => "Invalid identifier",
            ErrorKind::NestingTooDeep => "Nesting too deep",
            ErrorKind::UnexpectedEndOfSource => "Unexpected end of source",
            ErrorKind::MismatchedBracket => "Mismatched bracket",
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            ErrorKind::InvalidToken | ErrorKind::UnterminatedString | ErrorKind::InvalidEscape => {
                Phase::Lex
            }
            ErrorKind::UnexpectedToken
            | ErrorKind::UnexpectedEndOfExpression
            | ErrorKind::NotPrimaryExpression
            | ErrorKind::InvalidKey
            | ErrorKind::InvalidIdentifier
            | ErrorKind::NestingTooDeep => Phase::Parse,
            ErrorKind::UnexpectedEndOfSource | ErrorKind::MismatchedBracket => Phase::PreProcess,
        }
    }
}

/// Error raised by the tokenizer, the parser or the pre-processor.
///
/// The message is the user-facing text (`Unexpected token "]"`); the span
/// points into whichever source string the failing call was given.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            help: None,
        }
    }

    /// `Unexpected token "<text>"`, shared by all three phases
    pub fn unexpected_token(kind: ErrorKind, text: &str, span: Span) -> Self {
        Self::new(kind, format!("Unexpected token \"{}\"", text), span)
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn phase(&self) -> Phase {
        self.kind.phase()
    }

    /// Move the span by `offset` bytes, for errors raised on a substring
    pub fn shifted(mut self, offset: usize) -> Self {
        self.span = Span::new(self.span.start + offset, self.span.end + offset);
        self
    }

    /// Render the error with source context
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, false)
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, true)
    }

    fn render_inner(&self, source: &str, filename: &str, color: bool) -> String {
        let red = if color { "\x1b[1;31m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let cyan = if color { "\x1b[1;38;5;73m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let start = Position::locate(source, self.span.start);
        let end = Position::locate(source, self.span.end);

        let mut output = String::new();
        output.push('\n');
        output.push_str(&format!(
            " {}file:{} {}:{}:{}\n",
            dim,
            reset,
            filename,
            start.line + 1,
            start.col + 1
        ));
        output.push_str(&format!("{}error:{} {}\n", red, reset, self.message));

        let line_source = source.lines().nth(start.line).unwrap_or("");
        let line_number = start.line + 1;
        let width = format!("{}", line_number).len().max(2);
        let highlighted = if color {
            highlight_expression(line_source)
        } else {
            line_source.to_string()
        };
        output.push_str(&format!("{}{:>width$} |{}\n", dim, "", reset, width = width));
        output.push_str(&format!(
            "{}{:>width$} |{} {}\n",
            dim,
            line_number,
            reset,
            highlighted,
            width = width
        ));

        // Multi-line spans are underlined to the end of the first line
        let underline_len = if end.line == start.line {
            end.col.saturating_sub(start.col).max(1)
        } else {
            line_source.chars().count().saturating_sub(start.col).max(1)
        };
        output.push_str(&format!(
            "{}{:>width$} |{} {}{}{}{}\n",
            dim,
            "",
            reset,
            " ".repeat(start.col),
            red,
            "^".repeat(underline_len),
            reset,
            width = width
        ));

        if let Some(ref help) = self.help {
            output.push('\n');
            for (i, help_line) in help.lines().enumerate() {
                if i == 0 {
                    output.push_str(&format!(" {}help:{} {}\n", cyan, reset, help_line));
                } else {
                    output.push_str(&format!("       {}\n", help_line));
                }
            }
        }

        output.push('\n');
        output
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SyntaxError {}

/// Light highlighting for a source line: strings, numbers, decorator brackets
fn highlight_expression(line: &str) -> String {
    const STRING: &str = "\x1b[38;5;72m";
    const NUMBER: &str = "\x1b[38;5;73m";
    const BRACKET: &str = "\x1b[38;5;180m";
    const RESET: &str = "\x1b[0m";

    let chars: Vec<char> = line.chars().collect();
    let mut result = String::with_capacity(line.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            result.push_str(STRING);
            result.push(c);
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    result.push(chars[i]);
                    i += 1;
                }
                result.push(chars[i]);
                i += 1;
            }
            if i < chars.len() {
                result.push(c);
                i += 1;
            }
            result.push_str(RESET);
            continue;
        }

        if c.is_ascii_digit() {
            result.push_str(NUMBER);
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                result.push(chars[i]);
                i += 1;
            }
            result.push_str(RESET);
            continue;
        }

        // Identifiers pass through whole so digits inside them stay plain
        if c.is_alphabetic() || c == '_' || c == '$' {
            while i < chars.len()
                && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                result.push(chars[i]);
                i += 1;
            }
            continue;
        }

        if matches!(c, '[' | ']' | '{' | '}') {
            result.push_str(BRACKET);
            result.push(c);
            result.push_str(RESET);
        } else {
            result.push(c);
        }
        i += 1;
    }

    result
}
