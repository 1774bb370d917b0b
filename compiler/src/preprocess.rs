//! Template pre-processor.
//!
//! Finds decorator syntax in template source and rewrites it into
//! `<dp:decorator>` markup:
//!
//! - `[name expr]` processor, `[#name expr]` modifier
//! - `[name:label=model.path expr]` optional label and model
//! - `{expr}` text template, `{=expr}` raw html template, both followed by
//!   a `<dp:target>` anchor
//! - `\x` emits `x` literally
//!
//! Expression text is captured with bracket balancing and string skipping
//! but is not tokenized here.

use crate::error::{ErrorKind, SyntaxError};
use crate::html;
use crate::parser::Span;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoratorKind {
    Modifier,
    Processor,
}

impl DecoratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecoratorKind::Modifier => "modifier",
            DecoratorKind::Processor => "processor",
        }
    }
}

/// One decorator found in template source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decorator {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DecoratorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Raw expression text, trimmed, not HTML-escaped
    pub expression: String,
    /// `{}` templates render a target anchor after the decorator
    pub target: bool,
    /// Whole decorator, brackets included
    pub span: Span,
    /// The trimmed expression text within the template source
    pub expression_span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Segment {
    Text(String),
    Decorator(Decorator),
}

struct Header {
    kind: DecoratorKind,
    name: String,
    label: Option<String>,
    model: Option<String>,
    /// Byte offset just past the header
    end: usize,
}

/// Single-pass scanner over one template string
struct PreProcessor<'a> {
    source: &'a str,
    pos: usize,
    segments: Vec<Segment>,
    text: String,
}

impl<'a> PreProcessor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            segments: Vec::new(),
            text: String::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Segment>, SyntaxError> {
        while let Some(c) = self.peek() {
            let rest = &self.source[self.pos..];

            if rest.starts_with("<!--") {
                // Comments are copied through untouched, unterminated ones to the end
                let len = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
                self.text.push_str(&rest[..len]);
                self.pos += len;
                continue;
            }

            match c {
                '\\' => {
                    self.pos += 1;
                    match self.peek() {
                        Some(escaped) => {
                            self.text.push(escaped);
                            self.pos += escaped.len_utf8();
                        }
                        None => self.text.push('\\'),
                    }
                }
                '[' => match self.header() {
                    Some(header) => self.decorator(header)?,
                    None => {
                        self.text.push('[');
                        self.pos += 1;
                    }
                },
                '{' => self.template()?,
                _ => {
                    self.text.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }

        self.flush_text();
        Ok(self.segments)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.segments
                .push(Segment::Text(std::mem::take(&mut self.text)));
        }
    }

    /// Identifier starting at `at`; returns it and the offset past it
    fn identifier_at(&self, at: usize) -> Option<(String, usize)> {
        let rest = &self.source[at..];
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_alphabetic() || c == '_' || c == '$' => {}
            _ => return None,
        }
        let len = chars
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        Some((rest[..len].to_string(), at + len))
    }

    /// Try to read `[` marker? name (:label)? (=model)? at the cursor
    fn header(&self) -> Option<Header> {
        let mut at = self.pos + 1;

        let kind = match self.source[at..].chars().next() {
            Some('#') => {
                at += 1;
                DecoratorKind::Modifier
            }
            // Reserved markers: left as plain text
            Some('@' | '+') => return None,
            _ => DecoratorKind::Processor,
        };

        let (name, mut at) = self.identifier_at(at)?;

        let mut label = None;
        if self.source[at..].starts_with(':') {
            let (text, end) = self.identifier_at(at + 1)?;
            label = Some(text);
            at = end;
        }

        let mut model = None;
        if self.source[at..].starts_with('=') {
            let (first, mut end) = self.identifier_at(at + 1)?;
            let mut path = first;
            while self.source[end..].starts_with('.') {
                let (segment, next) = self.identifier_at(end + 1)?;
                path.push('.');
                path.push_str(&segment);
                end = next;
            }
            model = Some(path);
            at = end;
        }

        match self.source[at..].chars().next() {
            Some(c) if c.is_whitespace() || c == ']' => {}
            None => {}
            _ => return None,
        }

        Some(Header {
            kind,
            name,
            label,
            model,
            end: at,
        })
    }

    fn decorator(&mut self, header: Header) -> Result<(), SyntaxError> {
        self.flush_text();
        let start = self.pos;
        let (expression, expression_span) = self.balanced(start, header.end)?;

        self.segments.push(Segment::Decorator(Decorator {
            name: header.name,
            kind: header.kind,
            label: header.label,
            model: header.model,
            expression,
            target: false,
            span: Span::new(start, self.pos),
            expression_span,
        }));
        Ok(())
    }

    fn template(&mut self) -> Result<(), SyntaxError> {
        self.flush_text();
        let start = self.pos;
        let raw = self.source[start + 1..].starts_with('=');
        let body = if raw { start + 2 } else { start + 1 };
        let (expression, expression_span) = self.balanced(start, body)?;

        self.segments.push(Segment::Decorator(Decorator {
            name: if raw { "html" } else { "text" }.to_string(),
            kind: DecoratorKind::Processor,
            label: None,
            model: None,
            expression,
            target: true,
            span: Span::new(start, self.pos),
            expression_span,
        }));
        Ok(())
    }

    /// Scan from `body` to the bracket closing the one at `open`.
    ///
    /// Leaves the cursor after the closing bracket and returns the trimmed
    /// text between header and closer along with its span.
    fn balanced(&mut self, open: usize, body: usize) -> Result<(String, Span), SyntaxError> {
        let source = self.source;
        let opener = source[open..].chars().next().unwrap_or('[');
        let mut stack = vec![closer_for(opener)];
        let mut chars = source[body..].char_indices().map(|(i, c)| (body + i, c));

        let end_of_source = || {
            SyntaxError::new(
                ErrorKind::UnexpectedEndOfSource,
                "Unexpected end of source",
                Span::new(open, source.len()),
            )
            .with_help(format!("Close the decorator with {}", closer_for(opener)))
        };

        while let Some((i, c)) = chars.next() {
            match c {
                '"' | '\'' | '`' => loop {
                    match chars.next() {
                        Some((_, '\\')) => {
                            chars.next();
                        }
                        Some((_, q)) if q == c => break,
                        Some(_) => {}
                        None => return Err(end_of_source()),
                    }
                },
                '(' | '[' | '{' => stack.push(closer_for(c)),
                ')' | ']' | '}' => {
                    if stack.last() != Some(&c) {
                        let mut err = SyntaxError::unexpected_token(
                            ErrorKind::MismatchedBracket,
                            &c.to_string(),
                            Span::new(i, i + 1),
                        );
                        if let Some(expected) = stack.last() {
                            err = err.with_help(format!("Expected {} before {}", expected, c));
                        }
                        return Err(err);
                    }
                    stack.pop();
                    if stack.is_empty() {
                        self.pos = i + 1;
                        let raw = &source[body..i];
                        let leading = raw.len() - raw.trim_start().len();
                        let trimmed = raw.trim();
                        let span = Span::new(body + leading, body + leading + trimmed.len());
                        return Ok((trimmed.to_string(), span));
                    }
                }
                _ => {}
            }
        }

        Err(end_of_source())
    }
}

fn closer_for(opener: char) -> char {
    match opener {
        '(' => ')',
        '{' => '}',
        _ => ']',
    }
}

/// Scan template source into text and decorator segments
pub fn scan(source: &str) -> Result<Vec<Segment>, SyntaxError> {
    PreProcessor::new(source).run()
}

/// Render segments back into template markup
pub fn render(segments: &[Segment]) -> String {
    let mut out = String::new();

    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Decorator(decorator) => {
                html::open_tag(
                    &mut out,
                    html::DECORATOR_TAG,
                    &[
                        ("name", Some(&decorator.name)),
                        ("type", Some(decorator.kind.as_str())),
                        ("label", decorator.label.as_deref()),
                        ("model", decorator.model.as_deref()),
                    ],
                );
                out.push_str(&html::escape_angle_brackets(&decorator.expression));
                html::close_tag(&mut out, html::DECORATOR_TAG);

                if decorator.target {
                    html::open_tag(&mut out, html::TARGET_TAG, &[]);
                    html::close_tag(&mut out, html::TARGET_TAG);
                }
            }
        }
    }

    out
}

/// Rewrite decorator syntax in `source` into intermediate markup
pub fn process(source: &str) -> Result<String, SyntaxError> {
    Ok(render(&scan(source)?))
}

/// Decorators found in `source`, in source order
pub fn decorators(source: &str) -> Result<Vec<Decorator>, SyntaxError> {
    Ok(scan(source)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Decorator(decorator) => Some(decorator),
            Segment::Text(_) => None,
        })
        .collect())
}
