use super::tokenizer::{Span, Token, TokenKind};
use crate::ast::*;
use crate::error::{ErrorKind, SyntaxError};
use std::collections::VecDeque;

const EQUALITY: &[&str] = &["==", "!=", "===", "!=="];
const RELATIONAL: &[&str] = &["<", ">", "<=", ">="];
const ADDITIVE: &[&str] = &["+", "-"];
const MULTIPLICATIVE: &[&str] = &["*", "/", "%"];
const UNARY: &[&str] = &["+", "-", "!"];

/// Bound on both parser recursion and the height of a built tree, so that
/// every later recursive walk over the tree stays within the stack
const MAX_DEPTH: usize = 64;

type Level = fn(&mut TreeBuilder) -> Result<Expression, SyntaxError>;

/// Builds expression trees from a token stream.
///
/// Tokens are shifted off the front as they are consumed; the builder is
/// single-use.
pub struct TreeBuilder {
    tokens: VecDeque<Token>,
    /// Byte length of the source, used for end-of-input spans
    source_len: usize,
    /// Levels of nested recursion currently open
    depth: usize,
}

impl TreeBuilder {
    pub fn new(tokens: Vec<Token>, source_len: usize) -> Self {
        Self {
            tokens: tokens.into(),
            source_len,
            depth: 0,
        }
    }

    /// Parse the comma-separated argument list that makes up a decorator
    /// expression. Empty input yields no expressions.
    pub fn build(&mut self) -> Result<Vec<Expression>, SyntaxError> {
        let mut expressions = Vec::new();

        if self.tokens.is_empty() {
            return Ok(expressions);
        }

        loop {
            expressions.push(self.filter_chain()?);
            if !self.eat_punctuation(",") {
                break;
            }
        }

        if let Some(token) = self.tokens.front() {
            return Err(SyntaxError::unexpected_token(
                ErrorKind::UnexpectedToken,
                &token.text,
                token.span(),
            ));
        }

        Ok(expressions)
    }

    // === Token helpers ===

    fn end_span(&self) -> Span {
        Span::new(self.source_len, self.source_len)
    }

    fn end_of_expression(&self) -> SyntaxError {
        SyntaxError::new(
            ErrorKind::UnexpectedEndOfExpression,
            "Unexpected end of expression",
            self.end_span(),
        )
    }

    fn shift(&mut self) -> Result<Token, SyntaxError> {
        match self.tokens.pop_front() {
            Some(token) => Ok(token),
            None => Err(self.end_of_expression()),
        }
    }

    /// Shift a specific punctuation token or fail
    fn consume(&mut self, text: &str) -> Result<Token, SyntaxError> {
        let token = self.shift()?;
        if token.is_punctuation(text) {
            Ok(token)
        } else {
            Err(SyntaxError::unexpected_token(
                ErrorKind::UnexpectedToken,
                &token.text,
                token.span(),
            )
            .with_help(format!("Expected \"{}\"", text)))
        }
    }

    fn eat_punctuation(&mut self, text: &str) -> bool {
        self.take_punctuation(text).is_some()
    }

    fn take_punctuation(&mut self, text: &str) -> Option<Token> {
        match self.tokens.front() {
            Some(token) if token.is_punctuation(text) => self.tokens.pop_front(),
            _ => None,
        }
    }

    /// Shift the next token if it is one of `operators`
    fn take_operator(&mut self, operators: &[&str]) -> Option<Token> {
        match self.tokens.front() {
            Some(token)
                if token.kind == TokenKind::Operator
                    && operators.contains(&token.text.as_str()) =>
            {
                self.tokens.pop_front()
            }
            _ => None,
        }
    }

    fn too_deep(span: Span) -> SyntaxError {
        SyntaxError::new(
            ErrorKind::NestingTooDeep,
            "Expression nested too deeply",
            span,
        )
        .with_help(format!("Expressions may nest at most {} levels", MAX_DEPTH))
    }

    /// Run `level` one recursion step deeper
    fn nested(&mut self, level: Level) -> Result<Expression, SyntaxError> {
        if self.depth >= MAX_DEPTH {
            let span = match self.tokens.front() {
                Some(token) => token.span(),
                None => self.end_span(),
            };
            return Err(Self::too_deep(span));
        }
        self.depth += 1;
        let result = level(self);
        self.depth -= 1;
        result
    }

    /// Build a node, rejecting trees taller than `MAX_DEPTH`
    fn node(&self, kind: ExprKind, span: Span) -> Result<Expression, SyntaxError> {
        let expr = Expression::new(kind, span);
        if expr.height() > MAX_DEPTH {
            return Err(Self::too_deep(span));
        }
        Ok(expr)
    }

    fn identifier(&mut self) -> Result<Token, SyntaxError> {
        let token = self.shift()?;
        if token.kind == TokenKind::Identifier {
            Ok(token)
        } else {
            Err(SyntaxError::new(
                ErrorKind::InvalidIdentifier,
                format!("Token \"{}\" is not a valid identifier", token.text),
                token.span(),
            ))
        }
    }

    // === Precedence levels (lowest to highest) ===

    fn filter_chain(&mut self) -> Result<Expression, SyntaxError> {
        self.nested(Self::filters)
    }

    /// `expr | name(args)` chains, desugared into filter calls
    fn filters(&mut self) -> Result<Expression, SyntaxError> {
        let mut expr = self.ternary()?;

        while self.take_operator(&["|"]).is_some() {
            let name = self.identifier()?;
            let callee = Expression::identifier(name.text.clone(), name.span());
            let mut end = name.span();
            let mut arguments = vec![expr];

            if self.eat_punctuation("(") {
                let (extra, close) = self.list(")")?;
                arguments.extend(extra);
                end = close;
            }

            let span = arguments[0].span.to(end);
            expr = self.node(
                ExprKind::CallExpression {
                    callee: Box::new(callee),
                    arguments,
                    filter: true,
                },
                span,
            )?;
        }

        Ok(expr)
    }

    /// `test ? consequent : alternate`, right-associative
    fn ternary(&mut self) -> Result<Expression, SyntaxError> {
        let test = self.logical_or()?;

        if !self.eat_punctuation("?") {
            return Ok(test);
        }

        let consequent = self.nested(Self::ternary)?;
        self.consume(":")?;
        let alternate = self.nested(Self::ternary)?;
        let span = test.span.to(alternate.span);

        self.node(
            ExprKind::ConditionalExpression {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        )
    }

    fn logical_or(&mut self) -> Result<Expression, SyntaxError> {
        self.binary(&["||"], Self::logical_and)
    }

    fn logical_and(&mut self) -> Result<Expression, SyntaxError> {
        self.binary(&["&&"], Self::equality)
    }

    fn equality(&mut self) -> Result<Expression, SyntaxError> {
        self.binary(EQUALITY, Self::relational)
    }

    fn relational(&mut self) -> Result<Expression, SyntaxError> {
        self.binary(RELATIONAL, Self::additive)
    }

    fn additive(&mut self) -> Result<Expression, SyntaxError> {
        self.binary(ADDITIVE, Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expression, SyntaxError> {
        self.binary(MULTIPLICATIVE, Self::unary)
    }

    /// Left-associative binary level
    fn binary(&mut self, operators: &[&str], next: Level) -> Result<Expression, SyntaxError> {
        let mut left = next(self)?;

        while let Some(op) = self.take_operator(operators) {
            let right = next(self)?;
            let span = left.span.to(right.span);
            let kind = match LogicalOp::from_token(&op.text) {
                Some(operator) => ExprKind::LogicalExpression {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                None => match BinaryOp::from_token(&op.text) {
                    Some(operator) => ExprKind::BinaryExpression {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    None => {
                        return Err(SyntaxError::unexpected_token(
                            ErrorKind::UnexpectedToken,
                            &op.text,
                            op.span(),
                        ));
                    }
                },
            };
            left = self.node(kind, span)?;
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expression, SyntaxError> {
        let Some(op) = self.take_operator(UNARY) else {
            return self.postfix();
        };

        let argument = self.nested(Self::unary)?;
        let span = op.span().to(argument.span);
        let operator = UnaryOp::from_token(&op.text).ok_or_else(|| {
            SyntaxError::unexpected_token(ErrorKind::UnexpectedToken, &op.text, op.span())
        })?;

        self.node(
            ExprKind::UnaryExpression {
                operator,
                prefix: true,
                argument: Box::new(argument),
            },
            span,
        )
    }

    /// Primary followed by any chain of calls and member accesses
    fn postfix(&mut self) -> Result<Expression, SyntaxError> {
        let mut expr = self.primary()?;

        loop {
            if self.eat_punctuation("(") {
                let (arguments, close) = self.list(")")?;
                let span = expr.span.to(close);
                expr = self.node(
                    ExprKind::CallExpression {
                        callee: Box::new(expr),
                        arguments,
                        filter: false,
                    },
                    span,
                )?;
            } else if self.eat_punctuation("[") {
                let property = self.filter_chain()?;
                let close = self.consume("]")?;
                let span = expr.span.to(close.span());
                expr = self.node(
                    ExprKind::MemberExpression {
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: true,
                    },
                    span,
                )?;
            } else if self.eat_punctuation(".") {
                let name = self.identifier()?;
                let property = Expression::identifier(name.text.clone(), name.span());
                let span = expr.span.to(name.span());
                expr = self.node(
                    ExprKind::MemberExpression {
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: false,
                    },
                    span,
                )?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expression, SyntaxError> {
        let token = self.shift()?;

        match token.kind {
            TokenKind::Punctuation if token.text == "(" => {
                let inner = self.filter_chain()?;
                self.consume(")")?;
                Ok(inner)
            }
            TokenKind::Punctuation if token.text == "[" => {
                let (elements, close) = self.list("]")?;
                self.node(ExprKind::ArrayExpression { elements }, token.span().to(close))
            }
            TokenKind::Punctuation if token.text == "{" => self.object(token.span()),
            TokenKind::NumericLiteral | TokenKind::StringLiteral => Ok(literal(token)),
            TokenKind::Identifier => Ok(keyword_or_identifier(token)),
            _ => Err(SyntaxError::new(
                ErrorKind::NotPrimaryExpression,
                format!("Token \"{}\" is not a primary expression", token.text),
                token.span(),
            )),
        }
    }

    /// Comma-separated expressions up to `close`; the opener is already
    /// consumed. A trailing comma is allowed. Returns the closing span.
    fn list(&mut self, close: &str) -> Result<(Vec<Expression>, Span), SyntaxError> {
        let mut items = Vec::new();

        loop {
            if let Some(token) = self.take_punctuation(close) {
                return Ok((items, token.span()));
            }
            items.push(self.filter_chain()?);
            if !self.eat_punctuation(",") {
                let token = self.consume(close)?;
                return Ok((items, token.span()));
            }
        }
    }

    /// Object literal body; `{` is already consumed
    fn object(&mut self, open: Span) -> Result<Expression, SyntaxError> {
        let mut properties = Vec::new();

        let close = loop {
            if let Some(token) = self.take_punctuation("}") {
                break token.span();
            }

            let token = self.shift()?;
            let (key, computed) = match token.kind {
                TokenKind::Identifier => (
                    Expression::identifier(token.text.clone(), token.span()),
                    false,
                ),
                TokenKind::StringLiteral | TokenKind::NumericLiteral => (literal(token), false),
                TokenKind::Punctuation if token.text == "[" => {
                    let key = self.filter_chain()?;
                    self.consume("]")?;
                    (key, true)
                }
                _ => {
                    return Err(SyntaxError::new(
                        ErrorKind::InvalidKey,
                        format!("Invalid key \"{}\"", token.text),
                        token.span(),
                    ));
                }
            };

            // `{true}` has no variable to stand for, so keywords need a value
            let shorthand = !computed
                && matches!(&key.kind, ExprKind::Identifier { name } if keyword(name).is_none())
                && !self.tokens.front().is_some_and(|t| t.is_punctuation(":"));

            let value = if shorthand {
                key.clone()
            } else {
                self.consume(":")?;
                self.filter_chain()?
            };

            properties.push(Property {
                key,
                value,
                computed,
                shorthand,
            });

            if !self.eat_punctuation(",") {
                break self.consume("}")?.span();
            }
        };

        self.node(ExprKind::ObjectExpression { properties }, open.to(close))
    }
}

fn literal(token: Token) -> Expression {
    let span = token.span();
    let value = token.value.unwrap_or(Value::Null);
    Expression::new(
        ExprKind::Literal {
            value,
            raw: token.text,
        },
        span,
    )
}

fn keyword(name: &str) -> Option<Value> {
    match name {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        _ => None,
    }
}

/// `true`, `false` and `null` are literals; every other name is a variable
fn keyword_or_identifier(token: Token) -> Expression {
    let span = token.span();
    let Some(value) = keyword(&token.text) else {
        return Expression::identifier(token.text, span);
    };
    Expression::new(
        ExprKind::Literal {
            value,
            raw: token.text,
        },
        span,
    )
}
