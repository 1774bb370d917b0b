use serde::Serialize;
use std::fmt;

// Re-export Span from tokenizer so nodes and tokens share one type
pub use crate::parser::tokenizer::Span;

/// Decoded literal value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
        }
    }
}

/// Expression tree node.
///
/// `constant` stays `None` until the analyzer visits the node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    #[serde(flatten)]
    pub kind: ExprKind,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<bool>,
    /// Levels in this subtree, 1 for a leaf
    #[serde(skip)]
    height: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExprKind {
    Identifier {
        name: String,
    },

    Literal {
        value: Value,
        raw: String,
    },

    /// `object.property` or `object[property]`
    MemberExpression {
        object: Box<Expression>,
        property: Box<Expression>,
        computed: bool,
    },

    /// `callee(args)`; filters (`a | f`) set `filter`
    CallExpression {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        filter: bool,
    },

    ConditionalExpression {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },

    ObjectExpression {
        properties: Vec<Property>,
    },

    ArrayExpression {
        elements: Vec<Expression>,
    },

    UnaryExpression {
        operator: UnaryOp,
        prefix: bool,
        argument: Box<Expression>,
    },

    BinaryExpression {
        operator: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    LogicalExpression {
        operator: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

/// Object literal entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: Expression,
    pub value: Expression,
    pub computed: bool,
    pub shorthand: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "!")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "===")]
    StrictEq,
    #[serde(rename = "!==")]
    StrictNotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOp {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl UnaryOp {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "+" => Some(UnaryOp::Plus),
            "-" => Some(UnaryOp::Minus),
            "!" => Some(UnaryOp::Not),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl BinaryOp {
    pub fn from_token(text: &str) -> Option<Self> {
        Some(match text {
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNotEq,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::LtEq,
            ">=" => BinaryOp::GtEq,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

impl LogicalOp {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "&&" => Some(LogicalOp::And),
            "||" => Some(LogicalOp::Or),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

impl Expression {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        let mut expr = Self {
            kind,
            span,
            constant: None,
            height: 1,
        };
        expr.height = 1 + expr.children().iter().map(|c| c.height).max().unwrap_or(0);
        expr
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn identifier(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Identifier { name: name.into() }, span)
    }

    /// True once the analyzer has marked this node constant
    pub fn is_constant(&self) -> bool {
        self.constant == Some(true)
    }

    /// Segments of a static property path: `foo.bar.baz` -> `["foo", "bar", "baz"]`.
    /// Returns `None` for anything that is not an identifier or a chain of
    /// non-computed member accesses rooted at one.
    pub fn static_path(&self) -> Option<Vec<String>> {
        match &self.kind {
            ExprKind::Identifier { name } => Some(vec![name.clone()]),
            ExprKind::MemberExpression {
                object,
                property,
                computed: false,
            } => {
                let mut path = object.static_path()?;
                match &property.kind {
                    ExprKind::Identifier { name } => path.push(name.clone()),
                    _ => return None,
                }
                Some(path)
            }
            _ => None,
        }
    }

    fn is_compound(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::BinaryExpression { .. }
                | ExprKind::LogicalExpression { .. }
                | ExprKind::ConditionalExpression { .. }
                | ExprKind::UnaryExpression { .. }
                | ExprKind::CallExpression { filter: true, .. }
        )
    }

    /// Direct subexpressions in source order. Object keys are included only
    /// when computed; shorthand properties yield their value once.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            ExprKind::Identifier { .. } | ExprKind::Literal { .. } => Vec::new(),
            ExprKind::MemberExpression { object, property, computed } => {
                if *computed {
                    vec![&**object, &**property]
                } else {
                    vec![&**object]
                }
            }
            ExprKind::CallExpression { callee, arguments, filter } => {
                let mut out: Vec<&Expression> = arguments.iter().collect();
                if *filter {
                    out.insert(1.min(out.len()), &**callee);
                } else {
                    out.insert(0, &**callee);
                }
                out
            }
            ExprKind::ConditionalExpression { test, consequent, alternate } => {
                vec![&**test, &**consequent, &**alternate]
            }
            ExprKind::ObjectExpression { properties } => {
                let mut out = Vec::new();
                for property in properties {
                    if property.computed {
                        out.push(&property.key);
                    }
                    out.push(&property.value);
                }
                out
            }
            ExprKind::ArrayExpression { elements } => elements.iter().collect(),
            ExprKind::UnaryExpression { argument, .. } => vec![&**argument],
            ExprKind::BinaryExpression { left, right, .. }
            | ExprKind::LogicalExpression { left, right, .. } => vec![&**left, &**right],
        }
    }
}

/// Writes `expr`, parenthesized when it is an operator expression
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    if expr.is_compound() {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// Writes the object of a member access or the callee of a call. Number
/// literals are wrapped too, since `1.x` would lex as one malformed number.
fn write_object(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    if matches!(expr.kind, ExprKind::Literal { value: Value::Number(_), .. }) {
        write!(f, "({})", expr)
    } else {
        write_operand(f, expr)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Identifier { name } => write!(f, "{}", name),
            ExprKind::Literal { raw, .. } => write!(f, "{}", raw),
            ExprKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                write_object(f, object)?;
                if *computed {
                    write!(f, "[{}]", property)
                } else {
                    write!(f, ".{}", property)
                }
            }
            ExprKind::CallExpression {
                callee,
                arguments,
                filter,
            } => {
                if *filter {
                    if let Some((input, rest)) = arguments.split_first() {
                        write!(f, "{} | {}", input, callee)?;
                        if !rest.is_empty() {
                            write!(f, "(")?;
                            write_list(f, rest)?;
                            write!(f, ")")?;
                        }
                        return Ok(());
                    }
                }
                write_object(f, callee)?;
                write!(f, "(")?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            ExprKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                write_operand(f, test)?;
                write!(f, " ? ")?;
                write_operand(f, consequent)?;
                write!(f, " : ")?;
                write_operand(f, alternate)
            }
            ExprKind::ObjectExpression { properties } => {
                write!(f, "{{")?;
                for (i, prop) in properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if prop.shorthand {
                        write!(f, "{}", prop.key)?;
                    } else if prop.computed {
                        write!(f, "[{}]: {}", prop.key, prop.value)?;
                    } else {
                        write!(f, "{}: {}", prop.key, prop.value)?;
                    }
                }
                write!(f, "}}")
            }
            ExprKind::ArrayExpression { elements } => {
                write!(f, "[")?;
                write_list(f, elements)?;
                write!(f, "]")
            }
            ExprKind::UnaryExpression {
                operator, argument, ..
            } => {
                write!(f, "{}", operator.as_str())?;
                write_operand(f, argument)
            }
            ExprKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                write_operand(f, left)?;
                write!(f, " {} ", operator.as_str())?;
                write_operand(f, right)
            }
            ExprKind::LogicalExpression {
                operator,
                left,
                right,
            } => {
                write_operand(f, left)?;
                write!(f, " {} ", operator.as_str())?;
                write_operand(f, right)
            }
        }
    }
}
