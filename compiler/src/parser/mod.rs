pub mod positions;
pub mod tokenizer;
mod tree_builder;

pub use positions::Position;
pub use tokenizer::{Span, Token, TokenKind, Tokenizer, tokenize};
use tree_builder::TreeBuilder;

use crate::ast::Expression;
use crate::error::SyntaxError;

/// Parser trait - converts expression source to trees
pub trait Parser {
    fn parse(&self, source: &str) -> Result<Vec<Expression>, SyntaxError>;
}

/// Decorator expression parser.
///
/// Stateless: every call tokenizes and builds with fresh local state, so a
/// single instance can be shared between threads.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionParser {
    // Configuration only, no state
}

impl ExpressionParser {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for ExpressionParser {
    fn parse(&self, source: &str) -> Result<Vec<Expression>, SyntaxError> {
        let tokens = tokenize(source)?;
        let mut builder = TreeBuilder::new(tokens, source.len());
        builder.build()
    }
}

/// Parse a comma-separated list of expressions
pub fn parse(source: &str) -> Result<Vec<Expression>, SyntaxError> {
    ExpressionParser::new().parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ExprKind, LogicalOp, UnaryOp, Value};
    use crate::error::ErrorKind;

    fn parse_one(source: &str) -> Expression {
        let mut expressions = parse(source).unwrap();
        assert_eq!(expressions.len(), 1, "expected one expression for {:?}", source);
        expressions.remove(0)
    }

    fn name(expr: &Expression) -> &str {
        match &expr.kind {
            ExprKind::Identifier { name } => name,
            other => panic!("Expected identifier, got {:?}", other),
        }
    }

    fn error(source: &str) -> String {
        parse(source).unwrap_err().message
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let expr = parse_one("1 + 2 * 3");
        let ExprKind::BinaryExpression { operator, left, right } = &expr.kind else {
            panic!("Expected binary expression");
        };
        assert_eq!(*operator, BinaryOp::Add);
        assert!(matches!(left.kind, ExprKind::Literal { value: Value::Number(n), .. } if n == 1.0));
        assert!(matches!(
            right.kind,
            ExprKind::BinaryExpression { operator: BinaryOp::Mul, .. }
        ));
    }

    #[test]
    fn test_left_associative() {
        let expr = parse_one("a - b - c");
        assert_eq!(expr.to_string(), "(a - b) - c");
    }

    #[test]
    fn test_precedence_ladder() {
        let expr = parse_one("a || b && c == d < e + f * -g");
        assert_eq!(expr.to_string(), "a || (b && (c == (d < (e + (f * (-g))))))");
    }

    #[test]
    fn test_logical_nodes() {
        let expr = parse_one("a && b");
        assert!(matches!(
            expr.kind,
            ExprKind::LogicalExpression { operator: LogicalOp::And, .. }
        ));
    }

    #[test]
    fn test_ternary_right_associative() {
        let expr = parse_one("a ? b : c ? d : e");
        let ExprKind::ConditionalExpression { test, consequent, alternate } = &expr.kind else {
            panic!("Expected conditional");
        };
        assert_eq!(name(test), "a");
        assert_eq!(name(consequent), "b");
        assert!(matches!(alternate.kind, ExprKind::ConditionalExpression { .. }));
    }

    #[test]
    fn test_unary() {
        let expr = parse_one("!-x");
        let ExprKind::UnaryExpression { operator, prefix, argument } = &expr.kind else {
            panic!("Expected unary");
        };
        assert_eq!(*operator, UnaryOp::Not);
        assert!(*prefix);
        assert!(matches!(
            argument.kind,
            ExprKind::UnaryExpression { operator: UnaryOp::Minus, .. }
        ));
    }

    #[test]
    fn test_member_chain() {
        let expr = parse_one("foo.bar[0](x).baz");
        assert_eq!(expr.to_string(), "foo.bar[0](x).baz");
        let ExprKind::MemberExpression { object, computed, .. } = &expr.kind else {
            panic!("Expected member");
        };
        assert!(!computed);
        assert!(matches!(object.kind, ExprKind::CallExpression { filter: false, .. }));
        assert_eq!(expr.span, Span::new(0, 17));
    }

    #[test]
    fn test_filter_desugaring() {
        let expr = parse_one("a | f(b)");
        let ExprKind::CallExpression { callee, arguments, filter } = &expr.kind else {
            panic!("Expected call");
        };
        assert!(*filter);
        assert_eq!(name(callee), "f");
        assert_eq!(arguments.len(), 2);
        assert_eq!(name(&arguments[0]), "a");
        assert_eq!(name(&arguments[1]), "b");
    }

    #[test]
    fn test_filter_chain_nests_left_to_right() {
        let expr = parse_one("a | f | g");
        let ExprKind::CallExpression { callee, arguments, .. } = &expr.kind else {
            panic!("Expected call");
        };
        assert_eq!(name(callee), "g");
        let ExprKind::CallExpression { callee: inner, arguments: inner_args, .. } =
            &arguments[0].kind
        else {
            panic!("Expected inner call");
        };
        assert_eq!(name(inner), "f");
        assert_eq!(name(&inner_args[0]), "a");
    }

    #[test]
    fn test_filter_applies_to_whole_ternary() {
        let expr = parse_one("a ? b : c | upper");
        assert!(matches!(expr.kind, ExprKind::CallExpression { filter: true, .. }));
    }

    #[test]
    fn test_filter_requires_identifier() {
        assert_eq!(error("a | 1"), "Token \"1\" is not a valid identifier");
        assert_eq!(error("a | "), "Unexpected end of expression");
    }

    #[test]
    fn test_argument_list() {
        let expressions = parse("a, b + 1, 'c'").unwrap();
        assert_eq!(expressions.len(), 3);
        assert!(parse("").unwrap().is_empty());
        assert!(parse("  ").unwrap().is_empty());
    }

    #[test]
    fn test_array_literal() {
        let expr = parse_one("[1, a, [2],]");
        let ExprKind::ArrayExpression { elements } = &expr.kind else {
            panic!("Expected array");
        };
        assert_eq!(elements.len(), 3);
        assert!(matches!(parse_one("[]").kind, ExprKind::ArrayExpression { ref elements } if elements.is_empty()));
    }

    #[test]
    fn test_object_literal() {
        let expr = parse_one("{a: 1, 'b': x, 2: y, [k]: z, short,}");
        let ExprKind::ObjectExpression { properties } = &expr.kind else {
            panic!("Expected object");
        };
        assert_eq!(properties.len(), 5);
        assert!(!properties[0].computed);
        assert!(matches!(properties[1].key.kind, ExprKind::Literal { value: Value::String(ref s), .. } if s == "b"));
        assert!(properties[3].computed);
        assert_eq!(name(&properties[3].key), "k");
        assert!(properties[4].shorthand);
        assert_eq!(name(&properties[4].value), "short");
    }

    #[test]
    fn test_invalid_object_key() {
        assert_eq!(error("{+: 1}"), "Invalid key \"+\"");
        assert_eq!(error("{'a'}"), "Unexpected token \"}\"");
    }

    #[test]
    fn test_keyword_literals() {
        assert!(matches!(parse_one("true").kind, ExprKind::Literal { value: Value::Bool(true), .. }));
        assert!(matches!(parse_one("null").kind, ExprKind::Literal { value: Value::Null, .. }));
        assert!(matches!(parse_one("undefined").kind, ExprKind::Identifier { .. }));
    }

    #[test]
    fn test_keyword_shorthand_needs_value() {
        for source in ["{true}", "{false, a}", "{null}"] {
            let err = parse(source).unwrap_err();
            assert_eq!(err.kind, ErrorKind::UnexpectedToken, "{}", source);
            assert_eq!(err.help.as_deref(), Some("Expected \":\""));
        }

        let expr = parse_one("{true: 1}");
        let ExprKind::ObjectExpression { properties } = &expr.kind else {
            panic!("Expected object");
        };
        assert!(!properties[0].shorthand);
        assert_eq!(name(&properties[0].key), "true");
    }

    #[test]
    fn test_number_object_is_parenthesized() {
        for source in ["(1).toFixed", "(.5).x", "(0x1F)(2)"] {
            let printed = parse_one(source).to_string();
            assert_eq!(printed, source);
            assert_eq!(parse_one(&printed).to_string(), source);
        }
        assert_eq!(parse_one("('a').length").to_string(), "'a'.length");
    }

    #[test]
    fn test_parentheses() {
        let expr = parse_one("(a + b) * c");
        assert!(matches!(
            expr.kind,
            ExprKind::BinaryExpression { operator: BinaryOp::Mul, .. }
        ));
    }

    #[test]
    fn test_constant_unset_before_analysis() {
        let expr = parse_one("[1, 2]");
        assert_eq!(expr.constant, None);
    }

    #[test]
    fn test_errors() {
        assert_eq!(error("a b"), "Unexpected token \"b\"");
        assert_eq!(error("a +"), "Unexpected end of expression");
        assert_eq!(error("(a"), "Unexpected end of expression");
        assert_eq!(error("(a]"), "Unexpected token \"]\"");
        assert_eq!(error(")"), "Token \")\" is not a primary expression");
        // `.1` lexes as a number, leaving a trailing literal
        assert_eq!(error("a.1"), "Unexpected token \".1\"");
        assert_eq!(error("a.+"), "Token \"+\" is not a valid identifier");
        assert_eq!(error("a ? b"), "Unexpected end of expression");
        assert_eq!(error("a,"), "Unexpected end of expression");
    }

    #[test]
    fn test_lexer_errors_propagate() {
        let err = parse("'abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
    }

    #[test]
    fn test_error_spans() {
        let err = parse("foo bar").unwrap_err();
        assert_eq!(err.span, Span::new(4, 7));
        let err = parse("foo(").unwrap_err();
        assert_eq!(err.span, Span::new(4, 4));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = |open: &str, inner: &str, close: &str, n: usize| {
            format!("{}{}{}", open.repeat(n), inner, close.repeat(n))
        };

        let cases = [
            deep("(", "a", ")", 200_000),
            deep("[", "a", "]", 200_000),
            deep("!", "a", "", 100_000),
            deep("a ? ", "b", " : c", 10_000),
            format!("a{}", ".b".repeat(100_000)),
            format!("1{}", " + 1".repeat(100_000)),
            format!("a{}", " | f".repeat(100_000)),
            format!("f{}", "()".repeat(100_000)),
        ];
        for source in &cases {
            let err = parse(source).unwrap_err();
            assert_eq!(err.kind, ErrorKind::NestingTooDeep, "{}", &source[..20]);
            assert_eq!(err.message, "Expression nested too deeply");
            assert!(err.span.end <= source.len());
        }
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let parens = format!("{}a{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(name(&parse_one(&parens)), "a");

        let chain = format!("a{}", ".b".repeat(50));
        let mut expressions = parse(&chain).unwrap();
        let targets = crate::analysis::analyze_all(&mut expressions);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path.len(), 51);
        assert_eq!(parse_one(&chain).to_string(), chain);
    }
}
