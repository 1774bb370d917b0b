use dp_compiler::{ExprKind, Expression, analyze_all, parse};
use libtest_mimic::{Failed, Trial};

const CORPUS: &[&str] = &[
    "foo",
    "foo.bar.pia",
    "foo()",
    "foo.bar[hia.pia].yo",
    "foo.bar[0].yo",
    "(1 + foo.bar).xxx[0].yo",
    "foo().bar",
    "a | f(b)",
    "items | limit(count) | sort",
    "(a | f) + 1",
    "a ? b : c ? d : e",
    "(a ? b : c).d",
    "!-x",
    "-(a + b) * c",
    "a || b && c == d < e + f * g % h",
    "a - (b - c)",
    "[1, 2, 3]",
    "[1, foo, [bar.baz]]",
    "{a: 1, 'b': x.y, 2: z, [k]: v, short}",
    "{[foo]: 1}",
    "'str'.length",
    "\"a\\nb\" + 'c'",
    "1e3 + .5 + 0x1F",
    "true ? null : false",
    "user.name, user.email | lower, 42",
    "f(a, b)(c).d[e]",
    "a | f(b | g)",
    "(1).toFixed",
    "(.5).x",
    "(0x1F)[k](2)",
];

fn parse_all() -> Result<Vec<(&'static str, Vec<Expression>)>, Failed> {
    CORPUS
        .iter()
        .map(|source| {
            parse(source)
                .map(|exprs| (*source, exprs))
                .map_err(|e| Failed::from(format!("{:?}: {}", source, e)))
        })
        .collect()
}

fn walk<'a>(expr: &'a Expression, out: &mut Vec<&'a Expression>) {
    out.push(expr);
    for child in expr.children() {
        walk(child, out);
    }
}

fn nodes(expressions: &[Expression]) -> Vec<&Expression> {
    let mut out = Vec::new();
    for expr in expressions {
        walk(expr, &mut out);
    }
    out
}

fn render(expressions: &[Expression]) -> String {
    expressions
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Printing a tree and parsing it back gives the same tree shape
fn display_round_trips() -> Result<(), Failed> {
    for (source, expressions) in parse_all()? {
        let printed = render(&expressions);
        let reparsed = parse(&printed).map_err(|e| format!("{:?} printed as {:?}: {}", source, printed, e))?;
        let reprinted = render(&reparsed);
        if printed != reprinted {
            return Err(format!("{:?}: {:?} reprinted as {:?}", source, printed, reprinted).into());
        }
    }
    Ok(())
}

/// Every node's span lies inside the source and inside its parent's span
fn spans_nest() -> Result<(), Failed> {
    fn check(source: &str, expr: &Expression) -> Result<(), Failed> {
        if expr.span.start > expr.span.end || expr.span.end > source.len() {
            return Err(format!("{:?}: span {:?} out of bounds", source, expr.span).into());
        }
        for child in expr.children() {
            if child.span.start < expr.span.start || child.span.end > expr.span.end {
                return Err(format!(
                    "{:?}: child {} {:?} escapes parent {} {:?}",
                    source, child, child.span, expr, expr.span
                )
                .into());
            }
            check(source, child)?;
        }
        Ok(())
    }

    for (source, expressions) in parse_all()? {
        for expr in &expressions {
            check(source, expr)?;
        }
    }
    Ok(())
}

/// Filters always receive their input as the first argument
fn filter_calls_take_input_first() -> Result<(), Failed> {
    for (source, expressions) in parse_all()? {
        for node in nodes(&expressions) {
            if let ExprKind::CallExpression {
                callee,
                arguments,
                filter: true,
            } = &node.kind
            {
                let Some(input) = arguments.first() else {
                    return Err(format!("{:?}: filter {} without input", source, callee).into());
                };
                if input.span.end > callee.span.start {
                    return Err(format!("{:?}: filter input {} after {}", source, input, callee).into());
                }
                if !matches!(callee.kind, ExprKind::Identifier { .. }) {
                    return Err(format!("{:?}: filter callee {} is not a name", source, callee).into());
                }
            }
        }
    }
    Ok(())
}

/// After analysis every node is marked, and a constant node has only
/// constant children
fn constant_is_transitive() -> Result<(), Failed> {
    for (source, mut expressions) in parse_all()? {
        analyze_all(&mut expressions);
        for node in nodes(&expressions) {
            let ExprKind::MemberExpression { computed: false, .. } = node.kind else {
                if node.constant.is_none() {
                    return Err(format!("{:?}: {} was not analyzed", source, node).into());
                }
                if node.is_constant() && !node.children().iter().all(|c| c.is_constant()) {
                    return Err(format!("{:?}: {} constant with non-constant child", source, node).into());
                }
                continue;
            };
            if node.is_constant() != node.children().iter().all(|c| c.is_constant()) {
                return Err(format!("{:?}: member {} disagrees with its object", source, node).into());
            }
        }
    }
    Ok(())
}

/// Targets are static paths, and never the object of another target
fn targets_are_maximal_paths() -> Result<(), Failed> {
    for (source, mut expressions) in parse_all()? {
        let targets = analyze_all(&mut expressions);
        for target in &targets {
            if target.expression.static_path().as_ref() != Some(&target.path) {
                return Err(format!("{:?}: target {} is not its own path", source, target).into());
            }
        }

        // A chain `a.b.c` reports only the full path
        for node in nodes(&expressions) {
            if let ExprKind::MemberExpression {
                object,
                computed: false,
                ..
            } = &node.kind
            {
                if node.static_path().is_some()
                    && targets.iter().any(|t| t.expression.span == object.span && t.expression == **object)
                {
                    return Err(format!("{:?}: {} reported inside {}", source, object, node).into());
                }
            }
        }
    }
    Ok(())
}

pub fn trials() -> Vec<Trial> {
    vec![
        Trial::test("expressions::display_round_trips", display_round_trips),
        Trial::test("expressions::spans_nest", spans_nest),
        Trial::test("expressions::filter_calls_take_input_first", filter_calls_take_input_first),
        Trial::test("expressions::constant_is_transitive", constant_is_transitive),
        Trial::test("expressions::targets_are_maximal_paths", targets_are_maximal_paths),
    ]
}
