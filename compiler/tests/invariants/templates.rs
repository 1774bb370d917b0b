use dp_compiler::{Compiler, CompilerOptions, Segment, process, scan};
use libtest_mimic::{Failed, Trial};
use std::fs;
use std::path::PathBuf;

/// Fixture templates that are expected to compile
fn templates() -> Result<Vec<(PathBuf, String)>, Failed> {
    let pattern = format!("{}/tests/fixtures/**/*.tpl", env!("CARGO_MANIFEST_DIR"));
    let mut out = Vec::new();
    for path in glob::glob(&pattern)?.filter_map(Result::ok) {
        if path.components().any(|c| c.as_os_str() == "errors") {
            continue;
        }
        let source = fs::read_to_string(&path)?;
        out.push((path, source));
    }
    if out.is_empty() {
        return Err(format!("no fixtures matched {}", pattern).into());
    }
    out.sort();
    Ok(out)
}

/// Lines free of decorator syntax pass through unchanged
fn plain_lines_round_trip() -> Result<(), Failed> {
    for (path, source) in templates()? {
        for line in source.lines() {
            if line.contains(['[', '{', '\\']) || line.contains("<!--") {
                continue;
            }
            let processed = process(line)?;
            if processed != line {
                return Err(format!("{}: {:?} became {:?}", path.display(), line, processed).into());
            }
        }
    }
    Ok(())
}

/// Decorator spans point back at their own syntax in the source
fn decorator_spans_cover_source() -> Result<(), Failed> {
    for (path, source) in templates()? {
        for segment in scan(&source)? {
            let Segment::Decorator(decorator) = segment else {
                continue;
            };
            let whole = &source[decorator.span.start..decorator.span.end];
            let inner = &source[decorator.expression_span.start..decorator.expression_span.end];

            let opens = if decorator.target { '{' } else { '[' };
            let closes = if decorator.target { '}' } else { ']' };
            if !whole.starts_with(opens) || !whole.ends_with(closes) {
                return Err(format!("{}: decorator span {:?}", path.display(), whole).into());
            }
            if inner != decorator.expression {
                return Err(format!(
                    "{}: expression span {:?} != {:?}",
                    path.display(),
                    inner,
                    decorator.expression
                )
                .into());
            }
            if decorator.expression_span.start < decorator.span.start
                || decorator.expression_span.end > decorator.span.end
            {
                return Err(format!("{}: expression outside decorator", path.display()).into());
            }
        }
    }
    Ok(())
}

/// Text segments and decorators appear in source order without overlap
fn segments_are_ordered() -> Result<(), Failed> {
    for (path, source) in templates()? {
        let mut last_end = 0;
        for segment in scan(&source)? {
            if let Segment::Decorator(decorator) = segment {
                if decorator.span.start < last_end {
                    return Err(format!("{}: decorators overlap", path.display()).into());
                }
                last_end = decorator.span.end;
            }
        }
    }
    Ok(())
}

/// The cache never changes what gets compiled
fn cache_is_transparent() -> Result<(), Failed> {
    let mut cached = Compiler::new(CompilerOptions { cache: true });
    let mut uncached = Compiler::new(CompilerOptions { cache: false });

    for (path, source) in templates()? {
        let first = cached.compile_template(&source)?;
        let again = cached.compile_template(&source)?;
        let fresh = uncached.compile_template(&source)?;
        if first != again || first != fresh {
            return Err(format!("{}: cached result differs", path.display()).into());
        }
        if first.markup != process(&source)? {
            return Err(format!("{}: compiled markup differs from process()", path.display()).into());
        }
    }
    Ok(())
}

pub fn trials() -> Vec<Trial> {
    vec![
        Trial::test("templates::plain_lines_round_trip", plain_lines_round_trip),
        Trial::test("templates::decorator_spans_cover_source", decorator_spans_cover_source),
        Trial::test("templates::segments_are_ordered", segments_are_ordered),
        Trial::test("templates::cache_is_transparent", cache_is_transparent),
    ]
}
