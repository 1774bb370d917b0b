//! Caching front end tying the pre-processor, parser and analyzer together.

use crate::analysis::{WatchTarget, analyze_all};
use crate::ast::Expression;
use crate::error::SyntaxError;
use crate::parser::{ExpressionParser, Parser};
use crate::preprocess::{self, Decorator, Segment};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Configuration for a [`Compiler`]
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Reuse results for identical source strings
    pub cache: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self { cache: true }
    }
}

/// Parsed and analyzed decorator expression
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledExpression {
    pub source: String,
    pub expressions: Vec<Expression>,
    pub targets: Vec<WatchTarget>,
    /// Every top-level expression is constant
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledDecorator {
    #[serde(flatten)]
    pub decorator: Decorator,
    pub compiled: Arc<CompiledExpression>,
}

/// Pre-processed markup plus the compiled expression of each decorator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledTemplate {
    pub markup: String,
    pub decorators: Vec<CompiledDecorator>,
}

impl CompiledTemplate {
    /// Compact view of the decorators: header fields, watch paths and
    /// constness, without trees or spans
    pub fn outline(&self) -> serde_json::Value {
        let decorators: Vec<serde_json::Value> = self
            .decorators
            .iter()
            .map(|d| {
                let targets: Vec<String> =
                    d.compiled.targets.iter().map(|t| t.to_string()).collect();
                serde_json::json!({
                    "name": d.decorator.name,
                    "type": d.decorator.kind.as_str(),
                    "label": d.decorator.label,
                    "model": d.decorator.model,
                    "expression": d.decorator.expression,
                    "targets": targets,
                    "constant": d.compiled.constant,
                })
            })
            .collect();

        serde_json::json!({ "decorators": decorators })
    }
}

/// Compiles expressions and templates, memoizing by source text.
///
/// Each instance owns its cache; share work between threads by giving each
/// its own `Compiler`.
#[derive(Debug, Default)]
pub struct Compiler {
    options: CompilerOptions,
    parser: ExpressionParser,
    expressions: HashMap<String, Arc<CompiledExpression>>,
    templates: HashMap<String, Arc<CompiledTemplate>>,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            parser: ExpressionParser::new(),
            expressions: HashMap::new(),
            templates: HashMap::new(),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn compile_expression(
        &mut self,
        source: &str,
    ) -> Result<Arc<CompiledExpression>, SyntaxError> {
        if let Some(hit) = self.expressions.get(source) {
            trace!(source, "expression cache hit");
            return Ok(Arc::clone(hit));
        }

        let mut expressions = self.parser.parse(source)?;
        let targets = analyze_all(&mut expressions);
        let constant = expressions.iter().all(Expression::is_constant);

        debug!(
            source,
            expressions = expressions.len(),
            targets = targets.len(),
            constant,
            "compiled expression"
        );

        let compiled = Arc::new(CompiledExpression {
            source: source.to_string(),
            expressions,
            targets,
            constant,
        });

        if self.options.cache {
            self.expressions
                .insert(source.to_string(), Arc::clone(&compiled));
        }

        Ok(compiled)
    }

    /// Pre-process `source` and compile every decorator expression in it.
    ///
    /// Expression errors are reported with spans into `source`.
    pub fn compile_template(&mut self, source: &str) -> Result<Arc<CompiledTemplate>, SyntaxError> {
        if let Some(hit) = self.templates.get(source) {
            trace!(len = source.len(), "template cache hit");
            return Ok(Arc::clone(hit));
        }

        let segments = preprocess::scan(source)?;
        let markup = preprocess::render(&segments);

        let mut decorators = Vec::new();
        for segment in segments {
            let Segment::Decorator(decorator) = segment else {
                continue;
            };
            let compiled = self
                .compile_expression(&decorator.expression)
                .map_err(|e| e.shifted(decorator.expression_span.start))?;
            decorators.push(CompiledDecorator {
                decorator,
                compiled,
            });
        }

        debug!(
            len = source.len(),
            decorators = decorators.len(),
            "compiled template"
        );

        let compiled = Arc::new(CompiledTemplate { markup, decorators });

        if self.options.cache {
            self.templates
                .insert(source.to_string(), Arc::clone(&compiled));
        }

        Ok(compiled)
    }

    pub fn clear_cache(&mut self) {
        debug!(
            expressions = self.expressions.len(),
            templates = self.templates.len(),
            "clearing cache"
        );
        self.expressions.clear();
        self.templates.clear();
    }

    /// Number of cached expressions and templates
    pub fn cache_len(&self) -> usize {
        self.expressions.len() + self.templates.len()
    }
}
