//! Compiler for decorator templates.
//!
//! Templates carry decorators (`[name expr]`, `[#name expr]`) and text
//! templates (`{expr}`, `{=expr}`). The pre-processor rewrites them into
//! `<dp:decorator>` markup; decorator expressions are tokenized, parsed into
//! trees, and analyzed for constant subtrees and the property paths a
//! reactive runtime has to watch.
//!
//! ```
//! use dp_compiler::{Compiler, CompilerOptions};
//!
//! let mut compiler = Compiler::new(CompilerOptions::default());
//! let compiled = compiler.compile_expression("user.name | upper").unwrap();
//! assert_eq!(compiled.targets[1].to_string(), "user.name");
//! ```

pub mod analysis;
pub mod ast;
pub mod compiler;
pub mod error;
mod html;
pub mod parser;
pub mod preprocess;

pub use analysis::{WatchTarget, analyze, analyze_all};
pub use ast::{BinaryOp, ExprKind, Expression, LogicalOp, Property, UnaryOp, Value};
pub use compiler::{
    CompiledDecorator, CompiledExpression, CompiledTemplate, Compiler, CompilerOptions,
};
pub use error::{ErrorKind, Phase, SyntaxError};
pub use parser::{
    ExpressionParser, Parser, Position, Span, Token, TokenKind, Tokenizer, parse, tokenize,
};
pub use preprocess::{Decorator, DecoratorKind, Segment, decorators, process, render, scan};
