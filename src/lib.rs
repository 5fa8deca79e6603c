//! caasper - the krug compiler pipeline as a service.
//!
//! Source text flows strictly forward through the stages: the lexer turns
//! bytes into spanned tokens, the recursive-descent parser builds a tagged
//! parse tree (with a companion micro-parser for `#{...}` directives), the
//! IR builder lowers the tree into a typed module model, the middle-end
//! builds scopes, declares and resolves types, resolves symbols and runs
//! the mutability / ownership / unused-function analyses, and the backend
//! renders the module into a single C translation unit.
//!
//! Every stage accumulates [`CompilerError`] diagnostics instead of
//! failing; the HTTP façade in [`api`] exposes each stage as an endpoint
//! speaking the JSON envelope format.

pub mod api;
pub mod ast;
pub mod codegen;
pub mod directive;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod middle;
pub mod parser;
pub mod token;
pub mod unit;

pub use codegen::{codegen, CodegenOptions};
pub use directive::{parse_directives, Directive};
pub use error::CompilerError;
pub use lexer::tokenize;
pub use parser::parse_token_stream;
pub use token::{Span, Token, TokenKind};
pub use unit::CompilationUnit;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
