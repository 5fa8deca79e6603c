//! Parse-tree nodes produced by the recursive-descent parser.
//!
//! Every node is a tagged variant with an explicit `kind` discriminator on
//! the wire and carries the byte span of its originating tokens. The node
//! inventory mirrors the surface language: declarations, statements,
//! expressions and type expressions.

mod expr;
mod stat;
mod types;

pub use expr::{ExpressionKind, ExpressionNode, InitializerForm};
pub use stat::{
    ElseIf, FunctionDecl, FunctionPrototype, NamedParameter, NamedType, StatementKind,
    StatementNode,
};
pub use types::{TypeKind, TypeNode};
