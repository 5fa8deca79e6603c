use serde::{Deserialize, Serialize};

use super::expr::ExpressionNode;
use crate::token::Span;

/// A type expression as written in source. Named types stay unresolved
/// until IR lowering maps them to primitives or reference placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeNode {
    #[serde(flatten)]
    pub kind: TypeKind,
    pub span: Span,
}

impl TypeNode {
    pub fn new(kind: TypeKind, span: Span) -> Self {
        TypeNode { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TypeKind {
    /// `SomeStructureName`
    #[serde(rename = "unresolvedType")]
    Unresolved { name: String },

    /// `^T`
    #[serde(rename = "pointerType")]
    Pointer { base: Box<TypeNode> },

    /// `[T; size]`
    #[serde(rename = "arrayType")]
    Array {
        base: Box<TypeNode>,
        size: Box<ExpressionNode>,
    },

    /// `(T1, T2, ...)`
    #[serde(rename = "tupleType")]
    Tuple { types: Vec<TypeNode> },
}
