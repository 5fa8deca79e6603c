use serde::{Deserialize, Serialize};

use super::stat::{FunctionPrototype, StatementNode};
use super::types::TypeNode;
use crate::token::{Span, Token};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionNode {
    #[serde(flatten)]
    pub kind: ExpressionKind,
    pub span: Span,
}

impl ExpressionNode {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        ExpressionNode { kind, span }
    }
}

/// Shape of an initializer literal body. The parser records what it saw;
/// the IR builder refines the form from the declared type where one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitializerForm {
    #[serde(rename = "array")]
    Array,
    #[serde(rename = "tuple")]
    Tuple,
    #[serde(rename = "struct")]
    Struct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ExpressionKind {
    /// Integer literal, value kept as the raw digit run.
    #[serde(rename = "integerConst")]
    IntegerConst { value: String },

    #[serde(rename = "floatingConst")]
    FloatingConst { value: f64 },

    /// String literal, quotes included.
    #[serde(rename = "stringConst")]
    StringConst { value: String },

    /// Character literal, quotes included.
    #[serde(rename = "charConst")]
    CharConst { value: String },

    #[serde(rename = "variableExpr")]
    Variable { name: Token },

    #[serde(rename = "unaryExpr")]
    Unary {
        op: String,
        value: Box<ExpressionNode>,
    },

    #[serde(rename = "binaryExpr")]
    Binary {
        lhand: Box<ExpressionNode>,
        op: String,
        rhand: Box<ExpressionNode>,
    },

    #[serde(rename = "groupingExpr")]
    Grouping { value: Box<ExpressionNode> },

    #[serde(rename = "callExpr")]
    Call {
        left: Box<ExpressionNode>,
        params: Vec<ExpressionNode>,
    },

    #[serde(rename = "indexExpr")]
    Index {
        left: Box<ExpressionNode>,
        value: Box<ExpressionNode>,
    },

    /// Flattened dot chain `a.b.c`.
    #[serde(rename = "pathExpr")]
    Path { values: Vec<ExpressionNode> },

    #[serde(rename = "assignExpr")]
    Assign {
        lhand: Box<ExpressionNode>,
        op: String,
        rhand: Box<ExpressionNode>,
    },

    /// `name!<T>`, `name!<T>(args)`, `name!(args)` or `name!T`.
    #[serde(rename = "builtinExpr")]
    Builtin {
        name: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        type_node: Option<TypeNode>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<ExpressionNode>,
    },

    /// `{ e1, e2, ... }` literal body for arrays, tuples and structures.
    #[serde(rename = "initExpr")]
    Initializer {
        form: InitializerForm,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lhand: Option<Token>,
        values: Vec<ExpressionNode>,
    },

    /// `fn (args) ret { ... }` in expression position.
    #[serde(rename = "lambdaExpr")]
    Lambda {
        proto: FunctionPrototype,
        body: Vec<StatementNode>,
    },
}
