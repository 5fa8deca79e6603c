use serde::{Deserialize, Serialize};

use super::expr::ExpressionNode;
use super::types::TypeNode;
use crate::token::{Span, Token};

/// A struct field: `name Type,`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedType {
    pub name: Token,
    #[serde(rename = "type")]
    pub type_node: TypeNode,
}

/// A function parameter: `[owned] name Type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedParameter {
    pub name: Token,
    #[serde(rename = "type")]
    pub type_node: TypeNode,
    #[serde(default)]
    pub owned: bool,
}

/// `fn` iden `(` params `)` [ type ]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionPrototype {
    pub name: Token,
    pub arguments: Vec<NamedParameter>,
    #[serde(rename = "returnType", default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeNode>,
}

/// A prototype plus its statement body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub proto: FunctionPrototype,
    pub body: Vec<StatementNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElseIf {
    pub cond: ExpressionNode,
    pub block: Vec<StatementNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementNode {
    #[serde(flatten)]
    pub kind: StatementKind,
    pub span: Span,
}

impl StatementNode {
    pub fn new(kind: StatementKind, span: Span) -> Self {
        StatementNode { kind, span }
    }
}

/// Statements and declarations share one variant space: a parse tree is a
/// flat list of these, and function bodies nest them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StatementKind {
    /// `let [owned] name [type] [= value];` - immutable binding.
    #[serde(rename = "letStat")]
    Let {
        name: Token,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        type_node: Option<TypeNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<ExpressionNode>,
        #[serde(default)]
        owned: bool,
    },

    /// `mut [owned] name [type] [= value];` - mutable binding.
    #[serde(rename = "mutStat")]
    Mut {
        name: Token,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        type_node: Option<TypeNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<ExpressionNode>,
        #[serde(default)]
        owned: bool,
    },

    #[serde(rename = "retStat")]
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<ExpressionNode>,
    },

    #[serde(rename = "breakStat")]
    Break,

    #[serde(rename = "nextStat")]
    Next,

    #[serde(rename = "blockStat")]
    Block { statements: Vec<StatementNode> },

    #[serde(rename = "exprStat")]
    Expression { value: ExpressionNode },

    #[serde(rename = "ifNode")]
    If {
        cond: ExpressionNode,
        block: Vec<StatementNode>,
        #[serde(rename = "elseIfs", default, skip_serializing_if = "Vec::is_empty")]
        else_ifs: Vec<ElseIf>,
        #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
        else_block: Option<Vec<StatementNode>>,
    },

    /// `while cond [; post] { ... }`
    #[serde(rename = "whileNode")]
    While {
        cond: ExpressionNode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        post: Option<ExpressionNode>,
        block: Vec<StatementNode>,
    },

    /// `loop { ... }` - infinite loop.
    #[serde(rename = "loopNode")]
    Loop { block: Vec<StatementNode> },

    /// `defer <stat>;` or `defer { ... }` - runs on block exit.
    #[serde(rename = "deferStat")]
    Defer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stat: Option<Box<StatementNode>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block: Option<Vec<StatementNode>>,
    },

    /// `name:` - declares a jump target.
    #[serde(rename = "labelStat")]
    Label { name: Token },

    /// `jump name;` - unconditional transfer.
    #[serde(rename = "jumpStat")]
    Jump { location: Token },

    /// `struct` iden `{` fields `}` - trailing commas enforced.
    #[serde(rename = "structDecl")]
    Structure { name: Token, fields: Vec<NamedType> },

    /// `trait` iden `{` prototypes `}`
    #[serde(rename = "traitDecl")]
    Trait {
        name: Token,
        members: Vec<FunctionPrototype>,
    },

    /// `impl` iden `{` functions `}`
    #[serde(rename = "implDecl")]
    Impl {
        name: Token,
        functions: Vec<FunctionDecl>,
    },

    #[serde(rename = "funcProtoDecl")]
    FunctionProto { proto: FunctionPrototype },

    #[serde(rename = "funcDecl")]
    Function {
        proto: FunctionPrototype,
        body: Vec<StatementNode>,
    },

    /// `type` iden `=` type `;`
    #[serde(rename = "typeAliasDecl")]
    TypeAlias {
        name: Token,
        #[serde(rename = "type")]
        type_node: TypeNode,
    },
}
