use serde::{Deserialize, Serialize};

use super::types::Type;
use crate::ast::InitializerForm;
use crate::token::Token;

/// An IR expression value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Value {
    /// Integer literal; the raw digit run is preserved for the emitter.
    #[serde(rename = "IntegerValue")]
    Integer { value: String },

    #[serde(rename = "FloatingValue")]
    Floating { value: f64 },

    /// String literal, quotes included.
    #[serde(rename = "StringValue")]
    Str { value: String },

    /// Character literal, quotes included.
    #[serde(rename = "CharValue")]
    Char { value: String },

    #[serde(rename = "Identifier")]
    Identifier { name: Token },

    #[serde(rename = "Grouping")]
    Grouping { value: Box<Value> },

    #[serde(rename = "BinaryExpression")]
    Binary {
        lhand: Box<Value>,
        op: String,
        rhand: Box<Value>,
    },

    #[serde(rename = "UnaryExpression")]
    Unary { op: String, value: Box<Value> },

    #[serde(rename = "Call")]
    Call {
        left: Box<Value>,
        params: Vec<Value>,
    },

    /// Flattened chain of sub-values for `a.b.c`.
    #[serde(rename = "Path")]
    Path { values: Vec<Value> },

    #[serde(rename = "Index")]
    Index { left: Box<Value>, sub: Box<Value> },

    #[serde(rename = "Assign")]
    Assign {
        lhand: Box<Value>,
        op: String,
        rhand: Box<Value>,
    },

    #[serde(rename = "Builtin")]
    Builtin {
        name: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        type_node: Option<Type>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<Value>,
    },

    /// Struct/tuple/array literal body.
    #[serde(rename = "Init")]
    Init {
        form: InitializerForm,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lhand: Option<Token>,
        values: Vec<Value>,
    },
}

impl Value {
    /// Trivial bottom-up type inference for literal-shaped values. Anything
    /// that needs name resolution answers `None` and is left to later
    /// passes.
    pub fn inferred_type(&self) -> Option<Type> {
        match self {
            Value::Integer { .. } => Some(Type::signed(32)),
            Value::Floating { .. } => Some(Type::float(64)),
            // a string literal is a rune string by default.
            Value::Str { .. } => Some(Type::pointer(Type::signed(32))),
            Value::Char { .. } => Some(Type::signed(8)),
            Value::Grouping { value } => value.inferred_type(),
            Value::Unary { value, .. } => value.inferred_type(),
            // pick the left type; widening is a later concern.
            Value::Binary { lhand, .. } => lhand.inferred_type(),
            Value::Builtin { name, .. } if name == "sizeof" || name == "len" => {
                Some(Type::unsigned(32))
            }
            Value::Builtin {
                name,
                type_node: Some(t),
                ..
            } if name == "alloc" || name == "make" => Some(Type::pointer(t.clone())),
            _ => None,
        }
    }

    /// The token this value hangs off, for diagnostics.
    pub fn span_token(&self) -> Option<&Token> {
        match self {
            Value::Identifier { name } => Some(name),
            Value::Grouping { value } => value.span_token(),
            Value::Unary { value, .. } => value.span_token(),
            Value::Binary { lhand, .. } => lhand.span_token(),
            Value::Call { left, .. } => left.span_token(),
            Value::Index { left, .. } => left.span_token(),
            Value::Path { values } => values.first().and_then(|v| v.span_token()),
            Value::Assign { lhand, .. } => lhand.span_token(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_inference_matches_defaults() {
        let int = Value::Integer {
            value: "42".into(),
        };
        assert_eq!(int.inferred_type(), Some(Type::signed(32)));

        let float = Value::Floating { value: 2.5 };
        assert_eq!(float.inferred_type(), Some(Type::float(64)));

        let string = Value::Str {
            value: "\"hi\"".into(),
        };
        assert_eq!(
            string.inferred_type(),
            Some(Type::pointer(Type::signed(32)))
        );

        let ch = Value::Char {
            value: "'c'".into(),
        };
        assert_eq!(ch.inferred_type(), Some(Type::signed(8)));
    }

    #[test]
    fn identifier_inference_defers_to_sema() {
        let iden = Value::Identifier {
            name: Token::eof(0),
        };
        assert_eq!(iden.inferred_type(), None);
    }

    #[test]
    fn binary_inference_takes_left_operand() {
        let expr = Value::Binary {
            lhand: Box::new(Value::Floating { value: 1.0 }),
            op: "+".into(),
            rhand: Box::new(Value::Integer { value: "2".into() }),
        };
        assert_eq!(expr.inferred_type(), Some(Type::float(64)));
    }
}
