use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::value::Value;

/// An IR type. `Reference` is an unresolved handle produced for any
/// non-primitive name; type resolution replaces it with `Structure` (or
/// reports a diagnostic) once declarations are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Type {
    #[serde(rename = "void")]
    Void,

    #[serde(rename = "int")]
    Integer { width: u8, signed: bool },

    #[serde(rename = "float")]
    Float { width: u8 },

    #[serde(rename = "ptr")]
    Pointer { base: Box<Type> },

    #[serde(rename = "array")]
    Array { base: Box<Type>, size: Box<Value> },

    #[serde(rename = "tuple")]
    Tuple { types: Vec<Type> },

    /// An unresolved named type.
    #[serde(rename = "ref")]
    Reference { name: String },

    /// A resolved named structure; the definition lives on the module.
    #[serde(rename = "struct")]
    Structure { name: String },

    #[serde(rename = "fn")]
    Function { params: Vec<Type>, ret: Box<Type> },
}

impl Type {
    pub fn signed(width: u8) -> Type {
        Type::Integer {
            width,
            signed: true,
        }
    }

    pub fn unsigned(width: u8) -> Type {
        Type::Integer {
            width,
            signed: false,
        }
    }

    pub fn float(width: u8) -> Type {
        Type::Float { width }
    }

    pub fn pointer(base: Type) -> Type {
        Type::Pointer {
            base: Box::new(base),
        }
    }

    pub fn reference(name: impl Into<String>) -> Type {
        Type::Reference { name: name.into() }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Integer { width, signed } => {
                write!(f, "{}int{}", if *signed { "s" } else { "u" }, width)
            }
            Type::Float { width } => write!(f, "flt{}", width),
            Type::Pointer { base } => write!(f, "^{}", base),
            Type::Array { base, .. } => write!(f, "[{}]", base),
            Type::Tuple { types } => {
                write!(f, "(")?;
                for (idx, t) in types.iter().enumerate() {
                    if idx != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
            Type::Reference { name } => write!(f, "#{}", name),
            Type::Structure { name } => write!(f, "{}", name),
            Type::Function { ret, .. } => write!(f, "fn -> {}", ret),
        }
    }
}

/// Primitive type names as they appear in source.
pub static PRIMITIVES: Lazy<HashMap<&'static str, Type>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("f64", Type::float(64));
    m.insert("f32", Type::float(32));

    m.insert("i8", Type::signed(8));
    m.insert("i16", Type::signed(16));
    m.insert("i32", Type::signed(32));
    m.insert("i64", Type::signed(64));

    m.insert("u8", Type::unsigned(8));
    m.insert("u16", Type::unsigned(16));
    m.insert("u32", Type::unsigned(32));
    m.insert("u64", Type::unsigned(64));

    m.insert("void", Type::Void);
    m.insert("bool", Type::unsigned(32));
    m.insert("rune", Type::signed(32));

    m.insert("int", Type::signed(32));
    m.insert("uint", Type::unsigned(32));
    m
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_table_covers_aliases() {
        assert_eq!(PRIMITIVES["int"], Type::signed(32));
        assert_eq!(PRIMITIVES["uint"], Type::unsigned(32));
        assert_eq!(PRIMITIVES["bool"], Type::unsigned(32));
        assert_eq!(PRIMITIVES["rune"], Type::signed(32));
    }

    #[test]
    fn wire_format_has_kind_discriminator() {
        let json = serde_json::to_value(Type::signed(16)).unwrap();
        assert_eq!(json["kind"], "int");
        assert_eq!(json["width"], 16);
        assert_eq!(json["signed"], true);

        let json = serde_json::to_value(Type::pointer(Type::Void)).unwrap();
        assert_eq!(json["kind"], "ptr");
        assert_eq!(json["base"]["kind"], "void");
    }

    #[test]
    fn display_matches_compiler_notation() {
        assert_eq!(Type::signed(32).to_string(), "sint32");
        assert_eq!(Type::unsigned(8).to_string(), "uint8");
        assert_eq!(Type::reference("Person").to_string(), "#Person");
    }
}
