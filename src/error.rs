use serde::{Deserialize, Serialize};

use crate::token::Span;

/// A diagnostic produced by any pipeline stage.
///
/// Errors are accumulated and returned alongside the stage's artifact; no
/// stage throws. `fatal` marks diagnostics after which later stages may
/// produce misleading results (parser desynchronization, unimplemented
/// constructs), it does not stop the pipeline by itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerError {
    pub title: String,
    #[serde(default)]
    pub desc: String,
    pub fatal: bool,
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl CompilerError {
    pub fn directive_parse(what: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: what.to_string(),
            desc: String::new(),
            fatal: true,
            spans,
        }
    }

    pub fn unimplemented(what: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: format!("{} unimplemented", what),
            desc: String::new(),
            fatal: true,
            spans,
        }
    }

    pub fn parse(expected: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: format!("Expected {}", expected),
            desc: String::new(),
            fatal: true,
            spans,
        }
    }

    pub fn unexpected_token(expected: &str, found: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: format!("Expected '{}' but found '{}'", expected, found),
            desc: String::new(),
            fatal: true,
            spans,
        }
    }

    pub fn unresolved_symbol(name: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: format!("Unresolved reference to symbol '{}'", name),
            desc: String::new(),
            fatal: false,
            spans,
        }
    }

    pub fn unresolved_type(name: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: format!("Couldn't resolve type '{}'", name),
            desc: String::new(),
            fatal: false,
            spans,
        }
    }

    pub fn symbol(name: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: format!(
                "A symbol with the name '{}' already exists in this scope",
                name
            ),
            desc: String::new(),
            fatal: false,
            spans,
        }
    }

    pub fn moved_value(name: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: format!("Use of moved value '{}'", name),
            desc: String::new(),
            fatal: false,
            spans,
        }
    }

    pub fn mutability(name: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: format!("Cannot assign to immutable binding '{}'", name),
            desc: String::new(),
            fatal: false,
            spans,
        }
    }

    pub fn unused_function(name: &str, spans: Vec<Span>) -> Self {
        CompilerError {
            title: format!("Function '{}' is never used", name),
            desc: String::new(),
            fatal: false,
            spans,
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_token_formats_both_values() {
        let err = CompilerError::unexpected_token(";", "}", vec![Span::new(4, 5)]);
        assert_eq!(err.title, "Expected ';' but found '}'");
        assert!(err.fatal);
        assert_eq!(err.spans, vec![Span::new(4, 5)]);
    }

    #[test]
    fn symbol_errors_are_recoverable() {
        let err = CompilerError::symbol("x", vec![]);
        assert!(!err.fatal);
        let err = CompilerError::moved_value("a", vec![]);
        assert!(!err.fatal);
        let err = CompilerError::unused_function("helper", vec![]);
        assert!(!err.fatal);
    }

    #[test]
    fn wire_format_uses_span_pairs() {
        let err = CompilerError::parse("type", vec![Span::new(1, 2), Span::new(7, 9)]);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["title"], "Expected type");
        assert_eq!(json["fatal"], true);
        assert_eq!(json["spans"][1][0], 7);
    }
}
