use serde::{Deserialize, Serialize};

/// Byte-offset range into the original source buffer.
///
/// Spans ride along on every token and survive into the IR so that
/// diagnostics can underline the offending source. On the wire a span is a
/// two element array `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<(usize, usize)> for Span {
    fn from((start, end): (usize, usize)) -> Self {
        Span { start, end }
    }
}

impl From<Span> for (usize, usize) {
    fn from(span: Span) -> Self {
        (span.start, span.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "iden")]
    Iden,
    #[serde(rename = "sym")]
    Sym,
    #[serde(rename = "str")]
    Str,
    #[serde(rename = "char")]
    Char,
    #[serde(rename = "num")]
    Num,
    #[serde(rename = "singleComment")]
    SingleComment,
    #[serde(rename = "multiComment")]
    MultiComment,
    #[serde(rename = "eof")]
    Eof,
}

/// A single lexeme. Tokens are immutable once emitted; `value` is the exact
/// slice of the source covered by `span`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(value: impl Into<String>, kind: TokenKind, span: Span) -> Self {
        Token {
            value: value.into(),
            kind,
            span,
        }
    }

    /// Sentinel emitted when the lexer halts on an unrecognized byte, and
    /// used by the parser as the recovery token.
    pub fn eof(at: usize) -> Self {
        Token::new("", TokenKind::Eof, Span::new(at, at))
    }

    pub fn matches(&self, value: &str) -> bool {
        self.value == value
    }

    pub fn matches_any(&self, values: &[&str]) -> bool {
        values.iter().any(|v| self.value == *v)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::SingleComment | TokenKind::MultiComment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_new_stores_positions() {
        let span = Span::new(5, 10);
        assert_eq!(span.start, 5);
        assert_eq!(span.end, 10);
    }

    #[test]
    fn span_merge_covers_both() {
        let merged = Span::new(4, 7).merge(Span::new(9, 12));
        assert_eq!(merged, Span::new(4, 12));
    }

    #[test]
    fn span_serializes_as_pair() {
        let json = serde_json::to_string(&Span::new(3, 8)).unwrap();
        assert_eq!(json, "[3,8]");
        let back: Span = serde_json::from_str("[3,8]").unwrap();
        assert_eq!(back, Span::new(3, 8));
    }

    #[test]
    fn token_wire_format_is_stable() {
        let tok = Token::new("let", TokenKind::Iden, Span::new(0, 3));
        let json = serde_json::to_value(&tok).unwrap();
        assert_eq!(json["value"], "let");
        assert_eq!(json["kind"], "iden");
        assert_eq!(json["span"][0], 0);
        assert_eq!(json["span"][1], 3);
    }

    #[test]
    fn token_matches_by_value() {
        let tok = Token::new("{", TokenKind::Sym, Span::new(0, 1));
        assert!(tok.matches("{"));
        assert!(tok.matches_any(&["(", "{"]));
        assert!(!tok.matches("}"));
    }
}
