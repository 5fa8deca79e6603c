//! Hand-written recursive-descent parser over a token slice.
//!
//! Recovery is error-accumulating: a failed expectation records an
//! `UnexpectedToken` diagnostic, yields a sentinel bad token, and parsing
//! continues. The caller receives every node that could be recovered plus
//! the full diagnostic list.

mod decl;
mod expr;
mod stat;

#[cfg(test)]
mod tests;

use crate::ast::StatementNode;
use crate::error::CompilerError;
use crate::token::{Token, TokenKind};

pub(crate) struct Parser {
    toks: Vec<Token>,
    pos: usize,
    errors: Vec<CompilerError>,
}

/// Parses a token stream into a flat list of top-level parse nodes.
/// Comment tokens are tolerated and skipped.
pub fn parse_token_stream(toks: &[Token]) -> (Vec<StatementNode>, Vec<CompilerError>) {
    let mut parser = Parser::new(toks);

    let mut nodes = Vec::new();
    while parser.has_next() {
        let before = parser.pos;
        if let Some(node) = parser.parse_node() {
            nodes.push(node);
        }
        if parser.pos == before {
            // no progress was made on a broken node, force it.
            parser.consume();
        }
    }
    (nodes, parser.errors)
}

impl Parser {
    pub(crate) fn new(toks: &[Token]) -> Self {
        Parser {
            toks: toks.iter().filter(|t| !t.is_comment()).cloned().collect(),
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, err: CompilerError) {
        self.errors.push(err);
    }

    pub(crate) fn has_next(&self) -> bool {
        self.pos < self.toks.len()
    }

    pub(crate) fn next(&self) -> Option<&Token> {
        self.toks.get(self.pos)
    }

    pub(crate) fn peek(&self, offset: usize) -> Option<&Token> {
        self.toks.get(self.pos + offset)
    }

    pub(crate) fn next_is(&self, value: &str) -> bool {
        self.next().map(|t| t.matches(value)).unwrap_or(false)
    }

    pub(crate) fn next_is_any(&self, values: &[&str]) -> bool {
        self.next().map(|t| t.matches_any(values)).unwrap_or(false)
    }

    pub(crate) fn peek_is(&self, offset: usize, value: &str) -> bool {
        self.peek(offset).map(|t| t.matches(value)).unwrap_or(false)
    }

    pub(crate) fn next_kind_is(&self, kind: TokenKind) -> bool {
        self.next().map(|t| t.kind == kind).unwrap_or(false)
    }

    /// Sentinel returned when an expectation fails; carries the position of
    /// the failure so diagnostics still point somewhere useful.
    pub(crate) fn bad_token(&self) -> Token {
        let at = self
            .next()
            .or_else(|| self.toks.last())
            .map(|t| t.span.start)
            .unwrap_or(0);
        Token::eof(at)
    }

    pub(crate) fn consume(&mut self) -> Token {
        match self.toks.get(self.pos) {
            Some(tok) => {
                let tok = tok.clone();
                self.pos += 1;
                tok
            }
            None => self.bad_token(),
        }
    }

    pub(crate) fn expect(&mut self, value: &str) -> Token {
        if self.has_next() {
            let tok = self.consume();
            if tok.matches(value) {
                return tok;
            }
            self.error(CompilerError::unexpected_token(
                value,
                &tok.value,
                vec![tok.span],
            ));
            return self.bad_token();
        }

        let bad = self.bad_token();
        self.error(CompilerError::unexpected_token(
            value,
            "end of input",
            vec![bad.span],
        ));
        bad
    }

    pub(crate) fn expect_kind(&mut self, kind: TokenKind) -> Token {
        if self.has_next() {
            let tok = self.consume();
            if tok.kind == kind {
                return tok;
            }
            self.error(CompilerError::unexpected_token(
                &format!("{:?}", kind),
                &tok.value,
                vec![tok.span],
            ));
            return self.bad_token();
        }

        let bad = self.bad_token();
        self.error(CompilerError::unexpected_token(
            &format!("{:?}", kind),
            "end of input",
            vec![bad.span],
        ));
        bad
    }

    /// Span covering everything consumed since the token index `start`.
    pub(crate) fn span_since(&self, start: usize) -> crate::token::Span {
        let first = self.toks.get(start).map(|t| t.span).unwrap_or_default();
        let last_idx = self.pos.saturating_sub(1);
        let last = self
            .toks
            .get(last_idx.max(start))
            .map(|t| t.span)
            .unwrap_or(first);
        first.merge(last)
    }
}
