use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::error::CompilerError;
use crate::token::{Span, Token, TokenKind};

/// Operators that fuse into a single two character symbol token. Exactly
/// these and no more.
static DOUBLE_SYMBOLS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "==", "!=", "&&", "||", "<=", ">=", "+=", "-=", "*=", "/=", "%=",
    ]
    .into_iter()
    .collect()
});

static SYMBOLS: Lazy<HashSet<char>> = Lazy::new(|| {
    [
        '+', '-', '/', '*', '%', '=', '(', ')', '{', '}', '[', ']', '<', '>', '.', '$', '!', '?',
        '#', ',', '|', '&', '~', ';', ':', '@', '^',
    ]
    .into_iter()
    .collect()
});

/// Streaming tokenizer over a UTF-8 buffer.
///
/// The lexer is a small state machine: each `lex_*` method consumes one
/// token starting at `self.start` and emits it with its byte span. Layout
/// bytes are dropped, comments are either emitted or suppressed depending
/// on `skip_comments`.
struct Lexer<'src> {
    src: &'src str,
    pos: usize,
    start: usize,
    stream: Vec<Token>,
    errors: Vec<CompilerError>,
    skip_comments: bool,
}

/// Tokenize `source`, recording a byte span for every token. With
/// `skip_comments` set, comment tokens are dropped from the stream.
pub fn tokenize(source: &str, skip_comments: bool) -> (Vec<Token>, Vec<CompilerError>) {
    let mut lexer = Lexer {
        src: source,
        pos: 0,
        start: 0,
        stream: Vec::new(),
        errors: Vec::new(),
        skip_comments,
    };
    lexer.run();
    (lexer.stream, lexer.errors)
}

impl<'src> Lexer<'src> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(offset)
    }

    fn consume(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn emit(&mut self, kind: TokenKind) {
        let span = Span::new(self.start, self.pos);
        let value = &self.src[self.start..self.pos];
        self.stream.push(Token::new(value, kind, span));
        self.start = self.pos;
    }

    fn ignore(&mut self) {
        self.start = self.pos;
    }

    fn error(&mut self, err: CompilerError) {
        self.errors.push(err);
    }

    fn run(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.lex_number();
            } else if is_identifier_char(c) {
                self.lex_identifier();
            } else if c == '/' {
                if !self.lex_comment() {
                    return;
                }
            } else if c == '\'' {
                if !self.lex_char() {
                    return;
                }
            } else if c == '"' || c == '`' {
                if !self.lex_quote() {
                    return;
                }
            } else if SYMBOLS.contains(&c) {
                self.lex_symbol();
            } else if c <= ' ' {
                // layout, drop it.
                self.consume();
                self.ignore();
            } else {
                // unrecognized byte: close the stream and halt.
                self.stream.push(Token::eof(self.pos));
                return;
            }
        }
    }

    fn lex_identifier(&mut self) {
        while let Some(c) = self.peek() {
            if !is_identifier_char(c) && !c.is_ascii_digit() {
                break;
            }
            self.consume();
        }
        self.emit(TokenKind::Iden);
    }

    fn lex_number(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.consume();
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.consume();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.consume();
            }
        }
        self.emit(TokenKind::Num);
    }

    fn lex_char(&mut self) -> bool {
        self.consume(); // opening quote
        loop {
            match self.consume() {
                Some('\'') => {
                    self.emit(TokenKind::Char);
                    return true;
                }
                Some(_) => {}
                None => {
                    self.error(CompilerError::parse(
                        "closing ' in character literal",
                        vec![Span::new(self.start, self.pos)],
                    ));
                    return false;
                }
            }
        }
    }

    fn lex_quote(&mut self) -> bool {
        let open = self.consume().unwrap_or('"');
        loop {
            match self.consume() {
                Some(c) if c == open => {
                    self.emit(TokenKind::Str);
                    return true;
                }
                Some(_) => {}
                None => {
                    self.error(CompilerError::parse(
                        "closing quote in string literal",
                        vec![Span::new(self.start, self.pos)],
                    ));
                    return false;
                }
            }
        }
    }

    fn lex_symbol(&mut self) {
        let first = self.consume().unwrap_or_default();
        if let Some(second) = self.peek() {
            let mut fused = String::with_capacity(2);
            fused.push(first);
            fused.push(second);
            if DOUBLE_SYMBOLS.contains(fused.as_str()) {
                self.consume();
            }
        }
        self.emit(TokenKind::Sym);
    }

    /// Dispatches `/` into a comment or a plain symbol. Returns false if
    /// the scan cannot continue.
    fn lex_comment(&mut self) -> bool {
        match self.peek_at(1) {
            Some('*') => self.lex_multi_line(),
            Some('/') => {
                self.lex_single_line();
                true
            }
            _ => {
                self.lex_symbol();
                true
            }
        }
    }

    fn lex_single_line(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.consume();
        }
        if self.skip_comments {
            self.ignore();
        } else {
            self.emit(TokenKind::SingleComment);
        }
        // drop the newline terminating the comment, if any.
        if self.peek() == Some('\n') {
            self.consume();
            self.ignore();
        }
    }

    /// Multi-line comments nest: every `/*` increments, every `*/`
    /// decrements, the token ends when the counter returns to zero.
    fn lex_multi_line(&mut self) -> bool {
        self.consume();
        self.consume();
        let mut nest = 1usize;

        while nest > 0 {
            match (self.peek(), self.peek_at(1)) {
                (Some('/'), Some('*')) => {
                    self.consume();
                    self.consume();
                    nest += 1;
                }
                (Some('*'), Some('/')) => {
                    self.consume();
                    self.consume();
                    nest -= 1;
                }
                (Some(_), _) => {
                    self.consume();
                }
                (None, _) => {
                    self.error(CompilerError::parse(
                        "closing */ in comment",
                        vec![Span::new(self.start, self.pos)],
                    ));
                    return false;
                }
            }
        }

        if self.skip_comments {
            self.ignore();
        } else {
            self.emit(TokenKind::MultiComment);
        }
        true
    }
}

fn is_identifier_char(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}
