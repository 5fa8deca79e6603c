use serde::{Deserialize, Serialize};

use crate::error::CompilerError;
use crate::token::{Span, Token, TokenKind};

/// A source-level annotation recognized by the directive micro-parser,
/// written as `#{ name(arg, ...), name, ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Directive {
    /// `#{include("stdio.h")}`
    #[serde(rename = "include")]
    Include { path: String },

    /// `#{link("-lm", "-lpthread")}`
    #[serde(rename = "link")]
    Link { flags: Vec<String> },

    /// `#{align(16)}`
    #[serde(rename = "align")]
    Align { align: u64 },

    #[serde(rename = "no_mangle")]
    NoMangle,

    #[serde(rename = "packed")]
    Packed,

    #[serde(rename = "clang")]
    Clang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgKind {
    Str,
    Integer,
    Floating,
    Character,
}

struct Arg {
    kind: ArgKind,
    token: Token,
}

struct DirectiveParser<'toks> {
    toks: &'toks [Token],
    pos: usize,
    errors: Vec<CompilerError>,
}

/// Scans a token stream for `#{ ... }` annotation blocks and parses every
/// directive inside them. A malformed directive produces an error and
/// recovery continues at the next comma so the rest of the block survives.
pub fn parse_directives(toks: &[Token]) -> (Vec<Directive>, Vec<CompilerError>) {
    let mut parser = DirectiveParser {
        toks,
        pos: 0,
        errors: Vec::new(),
    };

    let mut directives = Vec::new();
    while parser.has_next() {
        if parser.next_matches("#") && parser.peek_matches(1, "{") {
            directives.extend(parser.parse_block());
        } else {
            parser.pos += 1;
        }
    }
    (directives, parser.errors)
}

impl<'toks> DirectiveParser<'toks> {
    fn has_next(&self) -> bool {
        self.pos < self.toks.len()
    }

    fn next(&self) -> Option<&Token> {
        self.toks.get(self.pos)
    }

    fn next_matches(&self, value: &str) -> bool {
        self.next().map(|t| t.matches(value)).unwrap_or(false)
    }

    fn peek_matches(&self, offset: usize, value: &str) -> bool {
        self.toks
            .get(self.pos + offset)
            .map(|t| t.matches(value))
            .unwrap_or(false)
    }

    fn consume(&mut self) -> Option<Token> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn span_here(&self) -> Span {
        self.next()
            .map(|t| t.span)
            .or_else(|| self.toks.last().map(|t| t.span))
            .unwrap_or_default()
    }

    fn error(&mut self, what: &str, span: Span) {
        self.errors
            .push(CompilerError::directive_parse(what, vec![span]));
    }

    fn expect(&mut self, value: &str) -> bool {
        if self.next_matches(value) {
            self.pos += 1;
            true
        } else {
            let span = self.span_here();
            self.error(&format!("expected '{}' in directive", value), span);
            false
        }
    }

    /// Skip ahead to the next comma-separated directive (or the end of the
    /// block) after a parse failure.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        while let Some(tok) = self.next() {
            match tok.value.as_str() {
                "(" => depth += 1,
                ")" if depth > 0 => depth -= 1,
                "," if depth == 0 => return,
                "}" if depth == 0 => return,
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn parse_block(&mut self) -> Vec<Directive> {
        self.expect("#");
        self.expect("{");

        let mut directives = Vec::new();
        loop {
            if !self.has_next() {
                let span = self.span_here();
                self.error("unterminated directive block", span);
                break;
            }
            if self.next_matches("}") {
                self.pos += 1;
                break;
            }

            if let Some(dir) = self.parse_directive() {
                directives.push(dir);
            } else {
                self.synchronize();
            }

            if self.next_matches(",") {
                self.pos += 1;
            }
        }
        directives
    }

    fn parse_directive(&mut self) -> Option<Directive> {
        let word = match self.consume() {
            Some(tok) if tok.kind == TokenKind::Iden => tok,
            Some(tok) => {
                self.error("expected directive name", tok.span);
                return None;
            }
            None => return None,
        };

        match word.value.as_str() {
            "include" => self.parse_include(&word),
            "link" => self.parse_link(&word),
            "align" => self.parse_align(&word),
            "no_mangle" => Some(Directive::NoMangle),
            "packed" => Some(Directive::Packed),
            "clang" => Some(Directive::Clang),
            other => {
                self.error(&format!("unrecognized directive '{}'", other), word.span);
                None
            }
        }
    }

    fn parse_argument_list(&mut self) -> Option<Vec<Arg>> {
        if !self.expect("(") {
            return None;
        }

        let mut args = Vec::new();
        let mut idx = 0;
        while self.has_next() && !self.next_matches(")") {
            if idx != 0 && !self.expect(",") {
                return None;
            }

            let tok = self.consume()?;
            let kind = match tok.kind {
                TokenKind::Str => ArgKind::Str,
                TokenKind::Num if tok.value.contains('.') => ArgKind::Floating,
                TokenKind::Num => ArgKind::Integer,
                TokenKind::Char => ArgKind::Character,
                _ => {
                    self.error("unhandled directive argument", tok.span);
                    return None;
                }
            };

            args.push(Arg { kind, token: tok });
            idx += 1;
        }

        if !self.expect(")") {
            return None;
        }
        Some(args)
    }

    fn parse_include(&mut self, word: &Token) -> Option<Directive> {
        let args = self.parse_argument_list()?;
        if args.len() != 1 {
            self.error("include takes exactly one argument", word.span);
            return None;
        }
        if args[0].kind != ArgKind::Str {
            self.error(
                "include takes one parameter of type 'string'",
                args[0].token.span,
            );
            return None;
        }
        Some(Directive::Include {
            path: unquote(&args[0].token.value),
        })
    }

    fn parse_link(&mut self, word: &Token) -> Option<Directive> {
        let args = self.parse_argument_list()?;
        if args.is_empty() {
            self.error("link takes at least one flag", word.span);
            return None;
        }
        let mut flags = Vec::with_capacity(args.len());
        for arg in &args {
            if arg.kind != ArgKind::Str {
                self.error("link flags must be strings", arg.token.span);
                return None;
            }
            flags.push(unquote(&arg.token.value));
        }
        Some(Directive::Link { flags })
    }

    fn parse_align(&mut self, word: &Token) -> Option<Directive> {
        let args = self.parse_argument_list()?;
        if args.len() != 1 {
            self.error("align takes exactly one argument", word.span);
            return None;
        }
        if args[0].kind != ArgKind::Integer {
            self.error("align takes one integer parameter", args[0].token.span);
            return None;
        }
        match args[0].token.value.parse::<u64>() {
            Ok(align) => Some(Directive::Align { align }),
            Err(_) => {
                self.error("alignment out of range", args[0].token.span);
                None
            }
        }
    }
}

/// String token values keep their quotes; directive payloads want the bare
/// contents.
fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'`') && bytes[bytes.len() - 1] == bytes[0]
    {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}
