use std::collections::HashSet;

use once_cell::sync::Lazy;

use super::Parser;
use crate::ast::{
    FunctionDecl, FunctionPrototype, NamedParameter, NamedType, StatementKind, StatementNode,
    TypeKind, TypeNode,
};
use crate::error::CompilerError;
use crate::token::TokenKind;

/// Reserved words; none of them may open a type.
static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "fn", "let", "mut", "break", "next", "return", "trait", "struct", "impl", "if", "else",
        "while", "loop", "defer", "type",
    ]
    .into_iter()
    .collect()
});

impl Parser {
    /// Parses one top-level node: a declaration, or a skipped directive
    /// block. Returns `None` (after recording a diagnostic) when the
    /// current token opens nothing recognizable.
    pub(crate) fn parse_node(&mut self) -> Option<StatementNode> {
        if self.next_is("#") && self.peek_is(1, "{") {
            self.skip_directive_block();
            return None;
        }

        match self.next()?.value.as_str() {
            "struct" => self.parse_structure_declaration(),
            "trait" => self.parse_trait_declaration(),
            "impl" => self.parse_impl_declaration(),
            "fn" => self.parse_function_node(),
            "type" => self.parse_type_alias(),
            _ => {
                let tok = self.consume();
                self.error(CompilerError::unimplemented(&tok.value, vec![tok.span]));
                None
            }
        }
    }

    /// Directive blocks are handled by the directive micro-parser; the main
    /// parser only needs to step over them.
    fn skip_directive_block(&mut self) {
        self.expect("#");
        self.expect("{");
        let mut depth = 1usize;
        while self.has_next() && depth > 0 {
            let tok = self.consume();
            match tok.value.as_str() {
                "{" => depth += 1,
                "}" => depth -= 1,
                _ => {}
            }
        }
    }

    fn parse_structure_declaration(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        self.expect("struct");
        let name = self.expect_kind(TokenKind::Iden);

        let mut fields = Vec::new();
        self.expect("{");
        while self.has_next() {
            if self.next_is("}") {
                break;
            }

            let field_start = self.pos;
            let field_name = self.expect_kind(TokenKind::Iden);
            let type_node = match self.parse_type() {
                Some(t) => t,
                None => {
                    self.error(CompilerError::parse(
                        "type",
                        vec![self.span_since(field_start)],
                    ));
                    break;
                }
            };
            fields.push(NamedType {
                name: field_name,
                type_node,
            });

            // trailing commas are enforced.
            self.expect(",");
        }
        self.expect("}");

        Some(StatementNode::new(
            StatementKind::Structure { name, fields },
            self.span_since(start),
        ))
    }

    fn parse_trait_declaration(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        self.expect("trait");
        let name = self.expect_kind(TokenKind::Iden);

        let mut members = Vec::new();
        self.expect("{");
        while self.has_next() {
            if self.next_is("}") {
                break;
            }

            // prototypes only, no bodies inside traits.
            match self.parse_function_prototype() {
                Some(proto) => members.push(proto),
                None => break,
            }
            self.expect(";");
        }
        self.expect("}");

        Some(StatementNode::new(
            StatementKind::Trait { name, members },
            self.span_since(start),
        ))
    }

    fn parse_impl_declaration(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        self.expect("impl");
        let name = self.expect_kind(TokenKind::Iden);

        let mut functions = Vec::new();
        self.expect("{");
        while self.has_next() {
            if self.next_is("}") {
                break;
            }

            let fn_start = self.pos;
            match self.parse_function_decl_parts() {
                Some((proto, Some(body))) => functions.push(FunctionDecl { proto, body }),
                Some((_, None)) => {
                    self.error(CompilerError::parse(
                        "function body in impl",
                        vec![self.span_since(fn_start)],
                    ));
                }
                None => break,
            }
        }
        self.expect("}");

        Some(StatementNode::new(
            StatementKind::Impl { name, functions },
            self.span_since(start),
        ))
    }

    fn parse_function_node(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        let (proto, body) = self.parse_function_decl_parts()?;
        let span = self.span_since(start);
        Some(match body {
            Some(body) => StatementNode::new(StatementKind::Function { proto, body }, span),
            None => StatementNode::new(StatementKind::FunctionProto { proto }, span),
        })
    }

    /// `fn name(params) [ret]` followed by either a body or `;`.
    pub(crate) fn parse_function_decl_parts(
        &mut self,
    ) -> Option<(FunctionPrototype, Option<Vec<StatementNode>>)> {
        let proto = self.parse_function_prototype()?;

        if self.next_is(";") {
            self.expect(";");
            return Some((proto, None));
        }

        let start = self.pos;
        match self.parse_stat_block() {
            Some(body) => Some((proto, Some(body))),
            None => {
                self.error(CompilerError::parse(
                    "function body",
                    vec![self.span_since(start)],
                ));
                Some((proto, None))
            }
        }
    }

    pub(crate) fn parse_function_prototype(&mut self) -> Option<FunctionPrototype> {
        self.expect("fn");
        let name = self.expect_kind(TokenKind::Iden);
        let arguments = self.parse_parameter_list();
        let return_type = self.parse_optional_type();
        Some(FunctionPrototype {
            name,
            arguments,
            return_type,
        })
    }

    pub(crate) fn parse_parameter_list(&mut self) -> Vec<NamedParameter> {
        let mut args = Vec::new();

        self.expect("(");
        let mut idx = 0;
        while self.has_next() {
            if self.next_is(")") {
                break;
            }

            // no trailing commas allowed here.
            if idx != 0 {
                self.expect(",");
            }

            let owned = self.next_is("owned") && self.peek(1).map(|t| t.kind) == Some(TokenKind::Iden);
            if owned {
                self.consume();
            }

            let start = self.pos;
            let name = self.expect_kind(TokenKind::Iden);
            let type_node = match self.parse_type() {
                Some(t) => t,
                None => {
                    self.error(CompilerError::parse(
                        "type after parameter name",
                        vec![self.span_since(start)],
                    ));
                    break;
                }
            };

            args.push(NamedParameter {
                name,
                type_node,
                owned,
            });
            idx += 1;
        }
        self.expect(")");

        args
    }

    fn parse_type_alias(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        self.expect("type");
        let name = self.expect_kind(TokenKind::Iden);
        self.expect("=");

        let type_node = match self.parse_type() {
            Some(t) => t,
            None => {
                self.error(CompilerError::parse(
                    "type in type alias",
                    vec![self.span_since(start)],
                ));
                return None;
            }
        };
        self.expect(";");

        Some(StatementNode::new(
            StatementKind::TypeAlias { name, type_node },
            self.span_since(start),
        ))
    }

    /// Parses a type only when the next token can open one; used for
    /// optional return types.
    pub(crate) fn parse_optional_type(&mut self) -> Option<TypeNode> {
        let named = self.next_kind_is(TokenKind::Iden)
            && !self
                .next()
                .map(|t| KEYWORDS.contains(t.value.as_str()))
                .unwrap_or(false);
        if named || self.next_is_any(&["^", "[", "("]) {
            self.parse_type()
        } else {
            None
        }
    }

    pub(crate) fn parse_type(&mut self) -> Option<TypeNode> {
        let start = self.pos;
        let next = self.next()?;

        if next.matches("^") {
            self.expect("^");
            let base = match self.parse_type() {
                Some(t) => t,
                None => {
                    self.error(CompilerError::parse(
                        "type after pointer",
                        vec![self.span_since(start)],
                    ));
                    return None;
                }
            };
            return Some(TypeNode::new(
                TypeKind::Pointer {
                    base: Box::new(base),
                },
                self.span_since(start),
            ));
        }

        if next.matches("[") {
            self.expect("[");
            let base = match self.parse_type() {
                Some(t) => t,
                None => {
                    self.error(CompilerError::parse(
                        "array base type",
                        vec![self.span_since(start)],
                    ));
                    return None;
                }
            };
            self.expect(";");
            let size = match self.parse_expression() {
                Some(e) => e,
                None => {
                    self.error(CompilerError::parse(
                        "array length constant",
                        vec![self.span_since(start)],
                    ));
                    return None;
                }
            };
            self.expect("]");
            return Some(TypeNode::new(
                TypeKind::Array {
                    base: Box::new(base),
                    size: Box::new(size),
                },
                self.span_since(start),
            ));
        }

        if next.matches("(") {
            self.expect("(");
            let mut types = Vec::new();
            let mut idx = 0;
            while self.has_next() && !self.next_is(")") {
                if idx != 0 {
                    self.expect(",");
                }
                match self.parse_type() {
                    Some(t) => types.push(t),
                    None => {
                        self.error(CompilerError::parse(
                            "type in tuple",
                            vec![self.span_since(start)],
                        ));
                        break;
                    }
                }
                idx += 1;
            }
            self.expect(")");
            return Some(TypeNode::new(
                TypeKind::Tuple { types },
                self.span_since(start),
            ));
        }

        if next.kind == TokenKind::Iden {
            let name = self.consume();
            return Some(TypeNode::new(
                TypeKind::Unresolved { name: name.value },
                self.span_since(start),
            ));
        }

        None
    }
}
