use super::Parser;
use crate::ast::{ElseIf, ExpressionKind, ExpressionNode, StatementKind, StatementNode};
use crate::error::CompilerError;
use crate::token::TokenKind;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Option<StatementNode> {
        let next = self.next()?;

        match next.value.as_str() {
            "if" => return self.parse_if_chain(),
            "loop" => return self.parse_loop(),
            "while" => return self.parse_while_loop(),
            "defer" => return self.parse_defer(),
            "{" => {
                let start = self.pos;
                let statements = self.parse_stat_block()?;
                return Some(StatementNode::new(
                    StatementKind::Block { statements },
                    self.span_since(start),
                ));
            }
            _ => {}
        }

        // `name:` declares a label inline.
        if self.next_kind_is(TokenKind::Iden) && self.peek_is(1, ":") {
            let start = self.pos;
            let name = self.consume();
            self.expect(":");
            return Some(StatementNode::new(
                StatementKind::Label { name },
                self.span_since(start),
            ));
        }

        let stat = self.parse_semicolon_statement();
        if stat.is_some() {
            self.expect(";");
        }
        stat
    }

    fn parse_semicolon_statement(&mut self) -> Option<StatementNode> {
        let next = self.next()?;
        match next.value.as_str() {
            "mut" => self.parse_mut(),
            "let" => self.parse_let(),
            "return" => self.parse_return(),
            "next" => {
                let start = self.pos;
                self.expect("next");
                Some(StatementNode::new(
                    StatementKind::Next,
                    self.span_since(start),
                ))
            }
            "break" => {
                let start = self.pos;
                self.expect("break");
                Some(StatementNode::new(
                    StatementKind::Break,
                    self.span_since(start),
                ))
            }
            "jump" => {
                let start = self.pos;
                self.expect("jump");
                let location = self.expect_kind(TokenKind::Iden);
                Some(StatementNode::new(
                    StatementKind::Jump { location },
                    self.span_since(start),
                ))
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// `let [owned] name [type] [= value];` - at least one of type and
    /// value must be present.
    fn parse_let(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        self.expect("let");
        let (name, type_node, value, owned) = self.parse_binding(start)?;
        Some(StatementNode::new(
            StatementKind::Let {
                name,
                type_node,
                value,
                owned,
            },
            self.span_since(start),
        ))
    }

    /// `mut [owned] name [type] [= value];`
    fn parse_mut(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        self.expect("mut");
        let (name, type_node, value, owned) = self.parse_binding(start)?;
        Some(StatementNode::new(
            StatementKind::Mut {
                name,
                type_node,
                value,
                owned,
            },
            self.span_since(start),
        ))
    }

    #[allow(clippy::type_complexity)]
    fn parse_binding(
        &mut self,
        start: usize,
    ) -> Option<(
        crate::token::Token,
        Option<crate::ast::TypeNode>,
        Option<ExpressionNode>,
        bool,
    )> {
        let owned = self.next_is("owned") && self.peek(1).map(|t| t.kind) == Some(TokenKind::Iden);
        if owned {
            self.consume();
        }

        let name = self.expect_kind(TokenKind::Iden);

        let mut type_node = None;
        if !self.next_is("=") && !self.next_is(";") {
            type_node = self.parse_type();
            if type_node.is_none() {
                self.error(CompilerError::parse(
                    "type or assignment",
                    vec![self.span_since(start)],
                ));
            }
        }

        let mut value = None;
        if self.next_is("=") {
            self.expect("=");
            value = self.parse_expression();
            if value.is_none() {
                self.error(CompilerError::parse(
                    "expression in binding",
                    vec![self.span_since(start)],
                ));
            }
        }

        if type_node.is_none() && value.is_none() {
            self.error(CompilerError::parse(
                "value or type in binding",
                vec![self.span_since(start)],
            ));
        }

        Some((name, type_node, value, owned))
    }

    fn parse_return(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        self.expect("return");

        let mut value = None;
        if !self.next_is(";") {
            value = self.parse_expression();
            if value.is_none() {
                self.error(CompilerError::parse(
                    "semi-colon or expression",
                    vec![self.span_since(start)],
                ));
            }
        }

        Some(StatementNode::new(
            StatementKind::Return { value },
            self.span_since(start),
        ))
    }

    /// `defer { ... }` or `defer <simple statement>;`
    fn parse_defer(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        self.expect("defer");

        if self.next_is("{") {
            let block = self.parse_stat_block()?;
            return Some(StatementNode::new(
                StatementKind::Defer {
                    stat: None,
                    block: Some(block),
                },
                self.span_since(start),
            ));
        }

        let stat = self.parse_semicolon_statement();
        if stat.is_none() {
            self.error(CompilerError::parse(
                "statement or block after defer",
                vec![self.span_since(start)],
            ));
            return None;
        }
        self.expect(";");

        Some(StatementNode::new(
            StatementKind::Defer {
                stat: stat.map(Box::new),
                block: None,
            },
            self.span_since(start),
        ))
    }

    pub(crate) fn parse_stat_block(&mut self) -> Option<Vec<StatementNode>> {
        if !self.next_is("{") {
            return None;
        }

        let mut stats = Vec::new();
        self.expect("{");
        while self.has_next() {
            if self.next_is("}") {
                break;
            }

            let before = self.pos;
            if let Some(stat) = self.parse_statement() {
                stats.push(stat);
            }
            if self.pos == before {
                self.consume();
            }
        }
        self.expect("}");
        Some(stats)
    }

    fn parse_if_chain(&mut self) -> Option<StatementNode> {
        let start = self.pos;

        self.expect("if");
        let cond = self.require_expression("condition", start)?;

        let block = match self.parse_stat_block() {
            Some(b) => b,
            None => {
                self.error(CompilerError::parse(
                    "block after condition",
                    vec![self.span_since(start)],
                ));
                Vec::new()
            }
        };

        let mut else_ifs = Vec::new();
        let mut else_block = None;

        while self.has_next() && self.next_is("else") {
            if self.peek_is(1, "if") {
                self.expect("else");
                self.expect("if");
                let cond = self.require_expression("condition in else if", start)?;
                let body = match self.parse_stat_block() {
                    Some(b) => b,
                    None => {
                        self.error(CompilerError::parse(
                            "block after else if",
                            vec![self.span_since(start)],
                        ));
                        Vec::new()
                    }
                };
                else_ifs.push(ElseIf { cond, block: body });
            } else {
                self.expect("else");
                else_block = self.parse_stat_block();
                if else_block.is_none() {
                    self.error(CompilerError::parse(
                        "block after else",
                        vec![self.span_since(start)],
                    ));
                }
                break;
            }
        }

        Some(StatementNode::new(
            StatementKind::If {
                cond,
                block,
                else_ifs,
                else_block,
            },
            self.span_since(start),
        ))
    }

    /// `while cond [; post] { ... }`
    fn parse_while_loop(&mut self) -> Option<StatementNode> {
        let start = self.pos;

        self.expect("while");
        let cond = self.require_expression("condition after while", start)?;

        let mut post = None;
        if self.next_is(";") {
            self.expect(";");
            post = self.parse_expression();
            if post.is_none() {
                self.error(CompilerError::parse(
                    "step expression in while loop",
                    vec![self.span_since(start)],
                ));
            }
        }

        let block = self.parse_stat_block()?;
        Some(StatementNode::new(
            StatementKind::While { cond, post, block },
            self.span_since(start),
        ))
    }

    fn parse_loop(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        self.expect("loop");
        let block = self.parse_stat_block()?;
        Some(StatementNode::new(
            StatementKind::Loop { block },
            self.span_since(start),
        ))
    }

    fn parse_expression_statement(&mut self) -> Option<StatementNode> {
        let start = self.pos;
        let value = self.parse_expression()?;
        Some(StatementNode::new(
            StatementKind::Expression { value },
            self.span_since(start),
        ))
    }

    /// Parses an expression that must be present; on failure records the
    /// diagnostic and substitutes a sentinel so the statement survives.
    fn require_expression(&mut self, what: &str, start: usize) -> Option<ExpressionNode> {
        match self.parse_expression() {
            Some(expr) => Some(expr),
            None => {
                let span = self.span_since(start);
                self.error(CompilerError::parse(what, vec![span]));
                Some(ExpressionNode::new(
                    ExpressionKind::Variable {
                        name: self.bad_token(),
                    },
                    span,
                ))
            }
        }
    }
}
