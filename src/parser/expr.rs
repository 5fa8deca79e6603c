use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::Parser;
use crate::ast::{
    ExpressionKind, ExpressionNode, FunctionPrototype, InitializerForm, StatementNode,
};
use crate::error::CompilerError;
use crate::token::{Token, TokenKind};

/// The whole precedence table lives here; everything else asks it.
static OP_PREC: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    [
        ("*", 5),
        ("/", 5),
        ("%", 5),
        ("+", 4),
        ("-", 4),
        ("==", 3),
        ("!=", 3),
        ("<", 3),
        ("<=", 3),
        (">", 3),
        (">=", 3),
        ("&&", 2),
        ("||", 1),
    ]
    .into_iter()
    .collect()
});

const ASSIGN_OPS: &[&str] = &["=", "+=", "-=", "*=", "/="];
const UNARY_OPS: &[&str] = &["!", "@", "+", "-"];

fn op_prec(op: &str) -> i32 {
    OP_PREC.get(op).copied().unwrap_or(-1)
}

fn is_binary_op(op: &str) -> bool {
    OP_PREC.contains_key(op)
}

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> Option<ExpressionNode> {
        let left = self.parse_left()?;

        if self.next_is(".") {
            return self.parse_dot_list(left);
        }

        if self.next_is_any(ASSIGN_OPS) {
            return self.parse_assign(left);
        }

        if self.next().map(|t| is_binary_op(&t.value)).unwrap_or(false) {
            return self.parse_prec(0, left);
        }

        Some(left)
    }

    fn parse_left(&mut self) -> Option<ExpressionNode> {
        self.parse_primary_expr()
    }

    fn parse_primary_expr(&mut self) -> Option<ExpressionNode> {
        if !self.has_next() {
            return None;
        }

        if self.next_is_any(UNARY_OPS) {
            return self.parse_unary_expr();
        }

        // any identifier followed by a bare `!` opens a builtin.
        if self.next_kind_is(TokenKind::Iden) && self.peek_is(1, "!") {
            return self.parse_builtin();
        }

        let mut left = self.parse_operand()?;

        loop {
            if self.next_is("[") {
                left = self.parse_index(left)?;
            } else if self.next_is("(") {
                left = self.parse_call(left)?;
            } else {
                break;
            }
        }

        Some(left)
    }

    fn parse_unary_expr(&mut self) -> Option<ExpressionNode> {
        let start = self.pos;
        let op = self.consume();

        let right = match self.parse_left() {
            Some(r) => r,
            None => {
                self.error(CompilerError::parse(
                    "unary expression",
                    vec![self.span_since(start)],
                ));
                return None;
            }
        };

        Some(ExpressionNode::new(
            ExpressionKind::Unary {
                op: op.value,
                value: Box::new(right),
            },
            self.span_since(start),
        ))
    }

    fn parse_operand(&mut self) -> Option<ExpressionNode> {
        let start = self.pos;
        let next = self.next()?;

        if next.matches("(") {
            self.expect("(");
            let expr = self.parse_expression();
            self.expect(")");
            let value = Box::new(expr?);
            return Some(ExpressionNode::new(
                ExpressionKind::Grouping { value },
                self.span_since(start),
            ));
        }

        if next.matches("{") {
            return self.parse_initializer();
        }

        if next.matches("fn") {
            return self.parse_lambda();
        }

        let curr = self.consume();
        match curr.kind {
            TokenKind::Num => {
                // no dot means it's a whole number.
                if !curr.value.contains('.') {
                    Some(ExpressionNode::new(
                        ExpressionKind::IntegerConst { value: curr.value },
                        self.span_since(start),
                    ))
                } else {
                    let value = curr.value.parse::<f64>().unwrap_or(0.0);
                    Some(ExpressionNode::new(
                        ExpressionKind::FloatingConst { value },
                        self.span_since(start),
                    ))
                }
            }
            TokenKind::Iden => Some(ExpressionNode::new(
                ExpressionKind::Variable { name: curr },
                self.span_since(start),
            )),
            TokenKind::Str => Some(ExpressionNode::new(
                ExpressionKind::StringConst { value: curr.value },
                self.span_since(start),
            )),
            TokenKind::Char => Some(ExpressionNode::new(
                ExpressionKind::CharConst { value: curr.value },
                self.span_since(start),
            )),
            TokenKind::Eof => None,
            _ => {
                self.error(CompilerError::unimplemented(&curr.value, vec![curr.span]));
                None
            }
        }
    }

    /// `name!<T>`, `name!<T>(args)`, `name!(args)` or the bare `name!T`.
    fn parse_builtin(&mut self) -> Option<ExpressionNode> {
        let start = self.pos;
        let name = self.expect_kind(TokenKind::Iden);
        self.expect("!");

        let mut type_node = None;
        let mut args = Vec::new();

        if self.next_is("<") {
            self.expect("<");
            type_node = self.parse_type();
            if type_node.is_none() {
                self.error(CompilerError::parse(
                    "type in builtin",
                    vec![self.span_since(start)],
                ));
            }
            self.expect(">");
            if self.next_is("(") {
                args = self.parse_call_args();
            }
        } else if self.next_is("(") {
            args = self.parse_call_args();
        } else {
            type_node = self.parse_type();
            if type_node.is_none() {
                self.error(CompilerError::parse(
                    "type in builtin",
                    vec![self.span_since(start)],
                ));
            }
        }

        Some(ExpressionNode::new(
            ExpressionKind::Builtin {
                name: name.value,
                type_node,
                args,
            },
            self.span_since(start),
        ))
    }

    fn parse_call_args(&mut self) -> Vec<ExpressionNode> {
        let start = self.pos;
        let mut params = Vec::new();

        self.expect("(");
        let mut idx = 0;
        while self.has_next() && !self.next_is(")") {
            if idx != 0 {
                self.expect(",");
            }

            match self.parse_expression() {
                Some(val) => params.push(val),
                None => {
                    self.error(CompilerError::parse(
                        "parameter in call expression",
                        vec![self.span_since(start)],
                    ));
                    break;
                }
            }
            idx += 1;
        }
        self.expect(")");

        params
    }

    fn parse_call(&mut self, left: ExpressionNode) -> Option<ExpressionNode> {
        let span_start = left.span;
        let params = self.parse_call_args();
        let span = span_start.merge(self.span_since(self.pos.saturating_sub(1)));
        Some(ExpressionNode::new(
            ExpressionKind::Call {
                left: Box::new(left),
                params,
            },
            span,
        ))
    }

    fn parse_index(&mut self, left: ExpressionNode) -> Option<ExpressionNode> {
        let start = self.pos;
        self.expect("[");
        let value = match self.parse_expression() {
            Some(v) => v,
            None => {
                self.error(CompilerError::parse(
                    "expression in array index",
                    vec![self.span_since(start)],
                ));
                return None;
            }
        };
        self.expect("]");

        let span = left.span.merge(self.span_since(start));
        Some(ExpressionNode::new(
            ExpressionKind::Index {
                left: Box::new(left),
                value: Box::new(value),
            },
            span,
        ))
    }

    /// `{ e1, e2, ... }` - the initializer form is refined from the
    /// declared type at IR lowering.
    fn parse_initializer(&mut self) -> Option<ExpressionNode> {
        let start = self.pos;
        self.expect("{");

        let mut values = Vec::new();
        let mut idx = 0;
        while self.has_next() && !self.next_is("}") {
            if idx != 0 {
                self.expect(",");
            }
            match self.parse_expression() {
                Some(v) => values.push(v),
                None => {
                    self.error(CompilerError::parse(
                        "expression in initializer",
                        vec![self.span_since(start)],
                    ));
                    break;
                }
            }
            idx += 1;
        }
        self.expect("}");

        Some(ExpressionNode::new(
            ExpressionKind::Initializer {
                form: InitializerForm::Array,
                lhand: None,
                values,
            },
            self.span_since(start),
        ))
    }

    /// `fn (params) [ret] { ... }` in expression position.
    fn parse_lambda(&mut self) -> Option<ExpressionNode> {
        let start = self.pos;
        let fn_tok = self.expect("fn");

        let arguments = self.parse_parameter_list();
        let return_type = self.parse_optional_type();
        let body = match self.parse_stat_block() {
            Some(b) => b,
            None => {
                self.error(CompilerError::parse(
                    "lambda body",
                    vec![self.span_since(start)],
                ));
                return None;
            }
        };

        let proto = FunctionPrototype {
            name: Token::new("", TokenKind::Iden, fn_tok.span),
            arguments,
            return_type,
        };

        Some(ExpressionNode::new(
            ExpressionKind::Lambda { proto, body },
            self.span_since(start),
        ))
    }

    fn parse_assign(&mut self, left: ExpressionNode) -> Option<ExpressionNode> {
        let start = self.pos;
        let op = self.consume();

        let right = match self.parse_expression() {
            Some(r) => r,
            None => {
                self.error(CompilerError::parse(
                    "expression after assignment operator",
                    vec![self.span_since(start)],
                ));
                return None;
            }
        };

        let span = left.span.merge(right.span);
        Some(ExpressionNode::new(
            ExpressionKind::Assign {
                lhand: Box::new(left),
                op: op.value,
                rhand: Box::new(right),
            },
            span,
        ))
    }

    /// Flattens a dot chain into a single path node, splicing nested
    /// paths. Stops at the first non-dot token.
    fn parse_path_chain(&mut self, left: ExpressionNode) -> ExpressionNode {
        let start_span = left.span;
        let mut values = vec![left];

        while self.has_next() && self.next_is(".") {
            self.expect(".");
            let val = match self.parse_left() {
                Some(v) => v,
                None => {
                    let span = self.span_since(self.pos.saturating_sub(1));
                    self.error(CompilerError::parse("expression in dot-list", vec![span]));
                    break;
                }
            };

            // nested paths are spliced into one flat list.
            if let ExpressionKind::Path {
                values: mut nested, ..
            } = val.kind
            {
                values.append(&mut nested);
            } else {
                values.push(val);
            }
        }

        let span = values
            .last()
            .map(|v| start_span.merge(v.span))
            .unwrap_or(start_span);
        ExpressionNode::new(ExpressionKind::Path { values }, span)
    }

    /// A dot chain in expression-root position; a trailing binary or
    /// assignment operator re-roots the expression so evaluation order
    /// matches C precedence.
    fn parse_dot_list(&mut self, left: ExpressionNode) -> Option<ExpressionNode> {
        let path = self.parse_path_chain(left);

        if self.next_is_any(ASSIGN_OPS) {
            return self.parse_assign(path);
        }
        if self.next().map(|t| is_binary_op(&t.value)).unwrap_or(false) {
            return self.parse_prec(0, path);
        }
        Some(path)
    }

    /// Standard precedence climbing: greedily consume infix operators with
    /// at least the current precedence, right-associating when the next
    /// operator binds tighter.
    fn parse_prec(&mut self, last_prec: i32, mut left: ExpressionNode) -> Option<ExpressionNode> {
        while self.has_next() {
            let next_val = self.next()?.value.clone();
            let prec = op_prec(&next_val);
            if prec < last_prec || !is_binary_op(&next_val) {
                return Some(left);
            }

            let op = self.consume();
            let mut right = self.parse_primary_expr()?;

            // an operand may itself be a dot chain; only the chain, the
            // operators after it belong to this climb.
            if self.next_is(".") {
                right = self.parse_path_chain(right);
            }

            if !self.has_next() {
                let span = left.span.merge(right.span);
                return Some(ExpressionNode::new(
                    ExpressionKind::Binary {
                        lhand: Box::new(left),
                        op: op.value,
                        rhand: Box::new(right),
                    },
                    span,
                ));
            }

            let next_prec = op_prec(&self.next()?.value);
            if prec < next_prec {
                right = self.parse_prec(prec + 1, right)?;
            }

            let span = left.span.merge(right.span);
            left = ExpressionNode::new(
                ExpressionKind::Binary {
                    lhand: Box::new(left),
                    op: op.value,
                    rhand: Box::new(right),
                },
                span,
            );
        }

        Some(left)
    }
}
