use serde::{Deserialize, Serialize};

use super::types::Type;
use super::value::Value;
use crate::token::Token;

/// A named binding with a type, mutability, ownership and an optional
/// initializer. Also used for function parameters and structure fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Local {
    pub name: Token,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_node: Option<Type>,
    pub mutable: bool,
    pub owned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<Value>,
}

impl Local {
    pub fn new(name: Token, type_node: Option<Type>, owned: bool) -> Self {
        Local {
            name,
            type_node,
            mutable: false,
            owned,
            val: None,
        }
    }
}

/// A heap-allocated named binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alloca {
    pub name: Token,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_node: Option<Type>,
    pub mutable: bool,
    pub owned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<Value>,
}

/// A statement or block scheduled to run when its owning block exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat: Option<Box<Instruction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElseIf {
    pub cond: Value,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub cond: Value,
    #[serde(rename = "trueBlock")]
    pub true_block: Block,
    #[serde(rename = "elseIf", default, skip_serializing_if = "Vec::is_empty")]
    pub else_ifs: Vec<ElseIf>,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_block: Option<Block>,
}

/// `type` iden `=` type `;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAlias {
    pub name: Token,
    #[serde(rename = "type")]
    pub type_node: Type,
}

/// A lexical block. Owns its instruction list, the deferred-cleanup stack
/// (unwound in reverse before the return slot runs), a module-unique id,
/// and - once scope building has run - the id of its symbol table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: u64,
    #[serde(rename = "deferStack", default, skip_serializing_if = "Vec::is_empty")]
    pub defer_stack: Vec<Defer>,
    #[serde(default)]
    pub instr: Vec<Instruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stab: Option<usize>,
    #[serde(rename = "return", default, skip_serializing_if = "Option::is_none")]
    pub return_instr: Option<Box<Instruction>>,
}

impl Block {
    pub fn new(id: u64) -> Self {
        Block {
            id,
            defer_stack: Vec::new(),
            instr: Vec::new(),
            stab: None,
            return_instr: None,
        }
    }

    pub fn add_instr(&mut self, instr: Instruction) {
        self.instr.push(instr);
    }

    pub fn push_defer(&mut self, def: Defer) {
        self.defer_stack.push(def);
    }

    pub fn set_return(&mut self, ret: Instruction) {
        if self.return_instr.is_none() {
            self.return_instr = Some(Box::new(ret));
        } else {
            // a second return in one block is dead code, keep it visible.
            self.instr.push(ret);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Instruction {
    #[serde(rename = "blockInstr")]
    Block(Block),

    #[serde(rename = "assignInstr")]
    Assign {
        lhand: Value,
        op: String,
        rhand: Value,
    },

    #[serde(rename = "localInstr")]
    Local(Local),

    #[serde(rename = "allocaInstr")]
    Alloca(Alloca),

    #[serde(rename = "nextInstr")]
    Next,

    #[serde(rename = "breakInstr")]
    Break,

    #[serde(rename = "returnInstr")]
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        val: Option<Value>,
    },

    #[serde(rename = "loopInstr")]
    Loop { body: Block },

    #[serde(rename = "whileLoopInstr")]
    WhileLoop {
        cond: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        post: Option<Value>,
        body: Block,
    },

    #[serde(rename = "ifStatementInstr")]
    If(IfStatement),

    #[serde(rename = "exprInstr")]
    Expression { value: Value },

    #[serde(rename = "deferInstr")]
    Defer(Defer),

    #[serde(rename = "labelInstr")]
    Label { name: Token },

    #[serde(rename = "jumpInstr")]
    Jump { location: Token },

    #[serde(rename = "typeAliasInstr")]
    TypeAlias(TypeAlias),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_return_slot_takes_first_return() {
        let mut block = Block::new(0);
        block.set_return(Instruction::Return { val: None });
        block.set_return(Instruction::Return {
            val: Some(Value::Integer { value: "1".into() }),
        });
        assert!(block.return_instr.is_some());
        assert_eq!(block.instr.len(), 1);
    }

    #[test]
    fn defer_stack_preserves_push_order() {
        let mut block = Block::new(3);
        for _ in 0..3 {
            block.push_defer(Defer {
                stat: Some(Box::new(Instruction::Break)),
                block: None,
            });
        }
        assert_eq!(block.defer_stack.len(), 3);
    }

    #[test]
    fn instruction_wire_discriminators() {
        let json = serde_json::to_value(Instruction::Next).unwrap();
        assert_eq!(json["kind"], "nextInstr");

        let json = serde_json::to_value(Instruction::Block(Block::new(7))).unwrap();
        assert_eq!(json["kind"], "blockInstr");
        assert_eq!(json["id"], 7);
    }
}
