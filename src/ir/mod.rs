//! The typed module model the middle-end and backend operate on.
//!
//! The IR is built once from the parse tree and mutated only by the type
//! resolver (reference substitution) and the scope builders (symbol table
//! attachment). Every tagged variant carries an explicit `kind`
//! discriminator on the wire.

pub mod build;
pub mod instr;
pub mod module;
pub mod sema;
pub mod stab;
pub mod types;
pub mod value;

pub use build::build;
pub use instr::{Alloca, Block, Defer, ElseIf, IfStatement, Instruction, Local, TypeAlias};
pub use module::{Function, Impl, Module, Structure, TypeDict};
pub use sema::{ScopeDict, ScopeMap, TypeMap};
pub use stab::{StabArena, Symbol, SymbolTable, SymbolValue};
pub use types::Type;
pub use value::Value;
