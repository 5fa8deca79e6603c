//! The semantic middle-end: scope construction, type declaration and
//! resolution, symbol resolution, and the mutability / ownership / unused
//! function analyses.
//!
//! Every pass consumes the IR (plus whichever scope index it needs) and
//! produces diagnostics; none of them aborts the pipeline.

pub mod borrow_check;
pub mod decl_type;
pub mod mut_check;
pub mod scope;
pub mod sym_resolve;
pub mod type_resolve;
pub mod unused_func;

pub use borrow_check::borrow_check;
pub use decl_type::decl_type;
pub use mut_check::mut_check;
pub use scope::{build_scope, build_scope_dict};
pub use sym_resolve::sym_resolve;
pub use type_resolve::type_resolve;
pub use unused_func::unused_func;
