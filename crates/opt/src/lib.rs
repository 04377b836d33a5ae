#![forbid(unsafe_code)]
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::match_bool)]
#![warn(clippy::must_use_candidate, clippy::clone_on_copy)]

//! Local common subexpression elimination for [`texel_ir`] programs.
//!
//! A function is split into basic blocks, every block gets value numbered on its own,
//! and repeated computations are replaced with a temporary holding the first result.

pub mod cfg;
mod config;
mod error;
mod hoist;
mod local_cse;
pub mod pass_manager;
mod rewrite;
pub mod value_numbering;


pub use cfg::ControlFlowGraph;
pub use config::{Config, NodeKinds};
pub use error::{Error, Unsupported};
pub use hoist::run as hoist_subexpressions;
pub use local_cse::run as local_cse;
pub use pass_manager::PassManager;
pub use rewrite::rewrite_block;
