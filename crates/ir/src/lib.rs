#![forbid(unsafe_code)]
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::match_bool)]
#![warn(clippy::must_use_candidate, clippy::clone_on_copy)]

//! A tree-structured shader IR.
//!
//! Statements and expressions are nodes in an arena owned by a [`Program`], referenced by [`NodeId`].
//! Expressions form trees hanging off statements, and statements form lists: the root list,
//! and the bodies of `if`s and loops.

mod builder;
mod display;
mod id;
pub mod instruction;
pub mod interp;
mod program;
pub mod ty;
pub mod verify;

#[cfg(test)]
mod tests;

pub use display::{ListDisplay, NodeDisplay};
pub use id::{IdAllocator, NodeId, SignatureId, VarId};
pub use instruction::{Instruction, NodeKind};
pub use program::{ListRef, Program, VarMode, Variable};
pub use ty::{Constant, Scalar, Type};
