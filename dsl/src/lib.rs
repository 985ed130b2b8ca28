//! Provides definitions of the values, expressions and statements that
//! make up an EasyBuilder macro, and base implementations of common
//! patterns for working with statement trees.

pub mod common;
pub mod core;
pub mod diagnostic;
pub mod expression;
pub mod intrinsic;
pub mod resources;
pub mod statement;
pub mod visitor;
