//! A set of traits and functions for visiting all nodes in a statement tree.
//!
//! To use the visitor, define a struct and implement the Visitor trait
//! for the struct.
//!
//! Visitor trait functions call functions that implement walking through
//! the tree. Selectively call this functions to selectively descend
//! into the tree.
//!
//! # Example
//!
//! ```
//! use ebmacro_dsl::common::Variable;
//! use ebmacro_dsl::diagnostic::Diagnostic;
//! use ebmacro_dsl::visitor::{visit_variable, Visitor};
//!
//! struct CountVariables {
//!     count: usize,
//! }
//!
//! impl Visitor<Diagnostic> for CountVariables {
//!     type Value = ();
//!
//!     fn visit_variable(&mut self, node: &Variable) -> Result<Self::Value, Diagnostic> {
//!         self.count += 1;
//!         visit_variable(self, node)
//!     }
//! }
//! ```

use paste::paste;

use crate::common::*;
use crate::diagnostic::Diagnostic;
use crate::expression::*;
use crate::statement::*;

/// Defines a function for the `Visitor` trait that dispatches visiting
/// to a free function of the same name, so that implementations can
/// re-use the default recursion.
macro_rules! dispatch {
    ($struct_name:ident) => {
        paste! {
            fn [<visit_ $struct_name:snake >](&mut self, node: &$struct_name) -> Result<Self::Value, E> {
                [< visit_ $struct_name:snake >](self, node)
            }
        }
    };
}

/// Defines a function for the `Visitor` trait that returns `Ok`.
macro_rules! leaf {
    ($struct_name:ident) => {
        paste! {
            fn [<visit_ $struct_name:snake >](&mut self, _node: &$struct_name) -> Result<Self::Value, E> {
                Ok(Self::Value::default())
            }
        }
    };
}

/// Defines a visitor for the statement tree. The default visitor
/// recursively walks to visit items in the tree.
///
/// Functions in the visitor are named based snake-case variant of the
/// element name. For example, the `IfChain` element's visitor function is
/// `visit_if_chain`.
pub trait Visitor<E: std::convert::From<Diagnostic>> {
    /// Value produced by this visitor when the result is not an error.
    type Value: Default;

    fn walk(&mut self, stmts: &[Stmt]) -> Result<Self::Value, E> {
        for stmt in stmts {
            self.visit_stmt(stmt)?;
        }
        Ok(Self::Value::default())
    }

    dispatch!(Stmt);
    dispatch!(Block);
    dispatch!(IfChain);
    dispatch!(Branch);
    dispatch!(Switch);
    dispatch!(Case);
    leaf!(Comment);

    fn visit_empty(&mut self) -> Result<Self::Value, E> {
        Ok(Self::Value::default())
    }

    dispatch!(Call);
    dispatch!(Evaluate);

    dispatch!(Operand);
    dispatch!(Expr);
    dispatch!(BinaryExpr);
    dispatch!(UnaryExpr);
    dispatch!(CallExpr);

    dispatch!(Variable);
    dispatch!(Element);
    leaf!(Tag);
    leaf!(Literal);
}

pub fn visit_stmt<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Stmt,
) -> Result<V::Value, E> {
    match node {
        Stmt::Block(node) => v.visit_block(node),
        Stmt::If(node) => v.visit_if_chain(node),
        Stmt::Switch(node) => v.visit_switch(node),
        Stmt::Comment(node) => v.visit_comment(node),
        Stmt::Empty => v.visit_empty(),
        Stmt::Call(node) => v.visit_call(node),
        Stmt::Evaluate(node) => v.visit_evaluate(node),
    }
}

pub fn visit_block<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Block,
) -> Result<V::Value, E> {
    for stmt in node.stmts() {
        v.visit_stmt(stmt)?;
    }
    Ok(V::Value::default())
}

pub fn visit_if_chain<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &IfChain,
) -> Result<V::Value, E> {
    for branch in node.branches() {
        v.visit_branch(branch)?;
    }
    Ok(V::Value::default())
}

pub fn visit_branch<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Branch,
) -> Result<V::Value, E> {
    if let Some(condition) = &node.condition {
        v.visit_operand(condition)?;
    }
    v.visit_block(&node.body)
}

pub fn visit_switch<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Switch,
) -> Result<V::Value, E> {
    v.visit_operand(node.selector())?;
    for case in node.cases() {
        v.visit_case(case)?;
    }
    Ok(V::Value::default())
}

pub fn visit_case<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Case,
) -> Result<V::Value, E> {
    v.visit_block(&node.body)
}

pub fn visit_call<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Call,
) -> Result<V::Value, E> {
    for arg in node.args() {
        v.visit_operand(arg)?;
    }
    Ok(V::Value::default())
}

pub fn visit_evaluate<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Evaluate,
) -> Result<V::Value, E> {
    v.visit_operand(node.destination())?;
    v.visit_operand(node.value())
}

pub fn visit_operand<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Operand,
) -> Result<V::Value, E> {
    match node {
        Operand::Literal(node) => v.visit_literal(node),
        Operand::Variable(node) => v.visit_variable(node),
        Operand::Element(node) => v.visit_element(node),
        Operand::Tag(node) => v.visit_tag(node),
        Operand::Expr(node) => v.visit_expr(node),
    }
}

pub fn visit_expr<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Expr,
) -> Result<V::Value, E> {
    match node {
        Expr::Binary(node) => v.visit_binary_expr(node),
        Expr::Unary(node) => v.visit_unary_expr(node),
        Expr::Call(node) => v.visit_call_expr(node),
    }
}

pub fn visit_binary_expr<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &BinaryExpr,
) -> Result<V::Value, E> {
    v.visit_operand(node.left())?;
    v.visit_operand(node.right())
}

pub fn visit_unary_expr<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &UnaryExpr,
) -> Result<V::Value, E> {
    v.visit_operand(node.term())
}

pub fn visit_call_expr<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &CallExpr,
) -> Result<V::Value, E> {
    for arg in node.args() {
        v.visit_operand(arg)?;
    }
    Ok(V::Value::default())
}

pub fn visit_variable<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    _v: &mut V,
    _node: &Variable,
) -> Result<V::Value, E> {
    Ok(V::Value::default())
}

pub fn visit_element<V: Visitor<E> + ?Sized, E: From<Diagnostic>>(
    v: &mut V,
    node: &Element,
) -> Result<V::Value, E> {
    v.visit_variable(node.array())?;
    v.visit_operand(node.index())
}
