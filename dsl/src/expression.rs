//! Operator and call expressions.
//!
//! Expressions are checked when they are constructed: the operand classes
//! must be compatible with the operator, otherwise the constructor returns
//! a `TypeMismatch` diagnostic. Once built, an expression never changes and
//! knows its result type and the resources it touches.
use core::fmt;

use ebmacro_problems::Problem;

use crate::common::Operand;
use crate::core::{check_identifier, DataType, TypeClass};
use crate::diagnostic::{Diagnostic, Label};
use crate::resources::ResourceSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// The operator as it appears in macro text.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "mod",
            BinaryOp::BitAnd => "bitand",
            BinaryOp::BitOr => "bitor",
            BinaryOp::BitXor => "bitxor",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }

    /// Returns the result type if the operator accepts the operand types.
    fn result_type(&self, left: DataType, right: DataType) -> Option<DataType> {
        let (lc, rc) = (left.class(), right.class());
        match self {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                (lc.is_numeric() && rc.is_numeric()).then(|| left.promote(right))
            }
            BinaryOp::Mod
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr => (lc == TypeClass::Integer && rc == TypeClass::Integer)
                .then(|| left.promote(right)),
            BinaryOp::Eq | BinaryOp::Ne => {
                let numeric = lc.is_numeric() && rc.is_numeric();
                let boolean = lc == TypeClass::Boolean && rc == TypeClass::Boolean;
                (numeric || boolean).then_some(DataType::Bool)
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                (lc.is_numeric() && rc.is_numeric()).then_some(DataType::Bool)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                (lc == TypeClass::Boolean && rc == TypeClass::Boolean).then_some(DataType::Bool)
            }
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "bitnot",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpr {
    op: BinaryOp,
    left: Operand,
    right: Operand,
    data_type: DataType,
    resources: ResourceSet,
}

impl BinaryExpr {
    pub fn op(&self) -> BinaryOp {
        self.op
    }

    pub fn left(&self) -> &Operand {
        &self.left
    }

    pub fn right(&self) -> &Operand {
        &self.right
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnaryExpr {
    op: UnaryOp,
    term: Operand,
    data_type: DataType,
    resources: ResourceSet,
}

impl UnaryExpr {
    pub fn op(&self) -> UnaryOp {
        self.op
    }

    pub fn term(&self) -> &Operand {
        &self.term
    }
}

/// A call to an intrinsic that produces a value.
#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    name: String,
    args: Vec<Operand>,
    data_type: DataType,
    resources: ResourceSet,
}

impl CallExpr {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Operand] {
        &self.args
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Call(CallExpr),
}

impl Expr {
    /// Creates `left op right`.
    pub fn binary(
        op: BinaryOp,
        left: impl Into<Operand>,
        right: impl Into<Operand>,
    ) -> Result<Expr, Diagnostic> {
        let left = left.into();
        let right = right.into();
        let lt = check_value(&left, op.symbol())?;
        let rt = check_value(&right, op.symbol())?;

        let data_type = op.result_type(lt, rt).ok_or_else(|| {
            Diagnostic::problem(
                Problem::TypeMismatch,
                Label::element(left.describe(), "Operand types are not valid for the operator"),
            )
            .with_context("operator", op)
            .with_context("left", lt.class())
            .with_context("right", rt.class())
        })?;

        let resources = ResourceSet::union([&left.resources(), &right.resources()]);
        Ok(Expr::Binary(BinaryExpr {
            op,
            left,
            right,
            data_type,
            resources,
        }))
    }

    /// Creates `op term`.
    pub fn unary(op: UnaryOp, term: impl Into<Operand>) -> Result<Expr, Diagnostic> {
        let term = term.into();
        let dt = check_value(&term, op.symbol())?;
        let valid = match op {
            UnaryOp::Not => dt.class() == TypeClass::Boolean,
            UnaryOp::Neg => dt.class().is_numeric(),
            UnaryOp::BitNot => dt.class() == TypeClass::Integer,
        };
        if !valid {
            return Err(Diagnostic::problem(
                Problem::TypeMismatch,
                Label::element(term.describe(), "Operand type is not valid for the operator"),
            )
            .with_context("operator", op)
            .with_context("operand", dt.class()));
        }
        let data_type = if op == UnaryOp::Not { DataType::Bool } else { dt };
        let resources = term.resources();
        Ok(Expr::Unary(UnaryExpr {
            op,
            term,
            data_type,
            resources,
        }))
    }

    /// Creates a call to the named intrinsic that returns a value of the
    /// given type. Argument types are the intrinsic's concern.
    pub fn call(
        name: impl Into<String>,
        args: Vec<Operand>,
        returns: DataType,
    ) -> Result<Expr, Diagnostic> {
        let name = name.into();
        check_identifier(&name)?;
        let mut resources = ResourceSet::new();
        for arg in &args {
            if let Operand::Literal(literal) = arg {
                literal.check()?;
            }
            resources.extend_from(&arg.resources());
        }
        Ok(Expr::Call(CallExpr {
            name,
            args,
            data_type: returns,
            resources,
        }))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Expr::Binary(e) => e.data_type,
            Expr::Unary(e) => e.data_type,
            Expr::Call(e) => e.data_type,
        }
    }

    pub fn resources(&self) -> &ResourceSet {
        match self {
            Expr::Binary(e) => &e.resources,
            Expr::Unary(e) => &e.resources,
            Expr::Call(e) => &e.resources,
        }
    }
}

/// Checks that the operand can be used as a scalar value and returns its
/// element type.
///
/// Tags must be read into a variable before they take part in a
/// computation. Strings and whole arrays are never values.
pub(crate) fn check_value(operand: &Operand, context: &str) -> Result<DataType, Diagnostic> {
    match operand {
        Operand::Literal(literal) => {
            literal.check()?;
            operand.data_type().ok_or_else(|| {
                Diagnostic::problem(
                    Problem::TypeMismatch,
                    Label::element(operand.describe(), "Text used where a value is required"),
                )
                .with_context("in", context)
            })
        }
        Operand::Tag(tag) => Err(Diagnostic::problem(
            Problem::TagOperand,
            Label::element(tag.name(), "Read the tag into a variable first"),
        )
        .with_context("in", context)),
        Operand::Variable(var) if var.is_array() => Err(Diagnostic::problem(
            Problem::TypeMismatch,
            Label::element(var.name(), "Array used where a single value is required"),
        )
        .with_context("in", context)),
        _ => operand.data_type().ok_or_else(|| {
            Diagnostic::problem(
                Problem::TypeMismatch,
                Label::element(operand.describe(), "Text used where a value is required"),
            )
            .with_context("in", context)
        }),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::common::{Tag, Variable};
    use crate::core::TagType;

    fn var(name: &str, data_type: DataType) -> Variable {
        Variable::new(name, data_type).unwrap()
    }

    #[test]
    fn binary_when_bool_compared_with_float_then_type_mismatch() {
        let flag = var("running", DataType::Bool);
        let err = Expr::binary(BinaryOp::Eq, &flag, 1.5).unwrap_err();
        assert!(err.is(Problem::TypeMismatch));
    }

    #[test]
    fn binary_when_tag_operand_then_tag_operand() {
        let tag = Tag::new("level", "Local HMI", "LW, 100", TagType::S16).unwrap();
        let err = Expr::binary(BinaryOp::Add, &tag, 1).unwrap_err();
        assert!(err.is(Problem::TagOperand));
    }

    #[rstest]
    #[case(BinaryOp::Add, DataType::Short, DataType::Int, DataType::Int)]
    #[case(BinaryOp::Mul, DataType::Short, DataType::Float, DataType::Float)]
    #[case(BinaryOp::Div, DataType::Double, DataType::Int, DataType::Double)]
    #[case(BinaryOp::Mod, DataType::UnsignedShort, DataType::Short, DataType::UnsignedShort)]
    #[case(BinaryOp::Lt, DataType::Short, DataType::Float, DataType::Bool)]
    #[case(BinaryOp::And, DataType::Bool, DataType::Bool, DataType::Bool)]
    #[case(BinaryOp::Eq, DataType::Bool, DataType::Bool, DataType::Bool)]
    fn binary_when_compatible_then_result_type(
        #[case] op: BinaryOp,
        #[case] left: DataType,
        #[case] right: DataType,
        #[case] expected: DataType,
    ) {
        let expr = Expr::binary(op, var("a", left), var("b", right)).unwrap();
        assert_eq!(expr.data_type(), expected);
    }

    #[rstest]
    #[case(BinaryOp::Mod, DataType::Float, DataType::Int)]
    #[case(BinaryOp::BitAnd, DataType::Bool, DataType::Bool)]
    #[case(BinaryOp::And, DataType::Int, DataType::Bool)]
    #[case(BinaryOp::Lt, DataType::Bool, DataType::Bool)]
    #[case(BinaryOp::Add, DataType::Bool, DataType::Int)]
    fn binary_when_incompatible_then_type_mismatch(
        #[case] op: BinaryOp,
        #[case] left: DataType,
        #[case] right: DataType,
    ) {
        let err = Expr::binary(op, var("a", left), var("b", right)).unwrap_err();
        assert!(err.is(Problem::TypeMismatch));
    }

    #[test]
    fn unary_when_not_on_integer_then_type_mismatch() {
        let err = Expr::unary(UnaryOp::Not, var("count", DataType::Int)).unwrap_err();
        assert!(err.is(Problem::TypeMismatch));
    }

    #[test]
    fn binary_when_nested_then_resources_include_both_sides() {
        let a = var("a", DataType::Short);
        let b = var("b", DataType::Short);
        let c = var("c", DataType::Short);
        let sum = Expr::binary(BinaryOp::Add, &a, &b).unwrap();
        let expr = Expr::binary(BinaryOp::Gt, sum, &c).unwrap();

        assert_eq!(expr.resources().variables().count(), 3);
        assert!(expr.resources().contains_variable(&c));
    }

    #[test]
    fn binary_when_whole_array_then_type_mismatch() {
        let buffer = Variable::array("buffer", DataType::Short, 4).unwrap();
        let err = Expr::binary(BinaryOp::Add, &buffer, 1).unwrap_err();
        assert!(err.is(Problem::TypeMismatch));
    }
}
