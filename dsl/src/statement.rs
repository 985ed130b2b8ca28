//! Statements of a macro body.
//!
//! Every statement computes its resource set when it is built. Conditional
//! chains and switches are assembled with builders that reject malformed
//! sequences of calls.
use std::collections::HashSet;

use ebmacro_problems::Problem;
use log::trace;

use crate::common::Operand;
use crate::core::{check_identifier, TypeClass};
use crate::diagnostic::{Diagnostic, Label};
use crate::expression::check_value;
use crate::resources::ResourceSet;

static EMPTY: ResourceSet = ResourceSet::new();

/// A sequence of statements that run in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    stmts: Vec<Stmt>,
    resources: ResourceSet,
}

impl Block {
    pub fn new(stmts: impl IntoIterator<Item = Stmt>) -> Self {
        let stmts: Vec<Stmt> = stmts.into_iter().collect();
        let mut resources = ResourceSet::new();
        for stmt in &stmts {
            resources.extend_from(stmt.resources());
        }
        Self { stmts, resources }
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

/// One arm of a conditional chain. The final `else` arm has no condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub condition: Option<Operand>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfChain {
    branches: Vec<Branch>,
    resources: ResourceSet,
}

impl IfChain {
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }
}

/// One arm of a switch. The default arm has no label.
#[derive(Clone, Debug, PartialEq)]
pub struct Case {
    pub label: Option<i64>,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Switch {
    selector: Operand,
    cases: Vec<Case>,
    resources: ResourceSet,
}

impl Switch {
    pub fn selector(&self) -> &Operand {
        &self.selector
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
}

/// Invocation of an intrinsic whose result is not used.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    name: String,
    args: Vec<Operand>,
    resources: ResourceSet,
}

impl Call {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Operand] {
        &self.args
    }
}

/// Assignment of a value to a variable or array element.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluate {
    destination: Operand,
    value: Operand,
    resources: ResourceSet,
}

impl Evaluate {
    pub fn destination(&self) -> &Operand {
        &self.destination
    }

    pub fn value(&self) -> &Operand {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Block(Block),
    If(IfChain),
    Switch(Switch),
    Comment(Comment),
    Empty,
    Call(Call),
    Evaluate(Evaluate),
}

impl Stmt {
    pub fn block(stmts: impl IntoIterator<Item = Stmt>) -> Stmt {
        Stmt::Block(Block::new(stmts))
    }

    pub fn comment(text: impl Into<String>) -> Stmt {
        Stmt::Comment(Comment { text: text.into() })
    }

    pub fn empty() -> Stmt {
        Stmt::Empty
    }

    /// Creates a call to the named intrinsic. The arguments are passed
    /// through as given; checking them is the intrinsic's concern.
    pub fn call(name: impl Into<String>, args: Vec<Operand>) -> Result<Stmt, Diagnostic> {
        let name = name.into();
        check_identifier(&name)?;
        let mut resources = ResourceSet::new();
        for arg in &args {
            if let Operand::Literal(literal) = arg {
                literal.check()?;
            }
            resources.extend_from(&arg.resources());
        }
        Ok(Stmt::Call(Call {
            name,
            args,
            resources,
        }))
    }

    /// Creates `destination = value`.
    pub fn evaluate(
        destination: impl Into<Operand>,
        value: impl Into<Operand>,
    ) -> Result<Stmt, Diagnostic> {
        let destination = destination.into();
        let value = value.into();

        let dest_type = match &destination {
            Operand::Variable(var) if var.is_array() => {
                return Err(Diagnostic::problem(
                    Problem::ArrayAssignment,
                    Label::element(var.name(), "Assign to an element of the array instead"),
                ))
            }
            Operand::Variable(var) => var.data_type(),
            Operand::Element(elem) => elem.data_type(),
            Operand::Tag(tag) => {
                return Err(Diagnostic::problem(
                    Problem::TagOperand,
                    Label::element(tag.name(), "Write a variable to the tag instead"),
                ))
            }
            Operand::Literal(_) | Operand::Expr(_) => {
                return Err(Diagnostic::problem(
                    Problem::TypeMismatch,
                    Label::element(destination.describe(), "Destination must be a variable"),
                ))
            }
        };

        let value_type = check_value(&value, "assignment")?;
        if !dest_type.accepts(value_type.class()) {
            return Err(Diagnostic::problem(
                Problem::TypeMismatch,
                Label::element(destination.describe(), "Value cannot be stored in destination"),
            )
            .with_context("destination", dest_type)
            .with_context("value", value_type));
        }

        let resources = ResourceSet::union([&destination.resources(), &value.resources()]);
        Ok(Stmt::Evaluate(Evaluate {
            destination,
            value,
            resources,
        }))
    }

    pub fn resources(&self) -> &ResourceSet {
        match self {
            Stmt::Block(node) => &node.resources,
            Stmt::If(node) => &node.resources,
            Stmt::Switch(node) => &node.resources,
            Stmt::Comment(_) | Stmt::Empty => &EMPTY,
            Stmt::Call(node) => &node.resources,
            Stmt::Evaluate(node) => &node.resources,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChainState {
    /// A branch body was just given; the chain may continue or finish.
    Open,
    /// A condition (or `else`) was given and needs its body.
    AwaitingBranch,
    /// The `else` body was given; only `build` remains.
    Closed,
}

/// Builds an `if ... else if ... else ... end if` chain.
///
/// ```
/// use ebmacro_dsl::common::Variable;
/// use ebmacro_dsl::core::DataType;
/// use ebmacro_dsl::statement::IfBuilder;
///
/// let ready = Variable::new("ready", DataType::Bool).unwrap();
/// let count = Variable::new("count", DataType::Short).unwrap();
/// let stmt = IfBuilder::new(&ready).unwrap()
///     .then([count.set(1).unwrap()]).unwrap()
///     .otherwise().unwrap()
///     .then([count.set(0).unwrap()]).unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(stmt.resources().len(), 2);
/// ```
#[derive(Debug)]
pub struct IfBuilder {
    branches: Vec<Branch>,
    pending: Option<Operand>,
    state: ChainState,
}

impl IfBuilder {
    pub fn new(condition: impl Into<Operand>) -> Result<Self, Diagnostic> {
        let condition = check_condition(condition.into())?;
        Ok(Self {
            branches: vec![],
            pending: Some(condition),
            state: ChainState::AwaitingBranch,
        })
    }

    /// Supplies the body of the most recent condition or `else`.
    pub fn then(mut self, body: impl IntoIterator<Item = Stmt>) -> Result<Self, Diagnostic> {
        self.expect(ChainState::AwaitingBranch, "then")?;
        let condition = self.pending.take();
        self.state = if condition.is_some() {
            ChainState::Open
        } else {
            ChainState::Closed
        };
        self.branches.push(Branch {
            condition,
            body: Block::new(body),
        });
        Ok(self)
    }

    pub fn elif(mut self, condition: impl Into<Operand>) -> Result<Self, Diagnostic> {
        self.expect(ChainState::Open, "elif")?;
        self.pending = Some(check_condition(condition.into())?);
        self.state = ChainState::AwaitingBranch;
        Ok(self)
    }

    pub fn otherwise(mut self) -> Result<Self, Diagnostic> {
        self.expect(ChainState::Open, "otherwise")?;
        self.pending = None;
        self.state = ChainState::AwaitingBranch;
        Ok(self)
    }

    pub fn build(self) -> Result<Stmt, Diagnostic> {
        if self.state == ChainState::AwaitingBranch {
            return Err(invalid_chain("build", self.state));
        }
        let mut resources = ResourceSet::new();
        for branch in &self.branches {
            if let Some(condition) = &branch.condition {
                resources.extend_from(&condition.resources());
            }
            resources.extend_from(&branch.body.resources);
        }
        trace!("Built conditional chain with {} branches", self.branches.len());
        Ok(Stmt::If(IfChain {
            branches: self.branches,
            resources,
        }))
    }

    fn expect(&self, state: ChainState, operation: &str) -> Result<(), Diagnostic> {
        if self.state != state {
            return Err(invalid_chain(operation, self.state));
        }
        Ok(())
    }
}

fn invalid_chain(operation: &str, state: ChainState) -> Diagnostic {
    Diagnostic::problem(
        Problem::InvalidChain,
        Label::element("if", "Operation is not valid in the current chain state"),
    )
    .with_context("operation", operation)
    .with_context("state", format!("{:?}", state))
}

fn check_condition(condition: Operand) -> Result<Operand, Diagnostic> {
    let data_type = check_value(&condition, "condition")?;
    match data_type.class() {
        TypeClass::Boolean | TypeClass::Integer => Ok(condition),
        class => Err(Diagnostic::problem(
            Problem::TypeMismatch,
            Label::element(condition.describe(), "Condition must be boolean or integer"),
        )
        .with_context("type", class)),
    }
}

/// Builds a `select case ... end select` statement.
#[derive(Debug)]
pub struct SwitchBuilder {
    selector: Operand,
    cases: Vec<Case>,
    labels: HashSet<i64>,
    has_default: bool,
}

impl SwitchBuilder {
    pub fn new(selector: impl Into<Operand>) -> Result<Self, Diagnostic> {
        let selector = selector.into();
        let data_type = check_value(&selector, "select case")?;
        if data_type.class() != TypeClass::Integer {
            return Err(Diagnostic::problem(
                Problem::TypeMismatch,
                Label::element(selector.describe(), "Selector must be an integer"),
            )
            .with_context("type", data_type.class()));
        }
        Ok(Self {
            selector,
            cases: vec![],
            labels: HashSet::new(),
            has_default: false,
        })
    }

    pub fn case(
        mut self,
        label: i64,
        body: impl IntoIterator<Item = Stmt>,
    ) -> Result<Self, Diagnostic> {
        if !self.labels.insert(label) {
            return Err(Diagnostic::problem(
                Problem::DuplicateCase,
                Label::element(self.selector.describe(), "Case label repeated"),
            )
            .with_context("label", label));
        }
        self.cases.push(Case {
            label: Some(label),
            body: Block::new(body),
        });
        Ok(self)
    }

    pub fn default(mut self, body: impl IntoIterator<Item = Stmt>) -> Result<Self, Diagnostic> {
        if self.has_default {
            return Err(Diagnostic::problem(
                Problem::DuplicateCase,
                Label::element(self.selector.describe(), "Default case repeated"),
            )
            .with_context("label", "default"));
        }
        self.has_default = true;
        self.cases.push(Case {
            label: None,
            body: Block::new(body),
        });
        Ok(self)
    }

    pub fn build(self) -> Stmt {
        let mut resources = self.selector.resources();
        for case in &self.cases {
            resources.extend_from(&case.body.resources);
        }
        Stmt::Switch(Switch {
            selector: self.selector,
            cases: self.cases,
            resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Tag, Variable};
    use crate::core::{DataType, TagType};
    use crate::expression::{BinaryOp, Expr};

    fn flag() -> Variable {
        Variable::new("ready", DataType::Bool).unwrap()
    }

    fn count() -> Variable {
        Variable::new("count", DataType::Short).unwrap()
    }

    fn tag(name: &str, address: &str) -> Tag {
        Tag::new(name, "Local HMI", address, TagType::S16).unwrap()
    }

    #[test]
    fn if_builder_when_else_twice_then_invalid_chain() {
        let err = IfBuilder::new(flag())
            .unwrap()
            .then([Stmt::empty()])
            .unwrap()
            .otherwise()
            .unwrap()
            .then([Stmt::empty()])
            .unwrap()
            .otherwise()
            .unwrap_err();
        assert!(err.is(Problem::InvalidChain));
    }

    #[test]
    fn if_builder_when_elif_after_else_then_invalid_chain() {
        let err = IfBuilder::new(flag())
            .unwrap()
            .then(Vec::<Stmt>::new())
            .unwrap()
            .otherwise()
            .unwrap()
            .then(Vec::<Stmt>::new())
            .unwrap()
            .elif(flag())
            .unwrap_err();
        assert!(err.is(Problem::InvalidChain));
    }

    #[test]
    fn if_builder_when_build_without_body_then_invalid_chain() {
        let err = IfBuilder::new(flag()).unwrap().build().unwrap_err();
        assert!(err.is(Problem::InvalidChain));
    }

    #[test]
    fn if_builder_when_then_twice_then_invalid_chain() {
        let err = IfBuilder::new(flag())
            .unwrap()
            .then(Vec::<Stmt>::new())
            .unwrap()
            .then(Vec::<Stmt>::new())
            .unwrap_err();
        assert!(err.is(Problem::InvalidChain));
    }

    #[test]
    fn if_builder_when_float_condition_then_type_mismatch() {
        let level = Variable::new("level", DataType::Float).unwrap();
        let err = IfBuilder::new(level).unwrap_err();
        assert!(err.is(Problem::TypeMismatch));
    }

    #[test]
    fn if_builder_when_elif_chain_then_branches_in_order() {
        let c = count();
        let stmt = IfBuilder::new(Expr::binary(BinaryOp::Eq, &c, 0).unwrap())
            .unwrap()
            .then([c.set(1).unwrap()])
            .unwrap()
            .elif(Expr::binary(BinaryOp::Eq, &c, 1).unwrap())
            .unwrap()
            .then([c.set(2).unwrap()])
            .unwrap()
            .build()
            .unwrap();

        match stmt {
            Stmt::If(chain) => {
                assert_eq!(chain.branches().len(), 2);
                assert!(chain.branches().iter().all(|b| b.condition.is_some()));
            }
            _ => panic!("expected conditional chain"),
        }
    }

    #[test]
    fn switch_builder_when_duplicate_label_then_duplicate_case() {
        let err = SwitchBuilder::new(count())
            .unwrap()
            .case(1, Vec::<Stmt>::new())
            .unwrap()
            .case(1, Vec::<Stmt>::new())
            .unwrap_err();
        assert!(err.is(Problem::DuplicateCase));
    }

    #[test]
    fn switch_builder_when_second_default_then_duplicate_case() {
        let err = SwitchBuilder::new(count())
            .unwrap()
            .default(Vec::<Stmt>::new())
            .unwrap()
            .default(Vec::<Stmt>::new())
            .unwrap_err();
        assert!(err.is(Problem::DuplicateCase));
    }

    #[test]
    fn switch_builder_when_bool_selector_then_type_mismatch() {
        assert!(SwitchBuilder::new(flag())
            .unwrap_err()
            .is(Problem::TypeMismatch));
    }

    #[test]
    fn evaluate_when_float_into_bool_then_type_mismatch() {
        let err = Stmt::evaluate(flag(), 2.5).unwrap_err();
        assert!(err.is(Problem::TypeMismatch));
    }

    #[test]
    fn evaluate_when_whole_array_destination_then_array_assignment() {
        let buffer = Variable::array("buffer", DataType::Short, 2).unwrap();
        let err = Stmt::evaluate(&buffer, 1).unwrap_err();
        assert!(err.is(Problem::ArrayAssignment));
    }

    #[test]
    fn evaluate_when_tag_destination_then_tag_operand() {
        let err = Stmt::evaluate(tag("level", "LW, 1"), 1).unwrap_err();
        assert!(err.is(Problem::TagOperand));
    }

    #[test]
    fn block_resources_when_nested_then_unchanged() {
        let a = tag("a", "LW, 1");
        let b = tag("b", "LW, 2");
        let c = tag("c", "LW, 3");
        let leaves = vec![
            Stmt::call("ALARM", vec![Operand::from(&a)]).unwrap(),
            Stmt::call("ALARM", vec![Operand::from(&b)]).unwrap(),
            Stmt::call("ALARM", vec![Operand::from(&c)]).unwrap(),
        ];

        let block = Stmt::block(leaves);
        let nested = Stmt::block([block.clone()]);

        let expected: ResourceSet = [a, b, c]
            .iter()
            .map(|t| crate::resources::Resource::Tag(t.clone()))
            .collect();
        assert_eq!(block.resources(), &expected);
        assert_eq!(nested.resources(), &expected);
    }

    #[test]
    fn resources_when_comment_then_empty() {
        assert!(Stmt::comment("note").resources().is_empty());
        assert!(Stmt::empty().resources().is_empty());
    }
}
