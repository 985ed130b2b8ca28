//! Collects the variables a macro must declare.
//!
//! Every variable referenced anywhere in the statement tree is declared
//! once, ordered by name. Two references with the same name must agree on
//! type, initial value and length.

use std::collections::BTreeMap;

use ebmacro_dsl::common::{Literal, Variable};
use ebmacro_dsl::core::DataType;
use ebmacro_dsl::diagnostic::{Diagnostic, Label};
use ebmacro_dsl::statement::Stmt;
use ebmacro_dsl::visitor::Visitor;
use ebmacro_problems::Problem;

/// Returns the declarations for the variables in the statements.
pub fn collect(stmts: &[Stmt]) -> Result<Vec<Variable>, Diagnostic> {
    let mut collector = DeclarationCollector {
        variables: BTreeMap::new(),
    };
    collector.walk(stmts)?;
    Ok(collector.variables.into_values().collect())
}

/// Returns the declaration line for the variable, such as `short count = 0`.
pub fn declaration(variable: &Variable) -> String {
    let mut text = format!("{} {}", variable.data_type().keyword(), variable.name());
    if let Some(length) = variable.length() {
        text.push_str(&format!("[{}]", length));
    }
    if let Some(initial) = variable.initial() {
        text.push_str(" = ");
        text.push_str(&initial_text(variable.data_type(), initial));
    }
    text
}

/// Writes the initial value in the form of the declared type so that a
/// boolean declared with an integer reads as `true` or `false`.
fn initial_text(data_type: DataType, initial: &Literal) -> String {
    match (data_type, initial) {
        (DataType::Bool, Literal::Int(v)) => Literal::Bool(*v != 0).to_string(),
        _ => initial.to_string(),
    }
}

struct DeclarationCollector {
    variables: BTreeMap<String, Variable>,
}

impl Visitor<Diagnostic> for DeclarationCollector {
    type Value = ();

    fn visit_variable(&mut self, node: &Variable) -> Result<(), Diagnostic> {
        match self.variables.get(node.name()) {
            Some(existing) if !existing.same_declaration(node) => Err(Diagnostic::problem(
                Problem::ConflictingDeclaration,
                Label::element(node.name(), "Variable declared differently elsewhere"),
            )
            .with_context("first", declaration(existing))
            .with_context("second", declaration(node))),
            Some(_) => Ok(()),
            None => {
                self.variables
                    .insert(node.name().to_string(), node.clone());
                Ok(())
            }
        }
    }
}
