//! Shared test helpers for interpreter integration tests.

use ebmacro_codegen::Macro;
use ebmacro_dsl::common::Tag;
use ebmacro_dsl::core::TagType;
use ebmacro_dsl::statement::Stmt;
use ebmacro_vm::Vm;

/// Creates a tag on the local HMI.
pub fn local(name: &str, address: &str, tag_type: TagType) -> Tag {
    Tag::new(name, "Local HMI", address, tag_type).unwrap()
}

/// Builds a closed macro named `main_macro` and loads it.
pub fn load(stmts: Vec<Stmt>) -> Vm {
    let m = Macro::build("main_macro", "", stmts).unwrap();
    let mut vm = Vm::new();
    vm.load(&m).unwrap();
    vm
}
