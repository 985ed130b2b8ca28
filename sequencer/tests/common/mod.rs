//! Helpers shared by the sequencer integration tests.

use ebmacro_codegen::Macro;
use ebmacro_dsl::common::Tag;
use ebmacro_dsl::core::TagType;
use ebmacro_dsl::intrinsic;
use ebmacro_dsl::statement::Stmt;
use ebmacro_vm::Vm;

pub fn local(name: &str, address: &str, tag_type: TagType) -> Tag {
    Tag::new(name, "Local HMI", address, tag_type).unwrap()
}

/// One step per index that records the index in the trace log.
pub fn traced_steps(k: usize) -> Vec<Stmt> {
    (0..k)
        .map(|i| intrinsic::trace(&format!("step {}", i), vec![]).unwrap())
        .collect()
}

pub fn load(m: &Macro) -> Vm {
    let mut vm = Vm::new();
    vm.load(m).unwrap();
    vm
}
