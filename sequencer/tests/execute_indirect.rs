//! Runs indirect tag dispatch in the interpreter.

mod common;

use common::{load, local};
use ebmacro_codegen::Macro;
use ebmacro_dsl::common::{Tag, Variable};
use ebmacro_dsl::core::{DataType, TagType};
use ebmacro_sequencer::IndirectTag;
use ebmacro_vm::Value;
use rstest::rstest;

fn targets() -> Vec<Tag> {
    (0..3)
        .map(|i| local(&format!("level_{}", i), &format!("LW, {}", 10 + i), TagType::S16))
        .collect()
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
fn invoke_when_selected_then_only_selected_target_written(#[case] selected: usize) {
    let actual = targets();
    let buffer = Variable::new("level_value", DataType::Short)
        .unwrap()
        .with_initial(42)
        .unwrap();
    let indirect =
        IndirectTag::new(&local("level", "LW, 0", TagType::S16), &buffer, actual.clone()).unwrap();
    let m = Macro::build(
        "dispatch",
        "",
        [
            indirect.select(selected).unwrap(),
            indirect.write_to_actual().unwrap(),
        ],
    )
    .unwrap();
    let mut vm = load(&m);

    vm.invoke("dispatch").unwrap();

    for (i, tag) in actual.iter().enumerate() {
        let expected = if i == selected { 42 } else { 0 };
        assert_eq!(vm.memory().get(tag), Value::Int(expected));
    }
}

#[test]
fn invoke_when_read_from_actual_then_indirect_receives_selected_value() {
    let actual = targets();
    let logical = local("level", "LW, 0", TagType::S16);
    let buffer = Variable::new("level_value", DataType::Short).unwrap();
    let indirect = IndirectTag::new(&logical, &buffer, actual.clone()).unwrap();
    let m = Macro::build(
        "dispatch",
        "",
        [
            indirect.select(2).unwrap(),
            indirect.read_from_actual().unwrap(),
            indirect.write_to_indirect().unwrap(),
        ],
    )
    .unwrap();
    let mut vm = load(&m);
    vm.memory_mut().set(&actual[2], 7);

    vm.invoke("dispatch").unwrap();

    assert_eq!(vm.memory().get(&logical), Value::Int(7));
}
