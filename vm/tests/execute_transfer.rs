//! Integration tests for device transfers and arithmetic.

mod common;

use common::{load, local};
use ebmacro_dsl::common::Variable;
use ebmacro_dsl::core::{DataType, TagType};
use ebmacro_dsl::expression::{BinaryOp, Expr};
use ebmacro_dsl::intrinsic;
use ebmacro_vm::error::{Trap, VmError};
use ebmacro_vm::Value;

#[test]
fn execute_when_array_read_then_consecutive_cells() {
    let source = local("source", "LW, 100", TagType::S16);
    let target = local("target", "LW, 200", TagType::S16);
    let buffer = Variable::array("buffer", DataType::Short, 3).unwrap();

    let mut vm = load(vec![
        source.read_count(&buffer, 3).unwrap(),
        target.write_count(&buffer, 3).unwrap(),
    ]);
    for k in 0..3 {
        vm.memory_mut()
            .write(&source, k, Value::Int(k as i64 + 1));
    }
    vm.invoke("main_macro").unwrap();

    for k in 0..3 {
        assert_eq!(vm.memory().read(&target, k), Value::Int(k as i64 + 1));
    }
}

#[test]
fn execute_when_short_overflows_then_wraps() {
    let out = local("out", "LW, 0", TagType::S16);
    let x = Variable::new("x", DataType::Short)
        .unwrap()
        .with_initial(32767)
        .unwrap();
    let sum = Expr::binary(BinaryOp::Add, &x, 1).unwrap();

    let mut vm = load(vec![x.set(sum).unwrap(), out.write(&x).unwrap()]);
    vm.invoke("main_macro").unwrap();

    assert_eq!(vm.memory().get(&out), Value::Int(-32768));
}

#[test]
fn execute_when_divide_by_zero_then_trap() {
    let x = Variable::new("x", DataType::Short).unwrap();
    let quotient = Expr::binary(BinaryOp::Div, 10, &x).unwrap();

    let mut vm = load(vec![x.set(quotient).unwrap()]);
    let err = vm.invoke("main_macro").unwrap_err();

    assert!(matches!(err, VmError::Trap(Trap::DivideByZero)));
}

#[test]
fn execute_when_trace_then_message_recorded() {
    let x = Variable::new("x", DataType::Short)
        .unwrap()
        .with_initial(4)
        .unwrap();

    let mut vm = load(vec![intrinsic::info("x=%d", vec![(&x).into()]).unwrap()]);
    vm.invoke("main_macro").unwrap();

    assert_eq!(vm.trace(), &[String::from("INFO: x=4")]);
}
