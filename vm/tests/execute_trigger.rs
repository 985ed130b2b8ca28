//! Integration tests for macro triggers and the virtual clock.

mod common;

use ebmacro_codegen::Macro;
use ebmacro_dsl::intrinsic;
use ebmacro_dsl::statement::Stmt;
use ebmacro_vm::error::{Trap, VmError};
use ebmacro_vm::Vm;

fn ping_pong() -> Macro {
    let mut ping = Macro::build(
        "ping",
        "",
        [intrinsic::async_trig_macro("pong").unwrap()],
    )
    .unwrap();
    let pong = Macro::build(
        "pong",
        "",
        [
            intrinsic::delay(100).unwrap(),
            intrinsic::async_trig_macro("ping").unwrap(),
        ],
    )
    .unwrap();
    ping.spawn(pong).unwrap();
    ping
}

#[test]
fn run_pending_when_endless_retrigger_then_budget_exhausted() {
    let mut vm = Vm::new().with_budget(10);
    vm.load(&ping_pong()).unwrap();
    vm.invoke("ping").unwrap();

    let err = vm.run_pending().unwrap_err();

    assert!(matches!(err, VmError::Trap(Trap::TriggerBudgetExhausted(10))));
    assert_eq!(vm.clock_ms(), 500);
}

#[test]
fn invoke_when_sync_trigger_then_runs_inline() {
    let callee = Macro::build("callee", "", [intrinsic::trace("callee", vec![]).unwrap()]).unwrap();
    let mut caller = Macro::build(
        "caller",
        "",
        [
            intrinsic::sync_trig_macro("callee").unwrap(),
            intrinsic::trace("caller", vec![]).unwrap(),
        ],
    )
    .unwrap();
    caller.spawn(callee).unwrap();

    let mut vm = Vm::new();
    vm.load(&caller).unwrap();
    vm.invoke("caller").unwrap();

    assert_eq!(vm.trace(), &[String::from("callee"), String::from("caller")]);
    assert_eq!(vm.pending_len(), 0);
}

#[test]
fn load_when_open_macro_then_invalid_state() {
    let mut m = Macro::new("open", "").unwrap();
    m.begin().unwrap();
    m.write([Stmt::empty()]).unwrap();

    let err = Vm::new().load(&m).unwrap_err();

    assert!(matches!(err, VmError::InvalidState(_)));
}

#[test]
fn invoke_when_unknown_macro_then_trap() {
    let err = Vm::new().invoke("missing").unwrap_err();
    assert!(matches!(err, VmError::Trap(Trap::UnknownMacro(_))));
}
