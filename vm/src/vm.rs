use std::collections::HashMap;

use ebmacro_codegen::{Macro, MacroState};
use ebmacro_dsl::common::{Literal, Operand, Tag, Variable};
use ebmacro_dsl::core::{DataType, TypeClass};
use ebmacro_dsl::expression::{BinaryExpr, BinaryOp, Expr, UnaryExpr, UnaryOp};
use ebmacro_dsl::intrinsic;
use ebmacro_dsl::statement::{Call, Stmt};
use log::{debug, trace};

use crate::error::{Trap, VmError};
use crate::memory::DeviceMemory;
use crate::value::Value;
use crate::variable_table::VariableTable;

/// Default number of invocations `run_pending` performs before it traps.
pub const DEFAULT_TRIGGER_BUDGET: usize = 10_000;

/// Nested `SYNC_TRIG_MACRO` calls allowed before trapping.
const MAX_SYNC_DEPTH: usize = 32;

struct LoadedMacro {
    stmts: Vec<Stmt>,
    declarations: Vec<Variable>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Pending {
    due_ms: u64,
    seq: u64,
    name: String,
}

/// Executes closed macros against simulated device memory.
///
/// Time is virtual: `DELAY` advances the clock and asynchronous triggers
/// are queued at the time they are issued. Nothing runs until the caller
/// invokes a macro or drains the queue with [`run_pending`](Vm::run_pending).
pub struct Vm {
    macros: HashMap<String, LoadedMacro>,
    memory: DeviceMemory,
    pending: Vec<Pending>,
    seq: u64,
    clock_ms: u64,
    trace: Vec<String>,
    invocations: Vec<String>,
    budget: usize,
    depth: usize,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_memory(DeviceMemory::new())
    }

    pub fn with_memory(memory: DeviceMemory) -> Self {
        Vm {
            macros: HashMap::new(),
            memory,
            pending: vec![],
            seq: 0,
            clock_ms: 0,
            trace: vec![],
            invocations: vec![],
            budget: DEFAULT_TRIGGER_BUDGET,
            depth: 0,
        }
    }

    /// Sets the number of queued invocations `run_pending` may perform.
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    /// Loads the macro and every companion it spawned.
    pub fn load(&mut self, m: &Macro) -> Result<(), VmError> {
        if m.state() != MacroState::Closed {
            return Err(VmError::InvalidState("only closed macros can be loaded"));
        }
        let loaded = LoadedMacro {
            stmts: m.stmts().to_vec(),
            declarations: m.declarations()?,
        };
        debug!("Loaded macro {}", m.name());
        self.macros.insert(m.name().to_string(), loaded);
        for companion in m.companions() {
            self.load(companion)?;
        }
        Ok(())
    }

    /// Runs the named macro once, from top to bottom.
    pub fn invoke(&mut self, name: &str) -> Result<(), VmError> {
        self.run(name).map_err(VmError::from)
    }

    /// Runs queued asynchronous invocations in time order until the queue
    /// is empty. Returns the number of invocations performed.
    pub fn run_pending(&mut self) -> Result<usize, VmError> {
        let mut count = 0;
        while let Some(next) = self.pop_pending() {
            if count >= self.budget {
                return Err(Trap::TriggerBudgetExhausted(self.budget).into());
            }
            self.clock_ms = self.clock_ms.max(next.due_ms);
            self.run(&next.name)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn memory(&self) -> &DeviceMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut DeviceMemory {
        &mut self.memory
    }

    /// Messages written by `TRACE`, oldest first.
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Names of the macros invoked so far, in order.
    pub fn invocations(&self) -> &[String] {
        &self.invocations
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn pop_pending(&mut self) -> Option<Pending> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| (p.due_ms, p.seq))
            .map(|(i, _)| i)?;
        Some(self.pending.remove(index))
    }

    fn run(&mut self, name: &str) -> Result<(), Trap> {
        let (stmts, mut locals) = {
            let loaded = self
                .macros
                .get(name)
                .ok_or_else(|| Trap::UnknownMacro(name.to_string()))?;
            (loaded.stmts.clone(), VariableTable::new(&loaded.declarations)?)
        };
        debug!("Invoking macro {} at {} ms", name, self.clock_ms);
        self.invocations.push(name.to_string());
        for stmt in &stmts {
            self.exec(&mut locals, stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, locals: &mut VariableTable, stmt: &Stmt) -> Result<(), Trap> {
        match stmt {
            Stmt::Block(block) => {
                for stmt in block.stmts() {
                    self.exec(locals, stmt)?;
                }
                Ok(())
            }
            Stmt::If(chain) => {
                for branch in chain.branches() {
                    let taken = match &branch.condition {
                        Some(condition) => self.eval(locals, condition)?.as_bool(),
                        None => true,
                    };
                    if taken {
                        for stmt in branch.body.stmts() {
                            self.exec(locals, stmt)?;
                        }
                        break;
                    }
                }
                Ok(())
            }
            Stmt::Switch(switch) => {
                let selector = self.eval(locals, switch.selector())?.as_i64();
                let case = switch
                    .cases()
                    .iter()
                    .find(|c| c.label == Some(selector))
                    .or_else(|| switch.cases().iter().find(|c| c.label.is_none()));
                if let Some(case) = case {
                    for stmt in case.body.stmts() {
                        self.exec(locals, stmt)?;
                    }
                }
                Ok(())
            }
            Stmt::Comment(_) | Stmt::Empty => Ok(()),
            Stmt::Call(call) => self.call(locals, call),
            Stmt::Evaluate(evaluate) => {
                let value = self.eval(locals, evaluate.value())?;
                self.store(locals, evaluate.destination(), 0, value)
            }
        }
    }

    fn call(&mut self, locals: &mut VariableTable, call: &Call) -> Result<(), Trap> {
        trace!("Intrinsic {}", call.name());
        let args = call.args();
        match call.name() {
            intrinsic::GET_DATA | intrinsic::GET_DATA_EX => {
                let (buffer, tag, count) = transfer_args(args)?;
                let count = self.eval(locals, count)?.as_i64();
                for k in 0..count.max(0) {
                    let value = self.memory.read(tag, k as u64);
                    self.store(locals, buffer, k, value)?;
                }
                Ok(())
            }
            intrinsic::SET_DATA | intrinsic::SET_DATA_EX => {
                let (buffer, tag, count) = transfer_args(args)?;
                let count = self.eval(locals, count)?.as_i64();
                for k in 0..count.max(0) {
                    let value = self.load_value(locals, buffer, k)?;
                    self.memory.write(tag, k as u64, value);
                }
                Ok(())
            }
            intrinsic::GET_ERROR => {
                let destination = args
                    .first()
                    .ok_or(Trap::InvalidArgument("GetError needs a destination"))?;
                // Simulated transfers never fail.
                self.store(locals, destination, 0, Value::Int(0))
            }
            intrinsic::DELAY => {
                let ms = args
                    .first()
                    .ok_or(Trap::InvalidArgument("DELAY needs a duration"))?;
                let ms = self.eval(locals, ms)?.as_i64();
                self.clock_ms += ms.max(0) as u64;
                Ok(())
            }
            intrinsic::ASYNC_TRIG_MACRO => {
                let name = macro_name(args)?;
                if !self.macros.contains_key(name) {
                    return Err(Trap::UnknownMacro(name.to_string()));
                }
                self.seq += 1;
                self.pending.push(Pending {
                    due_ms: self.clock_ms,
                    seq: self.seq,
                    name: name.to_string(),
                });
                Ok(())
            }
            intrinsic::SYNC_TRIG_MACRO => {
                let name = macro_name(args)?.to_string();
                if self.depth >= MAX_SYNC_DEPTH {
                    return Err(Trap::TriggerBudgetExhausted(MAX_SYNC_DEPTH));
                }
                self.depth += 1;
                let result = self.run(&name);
                self.depth -= 1;
                result
            }
            intrinsic::TRACE => {
                let (format, rest) = match args.split_first() {
                    Some((Operand::Literal(Literal::Str(format)), rest)) => (format, rest),
                    _ => return Err(Trap::InvalidArgument("TRACE needs a format string")),
                };
                let mut values = vec![];
                for arg in rest {
                    values.push(self.eval(locals, arg)?);
                }
                self.trace.push(format_trace(format, &values));
                Ok(())
            }
            other => Err(Trap::UnsupportedIntrinsic(other.to_string())),
        }
    }

    fn eval(&self, locals: &VariableTable, operand: &Operand) -> Result<Value, Trap> {
        match operand {
            Operand::Literal(literal) => Value::from_literal(literal),
            Operand::Variable(var) => locals.load(var.name()),
            Operand::Element(elem) => {
                let index = self.eval(locals, elem.index())?.as_i64();
                locals.load_element(elem.array().name(), index)
            }
            Operand::Tag(_) => Err(Trap::InvalidArgument("tag used as a value")),
            Operand::Expr(expr) => match expr.as_ref() {
                Expr::Binary(node) => self.eval_binary(locals, node, expr.data_type()),
                Expr::Unary(node) => self.eval_unary(locals, node, expr.data_type()),
                Expr::Call(node) => Err(Trap::UnsupportedIntrinsic(node.name().to_string())),
            },
        }
    }

    fn eval_binary(
        &self,
        locals: &VariableTable,
        node: &BinaryExpr,
        data_type: DataType,
    ) -> Result<Value, Trap> {
        let l = self.eval(locals, node.left())?;
        let r = self.eval(locals, node.right())?;
        let float = data_type.class() == TypeClass::Float;

        let value = match node.op() {
            BinaryOp::Add if float => Value::Float(l.as_f64() + r.as_f64()),
            BinaryOp::Sub if float => Value::Float(l.as_f64() - r.as_f64()),
            BinaryOp::Mul if float => Value::Float(l.as_f64() * r.as_f64()),
            BinaryOp::Div if float => Value::Float(l.as_f64() / r.as_f64()),
            BinaryOp::Add => Value::Int(l.as_i64().wrapping_add(r.as_i64())),
            BinaryOp::Sub => Value::Int(l.as_i64().wrapping_sub(r.as_i64())),
            BinaryOp::Mul => Value::Int(l.as_i64().wrapping_mul(r.as_i64())),
            BinaryOp::Div => Value::Int(divide(l.as_i64(), r.as_i64(), i64::checked_div)?),
            BinaryOp::Mod => Value::Int(divide(l.as_i64(), r.as_i64(), i64::checked_rem)?),
            BinaryOp::BitAnd => Value::Int(l.as_i64() & r.as_i64()),
            BinaryOp::BitOr => Value::Int(l.as_i64() | r.as_i64()),
            BinaryOp::BitXor => Value::Int(l.as_i64() ^ r.as_i64()),
            BinaryOp::Shl => Value::Int(l.as_i64().wrapping_shl(r.as_i64() as u32)),
            BinaryOp::Shr => Value::Int(l.as_i64().wrapping_shr(r.as_i64() as u32)),
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                Value::Bool(compare(node.op(), l, r))
            }
            BinaryOp::And => Value::Bool(l.as_bool() && r.as_bool()),
            BinaryOp::Or => Value::Bool(l.as_bool() || r.as_bool()),
            BinaryOp::Xor => Value::Bool(l.as_bool() ^ r.as_bool()),
        };
        Ok(value.coerce(data_type))
    }

    fn eval_unary(
        &self,
        locals: &VariableTable,
        node: &UnaryExpr,
        data_type: DataType,
    ) -> Result<Value, Trap> {
        let term = self.eval(locals, node.term())?;
        let value = match node.op() {
            UnaryOp::Not => Value::Bool(!term.as_bool()),
            UnaryOp::Neg if term.is_float() => Value::Float(-term.as_f64()),
            UnaryOp::Neg => Value::Int(term.as_i64().wrapping_neg()),
            UnaryOp::BitNot => Value::Int(!term.as_i64()),
        };
        Ok(value.coerce(data_type))
    }

    /// Stores into a variable, or into the element `offset` positions after
    /// an element reference.
    fn store(
        &mut self,
        locals: &mut VariableTable,
        destination: &Operand,
        offset: i64,
        value: Value,
    ) -> Result<(), Trap> {
        match destination {
            Operand::Variable(var) if offset == 0 => locals.store(var.name(), value),
            Operand::Variable(var) => Err(Trap::IndexOutOfRange {
                array: var.name().to_string(),
                index: offset,
            }),
            Operand::Element(elem) => {
                let index = self.eval(locals, elem.index())?.as_i64() + offset;
                locals.store_element(elem.array().name(), index, value)
            }
            _ => Err(Trap::InvalidArgument("destination must be a variable")),
        }
    }

    fn load_value(
        &self,
        locals: &VariableTable,
        source: &Operand,
        offset: i64,
    ) -> Result<Value, Trap> {
        match source {
            Operand::Variable(var) if offset == 0 => locals.load(var.name()),
            Operand::Variable(var) => Err(Trap::IndexOutOfRange {
                array: var.name().to_string(),
                index: offset,
            }),
            Operand::Element(elem) => {
                let index = self.eval(locals, elem.index())?.as_i64() + offset;
                locals.load_element(elem.array().name(), index)
            }
            _ => Err(Trap::InvalidArgument("source must be a variable")),
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(op: BinaryOp, l: Value, r: Value) -> bool {
    let ordering = if l.is_float() || r.is_float() {
        l.as_f64().partial_cmp(&r.as_f64())
    } else {
        Some(l.as_i64().cmp(&r.as_i64()))
    };
    match ordering {
        Some(ordering) => match op {
            BinaryOp::Eq => ordering.is_eq(),
            BinaryOp::Ne => ordering.is_ne(),
            BinaryOp::Lt => ordering.is_lt(),
            BinaryOp::Le => ordering.is_le(),
            BinaryOp::Gt => ordering.is_gt(),
            BinaryOp::Ge => ordering.is_ge(),
            _ => false,
        },
        // NaN compares unequal to everything.
        None => op == BinaryOp::Ne,
    }
}

/// Integer division and remainder. A zero divisor and a quotient that does
/// not fit are different traps.
fn divide(l: i64, r: i64, op: fn(i64, i64) -> Option<i64>) -> Result<i64, Trap> {
    if r == 0 {
        return Err(Trap::DivideByZero);
    }
    op(l, r).ok_or(Trap::Overflow)
}

fn transfer_args(
    args: &[Operand],
) -> Result<(&Operand, &Tag, &Operand), Trap> {
    match args {
        [buffer, Operand::Tag(tag), count] => Ok((buffer, tag, count)),
        _ => Err(Trap::InvalidArgument("transfer needs buffer, tag and count")),
    }
}

fn macro_name(args: &[Operand]) -> Result<&str, Trap> {
    match args {
        [Operand::Literal(Literal::Str(name))] => Ok(name),
        _ => Err(Trap::InvalidArgument("trigger needs a macro name")),
    }
}

/// Substitutes `%d`, `%f`, `%s` and similar placeholders in order.
fn format_trace(format: &str, values: &[Value]) -> String {
    let mut out = String::new();
    let mut values = values.iter();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some(_) => match values.next() {
                Some(value) => out.push_str(&value.to_string()),
                None => out.push('%'),
            },
            None => out.push('%'),
        }
    }
    out
}
