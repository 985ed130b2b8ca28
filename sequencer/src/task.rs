//! Command-gated tasks and the schedulers that arbitrate between them.
//!
//! A task runs its body once when its command tag is set and then clears
//! the command. The scheduler visits tasks in registration order and skips
//! the rest once one of them has completed in the current invocation.
use std::collections::HashSet;

use ebmacro_codegen::Macro;
use ebmacro_dsl::common::{Tag, Variable};
use ebmacro_dsl::diagnostic::{Diagnostic, Label};
use ebmacro_dsl::expression::{Expr, UnaryOp};
use ebmacro_dsl::statement::{Block, IfBuilder, Stmt};
use ebmacro_problems::Problem;
use log::debug;

use crate::schedule::ScheduleAfter;

/// The flag a task sets when its body completes. Tasks and the scheduler
/// that runs them share one flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoneFlag {
    variable: Variable,
}

impl DoneFlag {
    pub fn new(name: impl Into<String>) -> Result<Self, Diagnostic> {
        Ok(Self {
            variable: Variable::flag(name, false)?,
        })
    }

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn set(&self) -> Result<Stmt, Diagnostic> {
        self.variable.set(true)
    }

    /// The condition `not <flag>`.
    pub fn is_clear(&self) -> Result<Expr, Diagnostic> {
        Expr::unary(UnaryOp::Not, &self.variable)
    }
}

#[derive(Clone, Debug)]
pub struct Task {
    name: String,
    command_tag: Tag,
    command: Variable,
    body: Block,
    done: DoneFlag,
    on: Variable,
    off: Variable,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        command_tag: &Tag,
        body: impl IntoIterator<Item = Stmt>,
        done: &DoneFlag,
    ) -> Result<Self, Diagnostic> {
        let name = name.into();
        Ok(Self {
            command: Variable::flag(format!("{}_cmd", name), false)?,
            name,
            command_tag: command_tag.clone(),
            body: Block::new(body),
            done: done.clone(),
            on: Variable::flag("on", true)?,
            off: Variable::flag("off", false)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command_tag(&self) -> &Tag {
        &self.command_tag
    }

    pub fn done(&self) -> &DoneFlag {
        &self.done
    }

    /// Sets the command tag so the task runs on the next invocation.
    pub fn enable(&self) -> Result<Stmt, Diagnostic> {
        self.command_tag.write(&self.on)
    }

    pub fn disable(&self) -> Result<Stmt, Diagnostic> {
        self.command_tag.write(&self.off)
    }

    pub fn build(&self) -> Result<Stmt, Diagnostic> {
        let mut gated = self.body.stmts().to_vec();
        gated.extend([
            Stmt::empty(),
            Stmt::comment("Done"),
            self.disable()?,
            self.done.set()?,
        ]);
        Ok(Stmt::block([
            Stmt::comment(format!("========== START TASK {} ==========", self.name)),
            self.command_tag.read(&self.command)?,
            IfBuilder::new(&self.command)?.then(gated)?.build()?,
            Stmt::comment(format!("========== END TASK {} ==========", self.name)),
        ]))
    }
}

/// Runs the first enabled task in registration order.
#[derive(Clone, Debug)]
pub struct Scheduler {
    done: DoneFlag,
    tasks: Vec<Task>,
    names: HashSet<String>,
}

impl Scheduler {
    pub fn new(done: &DoneFlag) -> Self {
        Self {
            done: done.clone(),
            tasks: vec![],
            names: HashSet::new(),
        }
    }

    /// Registers the task. Names must be unique and the task must share
    /// this scheduler's done flag.
    pub fn add(&mut self, task: Task) -> Result<(), Diagnostic> {
        if task.done != self.done {
            return Err(Diagnostic::problem(
                Problem::ForeignTask,
                Label::element(&task.name, "Task signals a different done flag"),
            )
            .with_context("expected", self.done.variable().name())
            .with_context("actual", task.done.variable().name()));
        }
        if !self.names.insert(task.name.clone()) {
            return Err(Diagnostic::problem(
                Problem::DuplicateTaskName,
                Label::element(&task.name, "Task is already registered"),
            ));
        }
        debug!("Scheduler registered task {}", task.name);
        self.tasks.push(task);
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn done(&self) -> &DoneFlag {
        &self.done
    }

    pub fn build(&self) -> Result<Stmt, Diagnostic> {
        let mut stmts = vec![Stmt::comment("********** START SCHEDULER **********")];
        stmts.extend(self.gated_tasks()?);
        stmts.push(Stmt::comment("********** END SCHEDULER **********"));
        Ok(Stmt::block(stmts))
    }

    fn gated_tasks(&self) -> Result<Vec<Stmt>, Diagnostic> {
        let mut stmts = vec![];
        for task in &self.tasks {
            stmts.push(
                IfBuilder::new(self.done.is_clear()?)?
                    .then([task.build()?])?
                    .build()?,
            );
        }
        Ok(stmts)
    }
}

/// A scheduler that requests another invocation every time it runs.
#[derive(Clone, Debug)]
pub struct AsyncScheduler<S: ScheduleAfter> {
    name: String,
    scheduler: Scheduler,
    schedule: S,
}

impl<S: ScheduleAfter> AsyncScheduler<S> {
    pub fn new(name: impl Into<String>, done: &DoneFlag, schedule: S) -> Self {
        Self {
            name: name.into(),
            scheduler: Scheduler::new(done),
            schedule,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, task: Task) -> Result<(), Diagnostic> {
        self.scheduler.add(task)
    }

    pub fn tasks(&self) -> &[Task] {
        self.scheduler.tasks()
    }

    pub fn build(&self) -> Result<Stmt, Diagnostic> {
        let mut stmts = vec![Stmt::comment(format!(
            "********** START SCHEDULER {} **********",
            self.name
        ))];
        stmts.extend(self.scheduler.gated_tasks()?);
        stmts.push(self.schedule.trigger()?);
        stmts.push(Stmt::comment(format!(
            "********** END SCHEDULER {} **********",
            self.name
        )));
        Ok(Stmt::block(stmts))
    }

    pub fn companion(&self, owner: &str) -> Result<Option<Macro>, Diagnostic> {
        self.schedule.companion(owner)
    }

    /// Writes the scheduler to the open macro and spawns its companion.
    pub fn install(&self, owner: &mut Macro) -> Result<(), Diagnostic> {
        let stmt = self.build()?;
        let companion = self.companion(owner.name())?;
        owner.install(stmt, companion)
    }
}
