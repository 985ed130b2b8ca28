//! Step machines.
//!
//! A routine runs one of its steps per invocation. The index of the step
//! to run lives in a tag so the next invocation resumes where the last one
//! stopped. After the last step the index returns to zero.
use ebmacro_codegen::Macro;
use ebmacro_dsl::common::{Tag, Variable};
use ebmacro_dsl::core::DataType;
use ebmacro_dsl::diagnostic::{Diagnostic, Label};
use ebmacro_dsl::expression::{BinaryOp, Expr};
use ebmacro_dsl::statement::{IfBuilder, Stmt};
use ebmacro_problems::Problem;
use log::debug;

use crate::schedule::ScheduleAfter;

/// A step machine driven by however often the enclosing macro runs.
#[derive(Clone, Debug)]
pub struct Routine {
    name: String,
    step_tag: Tag,
    step: Variable,
    steps: Vec<Stmt>,
}

impl Routine {
    pub fn new(
        name: impl Into<String>,
        step_tag: &Tag,
        steps: impl IntoIterator<Item = Stmt>,
    ) -> Result<Self, Diagnostic> {
        let name = name.into();
        let steps: Vec<Stmt> = steps.into_iter().collect();
        if steps.is_empty() {
            return Err(Diagnostic::problem(
                Problem::EmptyStepList,
                Label::element(&name, "Routine has no steps"),
            ));
        }
        // The step counter is a short and must reach the step count.
        if steps.len() > i16::MAX as usize {
            return Err(Diagnostic::problem(
                Problem::TooManySteps,
                Label::element(&name, "Step counter cannot reach the last step"),
            )
            .with_context("steps", steps.len())
            .with_context("limit", i16::MAX));
        }
        let step = Variable::new(format!("{}_step", name), DataType::Short)?.with_initial(0)?;
        Ok(Self {
            name,
            step_tag: step_tag.clone(),
            step,
            steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step_tag(&self) -> &Tag {
        &self.step_tag
    }

    /// The local variable that mirrors the step tag.
    pub fn step_variable(&self) -> &Variable {
        &self.step
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Lowers the routine. The step wraps to zero after the last step.
    pub fn build(&self) -> Result<Stmt, Diagnostic> {
        debug!("Building routine {} with {} steps", self.name, self.len());
        let mut stmts = self.head()?;
        stmts.extend([
            IfBuilder::new(Expr::binary(BinaryOp::Ge, &self.step, self.len())?)?
                .then([Stmt::comment("Reset"), self.step.set(0)?])?
                .build()?,
            Stmt::empty(),
            Stmt::comment("Writing step"),
            self.step_tag.write(&self.step)?,
        ]);
        stmts.extend(self.foot());
        Ok(Stmt::block(stmts))
    }

    /// Reads the step, runs the current step and increments the step.
    fn head(&self) -> Result<Vec<Stmt>, Diagnostic> {
        let mut dispatch: Option<IfBuilder> = None;
        for (i, body) in self.steps.iter().enumerate() {
            let condition = Expr::binary(BinaryOp::Eq, &self.step, i)?;
            let builder = match dispatch {
                None => IfBuilder::new(condition)?,
                Some(builder) => builder.elif(condition)?,
            };
            dispatch = Some(builder.then([Stmt::comment(format!("Step {}", i)), body.clone()])?);
        }
        let dispatch = dispatch.ok_or_else(|| {
            Diagnostic::problem(
                Problem::EmptyStepList,
                Label::element(&self.name, "Routine has no steps"),
            )
        })?;

        Ok(vec![
            Stmt::comment(format!("---------- START ROUTINE {} ----------", self.name)),
            Stmt::comment("Get current step"),
            self.step_tag.read(&self.step)?,
            Stmt::empty(),
            dispatch.build()?,
            Stmt::empty(),
            Stmt::comment("Increment step"),
            self.step.set(Expr::binary(BinaryOp::Add, &self.step, 1)?)?,
            Stmt::empty(),
        ])
    }

    fn foot(&self) -> [Stmt; 3] {
        [
            Stmt::empty(),
            Stmt::comment(format!("---------- END ROUTINE {} ----------", self.name)),
            Stmt::empty(),
        ]
    }
}

/// A step machine that schedules its own next invocation.
///
/// While steps remain the routine is armed: it writes the step back and
/// requests another invocation. Once the last step has run it resets the
/// step and goes idle until something else invokes the macro.
#[derive(Clone, Debug)]
pub struct AsyncRoutine<S: ScheduleAfter> {
    routine: Routine,
    schedule: S,
}

impl<S: ScheduleAfter> AsyncRoutine<S> {
    pub fn new(
        name: impl Into<String>,
        step_tag: &Tag,
        steps: impl IntoIterator<Item = Stmt>,
        schedule: S,
    ) -> Result<Self, Diagnostic> {
        Ok(Self {
            routine: Routine::new(name, step_tag, steps)?,
            schedule,
        })
    }

    pub fn routine(&self) -> &Routine {
        &self.routine
    }

    pub fn schedule(&self) -> &S {
        &self.schedule
    }

    pub fn build(&self) -> Result<Stmt, Diagnostic> {
        let routine = &self.routine;
        debug!("Building async routine {}", routine.name);
        let step = &routine.step;
        let mut stmts = routine.head()?;
        stmts.push(
            IfBuilder::new(Expr::binary(BinaryOp::Lt, step, routine.len())?)?
                .then([routine.step_tag.write(step)?, self.schedule.trigger()?])?
                .otherwise()?
                .then([
                    Stmt::comment("Reset"),
                    step.set(0)?,
                    routine.step_tag.write(step)?,
                ])?
                .build()?,
        );
        stmts.extend(routine.foot());
        Ok(Stmt::block(stmts))
    }

    /// The macro that re-invokes `owner`, if the schedule needs one.
    pub fn companion(&self, owner: &str) -> Result<Option<Macro>, Diagnostic> {
        self.schedule.companion(owner)
    }

    /// Writes the routine to the open macro and spawns its companion.
    pub fn install(&self, owner: &mut Macro) -> Result<(), Diagnostic> {
        let stmt = self.build()?;
        let companion = self.companion(owner.name())?;
        owner.install(stmt, companion)
    }
}
