//! Delayed re-invocation of a macro.
use ebmacro_codegen::Macro;
use ebmacro_dsl::core::check_identifier;
use ebmacro_dsl::diagnostic::Diagnostic;
use ebmacro_dsl::intrinsic;
use ebmacro_dsl::statement::Stmt;
use log::debug;

/// Schedules the macro that owns a builder to run again later.
pub trait ScheduleAfter {
    /// The statement that requests the next invocation.
    fn trigger(&self) -> Result<Stmt, Diagnostic>;

    /// The auxiliary macro the host needs so that `trigger` reaches
    /// `owner`, if any.
    fn companion(&self, owner: &str) -> Result<Option<Macro>, Diagnostic>;
}

/// Re-invokes the owner through a loop macro that waits and then triggers
/// the owner asynchronously.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopMacro {
    name: String,
    delay_ms: u32,
}

impl LoopMacro {
    pub fn new(name: impl Into<String>, delay_ms: u32) -> Result<Self, Diagnostic> {
        let name = name.into();
        check_identifier(&name)?;
        Ok(Self { name, delay_ms })
    }

    /// A loop macro named `<base>_loop`.
    pub fn named_after(base: &str, delay_ms: u32) -> Result<Self, Diagnostic> {
        Self::new(format!("{}_loop", base), delay_ms)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }
}

impl ScheduleAfter for LoopMacro {
    fn trigger(&self) -> Result<Stmt, Diagnostic> {
        intrinsic::async_trig_macro(&self.name)
    }

    fn companion(&self, owner: &str) -> Result<Option<Macro>, Diagnostic> {
        debug!("Building loop macro {} for {}", self.name, owner);
        let companion = Macro::build(
            &self.name,
            format!("Loop for {}", owner),
            [
                Stmt::comment(format!("Call {}", owner)),
                intrinsic::delay(self.delay_ms)?,
                intrinsic::async_trig_macro(owner)?,
            ],
        )?;
        Ok(Some(companion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_after_when_base_then_loop_suffix() {
        let schedule = LoopMacro::named_after("pump", 100).unwrap();
        assert_eq!(schedule.name(), "pump_loop");
    }

    #[test]
    fn new_when_reserved_name_then_error() {
        assert!(LoopMacro::new("select", 100).is_err());
    }

    #[test]
    fn companion_when_owner_then_delay_and_trigger_owner() {
        let schedule = LoopMacro::named_after("pump", 250).unwrap();
        let companion = schedule.companion("pump").unwrap().unwrap();

        let script = companion.bake().unwrap();

        assert_eq!(
            script.macros[0].text,
            "// Loop for pump\n\
             macro_command main()\n\
             // Call pump\n\
             DELAY(250)\n\
             ASYNC_TRIG_MACRO(\"pump\")\n\
             end macro_command\n"
        );
    }
}
