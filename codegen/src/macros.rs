//! The macro container.
//!
//! A macro is created unopened, accepts statements while open and can be
//! baked once closed. Baking is pure: it never changes the macro, so the
//! same macro bakes to the same text every time.
use log::debug;

use ebmacro_dsl::common::Variable;
use ebmacro_dsl::core::check_identifier;
use ebmacro_dsl::diagnostic::{Diagnostic, Label};
use ebmacro_dsl::resources::ResourceSet;
use ebmacro_dsl::statement::Stmt;
use ebmacro_problems::Problem;

use crate::declarations;
use crate::renderer;
use crate::script::{BakeOptions, BakedMacro, Script};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacroState {
    Unopened,
    Open,
    Closed,
}

/// A named unit of generated script and the companion macros it needs.
#[derive(Clone, Debug)]
pub struct Macro {
    name: String,
    description: String,
    stmts: Vec<Stmt>,
    state: MacroState,
    companions: Vec<Macro>,
    resources: ResourceSet,
}

impl Macro {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Result<Self, Diagnostic> {
        let name = name.into();
        check_identifier(&name)?;
        Ok(Self {
            name,
            description: description.into(),
            stmts: vec![],
            state: MacroState::Unopened,
            companions: vec![],
            resources: ResourceSet::new(),
        })
    }

    /// Creates a closed macro with the statements.
    pub fn build(
        name: impl Into<String>,
        description: impl Into<String>,
        stmts: impl IntoIterator<Item = Stmt>,
    ) -> Result<Self, Diagnostic> {
        let mut result = Macro::new(name, description)?;
        result.begin()?;
        result.write(stmts)?;
        result.end()?;
        Ok(result)
    }

    pub fn begin(&mut self) -> Result<(), Diagnostic> {
        self.transition(MacroState::Unopened, MacroState::Open, "begin")
    }

    /// Appends the statements to the macro body.
    pub fn write(&mut self, stmts: impl IntoIterator<Item = Stmt>) -> Result<(), Diagnostic> {
        if self.state != MacroState::Open {
            return Err(Diagnostic::problem(
                Problem::MacroClosed,
                Label::element(&self.name, "Statements can only be written while open"),
            )
            .with_context("state", format!("{:?}", self.state)));
        }
        for stmt in stmts {
            self.resources.extend_from(stmt.resources());
            self.stmts.push(stmt);
        }
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), Diagnostic> {
        self.transition(MacroState::Open, MacroState::Closed, "end")
    }

    /// Registers an auxiliary macro that is baked along with this one.
    ///
    /// The companion must be closed. Its name must differ from this macro
    /// and from every macro already spawned.
    pub fn spawn(&mut self, companion: Macro) -> Result<(), Diagnostic> {
        self.check_spawn(&companion)?;
        debug!("Macro {} spawned {}", self.name, companion.name);
        self.companions.push(companion);
        Ok(())
    }

    /// Checks that `spawn` would accept the companion without changing
    /// this macro.
    pub fn check_spawn(&self, companion: &Macro) -> Result<(), Diagnostic> {
        if companion.state != MacroState::Closed {
            return Err(Diagnostic::problem(
                Problem::MacroNotClosed,
                Label::element(&companion.name, "Companion macro must be closed"),
            ));
        }
        let taken = self.names();
        if let Some(name) = companion.names().into_iter().find(|n| taken.contains(n)) {
            return Err(Diagnostic::problem(
                Problem::DuplicateMacroName,
                Label::element(name, "Macro name is already used"),
            )
            .with_secondary(Label::element(&self.name, "Spawned from this macro")));
        }
        Ok(())
    }

    /// Writes the statement and spawns the companion, or changes nothing
    /// when either would fail.
    pub fn install(&mut self, stmt: Stmt, companion: Option<Macro>) -> Result<(), Diagnostic> {
        if let Some(companion) = &companion {
            self.check_spawn(companion)?;
        }
        self.write([stmt])?;
        if let Some(companion) = companion {
            self.spawn(companion)?;
        }
        Ok(())
    }

    pub fn bake(&self) -> Result<Script, Diagnostic> {
        self.bake_with(&BakeOptions::default())
    }

    /// Renders this macro and its companions.
    pub fn bake_with(&self, options: &BakeOptions) -> Result<Script, Diagnostic> {
        let mut macros = vec![];
        self.bake_into(options, &mut macros)?;
        Ok(Script { macros })
    }

    fn bake_into(&self, options: &BakeOptions, out: &mut Vec<BakedMacro>) -> Result<(), Diagnostic> {
        if self.state != MacroState::Closed {
            return Err(Diagnostic::problem(
                Problem::MacroNotClosed,
                Label::element(&self.name, "Only closed macros can be baked"),
            )
            .with_context("state", format!("{:?}", self.state)));
        }
        debug!("Baking macro {}", self.name);

        let mut text = String::new();
        if options.describe {
            for line in self.description.lines() {
                text.push_str("// ");
                text.push_str(line);
                text.push('\n');
            }
        }
        text.push_str("macro_command main()\n");

        let variables = declarations::collect(&self.stmts)?;
        for variable in &variables {
            text.push_str(&declarations::declaration(variable));
            text.push('\n');
        }
        if !variables.is_empty() {
            text.push('\n');
        }

        for line in renderer::apply(&self.stmts, options.indent)? {
            text.push_str(&line);
            text.push('\n');
        }
        text.push_str("end macro_command\n");

        out.push(BakedMacro {
            name: self.name.clone(),
            description: self.description.clone(),
            text,
        });
        for companion in &self.companions {
            companion.bake_into(options, out)?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> MacroState {
        self.state
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn companions(&self) -> &[Macro] {
        &self.companions
    }

    /// The variables this macro declares, ordered by name.
    pub fn declarations(&self) -> Result<Vec<Variable>, Diagnostic> {
        declarations::collect(&self.stmts)
    }

    /// Resources touched by the statements of this macro. Companions are
    /// not included.
    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    /// The names of this macro and all of its companions.
    fn names(&self) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        for companion in &self.companions {
            names.extend(companion.names());
        }
        names
    }

    fn transition(
        &mut self,
        from: MacroState,
        to: MacroState,
        operation: &str,
    ) -> Result<(), Diagnostic> {
        if self.state != from {
            return Err(Diagnostic::problem(
                Problem::MacroState,
                Label::element(&self.name, "Operation is not valid in the current state"),
            )
            .with_context("operation", operation)
            .with_context("state", format!("{:?}", self.state)));
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ebmacro_dsl::common::Tag;
    use ebmacro_dsl::core::{DataType, TagType};

    use super::*;

    fn closed(name: &str) -> Macro {
        Macro::build(name, "", [Stmt::comment("body")]).unwrap()
    }

    #[test]
    fn write_when_unopened_then_macro_closed() {
        let mut m = Macro::new("pump", "").unwrap();
        let err = m.write([Stmt::empty()]).unwrap_err();
        assert!(err.is(Problem::MacroClosed));
    }

    #[test]
    fn write_when_closed_then_macro_closed() {
        let mut m = closed("pump");
        let err = m.write([Stmt::empty()]).unwrap_err();
        assert!(err.is(Problem::MacroClosed));
        assert_eq!(m.stmts().len(), 1);
    }

    #[test]
    fn begin_when_open_then_macro_state() {
        let mut m = Macro::new("pump", "").unwrap();
        m.begin().unwrap();
        assert!(m.begin().unwrap_err().is(Problem::MacroState));
    }

    #[test]
    fn end_when_unopened_then_macro_state() {
        let mut m = Macro::new("pump", "").unwrap();
        assert!(m.end().unwrap_err().is(Problem::MacroState));
    }

    #[test]
    fn bake_when_open_then_macro_not_closed() {
        let mut m = Macro::new("pump", "").unwrap();
        m.begin().unwrap();
        assert!(m.bake().unwrap_err().is(Problem::MacroNotClosed));
    }

    #[test]
    fn spawn_when_duplicate_name_then_duplicate_macro_name() {
        let mut m = closed("pump");
        m.spawn(closed("pump_loop")).unwrap();

        assert!(m
            .spawn(closed("pump_loop"))
            .unwrap_err()
            .is(Problem::DuplicateMacroName));
        assert!(m
            .spawn(closed("pump"))
            .unwrap_err()
            .is(Problem::DuplicateMacroName));
    }

    #[test]
    fn spawn_when_companion_open_then_macro_not_closed() {
        let mut m = closed("pump");
        let mut companion = Macro::new("pump_loop", "").unwrap();
        companion.begin().unwrap();
        assert!(m.spawn(companion).unwrap_err().is(Problem::MacroNotClosed));
    }

    #[test]
    fn bake_when_variables_and_tag_then_expected_text() {
        let tag = Tag::new("level", "Local HMI", "LW, 10", TagType::S16).unwrap();
        let level = Variable::new("level", DataType::Short)
            .unwrap()
            .with_initial(0)
            .unwrap();
        let m = Macro::build(
            "read_level",
            "Reads the level",
            [Stmt::comment("Read"), tag.read(&level).unwrap()],
        )
        .unwrap();

        let script = m.bake().unwrap();

        assert_eq!(script.macros.len(), 1);
        assert_eq!(
            script.macros[0].text,
            "// Reads the level\n\
             macro_command main()\n\
             short level = 0\n\
             \n\
             // Read\n\
             GetData(level, \"Local HMI\", LW, 10, 1)\n\
             end macro_command\n"
        );
    }

    #[test]
    fn bake_when_called_twice_then_identical() {
        let mut m = closed("pump");
        m.spawn(closed("pump_loop")).unwrap();

        let first = m.bake().unwrap();
        let second = m.bake().unwrap();

        assert_eq!(first, second);
        let names: Vec<&str> = first.macros.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["pump", "pump_loop"]);
    }

    #[test]
    fn bake_with_when_describe_off_then_no_leading_comment() {
        let m = Macro::build("pump", "Pump", [Stmt::empty()]).unwrap();
        let options = BakeOptions {
            indent: 2,
            describe: false,
        };
        let script = m.bake_with(&options).unwrap();
        assert!(script.macros[0].text.starts_with("macro_command main()\n"));
    }

    #[test]
    fn bake_when_shared_across_threads_then_same_text() {
        let m = closed("pump");
        let expected = m.bake().unwrap();

        let baked = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| m.bake().unwrap())).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert!(baked.iter().all(|script| *script == expected));
    }

    #[test]
    fn install_when_companion_name_taken_then_macro_unchanged() {
        let mut m = Macro::new("pump", "").unwrap();
        m.begin().unwrap();

        let err = m
            .install(Stmt::comment("body"), Some(closed("pump")))
            .unwrap_err();

        assert!(err.is(Problem::DuplicateMacroName));
        assert!(m.stmts().is_empty());
        assert!(m.companions().is_empty());
    }
}
