//! A logical tag backed by one of several concrete tags.
use ebmacro_dsl::common::{Operand, Tag, Variable};
use ebmacro_dsl::core::DataType;
use ebmacro_dsl::diagnostic::{Diagnostic, Label};
use ebmacro_dsl::statement::{Stmt, SwitchBuilder};
use ebmacro_problems::Problem;
use log::debug;

/// Moves data between a buffer variable and the concrete tag chosen by a
/// selection variable.
///
/// The selection is not checked when the macro runs. A selection outside
/// the concrete tags matches no case and transfers nothing.
#[derive(Clone, Debug)]
pub struct IndirectTag {
    tag: Tag,
    buffer: Variable,
    actual: Vec<Tag>,
    selection: Variable,
}

impl IndirectTag {
    pub fn new(
        tag: &Tag,
        buffer: &Variable,
        actual: impl IntoIterator<Item = Tag>,
    ) -> Result<Self, Diagnostic> {
        let actual: Vec<Tag> = actual.into_iter().collect();
        if actual.is_empty() {
            return Err(Diagnostic::problem(
                Problem::EmptyIndirectTargets,
                Label::element(tag.name(), "Indirect tag has no concrete tags"),
            ));
        }
        let selection =
            Variable::new(format!("{}_selection", tag.name()), DataType::Int)?.with_initial(0)?;
        Ok(Self {
            tag: tag.clone(),
            buffer: buffer.clone(),
            actual,
            selection,
        })
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn buffer(&self) -> &Variable {
        &self.buffer
    }

    pub fn actual(&self) -> &[Tag] {
        &self.actual
    }

    pub fn selection(&self) -> &Variable {
        &self.selection
    }

    /// Selects the concrete tag at the index.
    pub fn select(&self, index: impl Into<Operand>) -> Result<Stmt, Diagnostic> {
        let index = index.into();
        if let Some(value) = index.as_int() {
            if value < 0 || value as usize >= self.actual.len() {
                return Err(Diagnostic::problem(
                    Problem::IndexOutOfRange,
                    Label::element(self.selection.name(), "No concrete tag at the index"),
                )
                .with_context("index", value)
                .with_context("targets", self.actual.len()));
            }
        }
        self.selection.set(index)
    }

    /// Reads the logical tag into the buffer.
    pub fn read_from_indirect(&self) -> Result<Stmt, Diagnostic> {
        self.tag.read(&self.buffer)
    }

    /// Writes the buffer to the logical tag.
    pub fn write_to_indirect(&self) -> Result<Stmt, Diagnostic> {
        self.tag.write(&self.buffer)
    }

    /// Reads the selected concrete tag into the buffer.
    pub fn read_from_actual(&self) -> Result<Stmt, Diagnostic> {
        self.dispatch(
            format!("Reading indirect tag {} from actual", self.tag.name()),
            |tag, buffer| tag.read(buffer),
        )
    }

    /// Writes the buffer to the selected concrete tag.
    pub fn write_to_actual(&self) -> Result<Stmt, Diagnostic> {
        self.dispatch(
            format!("Writing indirect tag {} to actual", self.tag.name()),
            |tag, buffer| tag.write(buffer),
        )
    }

    fn dispatch<F>(&self, comment: String, transfer: F) -> Result<Stmt, Diagnostic>
    where
        F: Fn(&Tag, &Variable) -> Result<Stmt, Diagnostic>,
    {
        debug!("{}", comment);
        let mut switch = SwitchBuilder::new(&self.selection)?;
        for (i, tag) in self.actual.iter().enumerate() {
            switch = switch.case(i as i64, [transfer(tag, &self.buffer)?])?;
        }
        Ok(Stmt::block([Stmt::comment(comment), switch.build()]))
    }
}
