//! Provides definition for diagnostics, which are the configuration errors
//! found while building a macro.
//!
//! Most diagnostics refer to a named element built through the API (a
//! variable, tag, task or macro). Diagnostics that come from reading files,
//! such as tag lists, refer to a position in that file instead.

use std::fmt;

use ebmacro_problems::Problem;

/// A position marker that has both line and offset information.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedPosition {
    /// Line (1-indexed)
    pub line: usize,

    /// Column (1-indexed)
    pub column: usize,

    /// Byte offset from start of string (0-indexed)
    pub offset: usize,
}

impl QualifiedPosition {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Location {
    /// A named element of the model.
    Element(String),
    /// A position in a named file.
    File {
        file: String,
        position: QualifiedPosition,
    },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Element(name) => write!(f, "'{}'", name),
            Location::File { file, position } => write!(f, "{}:{}", file, position.line),
        }
    }
}

/// A label that refers to the element or file position a diagnostic is
/// about, along with a message related to that element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    /// What the label points at.
    pub location: Location,

    /// A message describing this label.
    pub message: String,
}

impl Label {
    /// A label for a named element such as a variable, tag or macro.
    pub fn element(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: Location::Element(name.into()),
            message: message.into(),
        }
    }

    /// A label for a position in a file.
    pub fn qualified(
        file: impl Into<String>,
        position: QualifiedPosition,
        message: impl Into<String>,
    ) -> Self {
        Self {
            location: Location::File {
                file: file.into(),
                position,
            },
            message: message.into(),
        }
    }
}

/// A diagnostic. Diagnostic have a code that is indicative of the category,
/// a primary location and possibly non-zero set of secondary location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// A normally unique value describing the type of diagnostic.
    pub code: String,

    description: String,

    /// The primary or first diagnostic.
    pub primary: Label,

    /// Additional descriptions to the constant description.
    pub described: Vec<String>,

    /// Additional information about the diagnostic.
    pub secondary: Vec<Label>,
}

impl Diagnostic {
    /// Creates a diagnostic from the problem code and with the specified label.
    pub fn problem(problem: Problem, primary: Label) -> Self {
        Self {
            code: problem.code().to_string(),
            description: problem.message().to_string(),
            primary,
            described: vec![],
            secondary: vec![],
        }
    }

    /// Adds to the problem description (primary text) additional context
    /// about the problem.
    pub fn with_context(mut self, description: &str, item: impl fmt::Display) -> Self {
        self.described.push(format!("{}={}", description, item));
        self
    }

    pub fn with_secondary(mut self, label: Label) -> Self {
        self.secondary.push(label);
        self
    }

    /// Returns true if the diagnostic is an instance of the problem.
    pub fn is(&self, problem: Problem) -> bool {
        self.code == problem.code()
    }

    /// Returns the description for the diagnostic. This may add in other
    /// data in addition that is part of the diagnostic.
    pub fn description(&self) -> String {
        if self.described.is_empty() {
            self.description.clone()
        } else {
            format!("{} ({})", self.description, self.described.join(", "))
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}: {}",
            self.code,
            self.description(),
            self.primary.location,
            self.primary.message
        )
    }
}

impl std::error::Error for Diagnostic {}
