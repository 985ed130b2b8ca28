//! Reads EasyBuilder tag list files.
//!
//! Each row is `name, device, register, offset, comment, type`. Fields
//! use CSV quoting and there is no header row. An empty type label is a
//! bit tag.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use ebmacro_dsl::common::Tag;
use ebmacro_dsl::core::TagType;
use ebmacro_dsl::diagnostic::{Diagnostic, Label, QualifiedPosition};
use ebmacro_problems::Problem;
use log::{debug, trace};
use thiserror::Error;

const COLUMNS: usize = 6;

/// Errors that can occur while reading a tag list.
#[derive(Debug, Error)]
pub enum TagListError {
    #[error("Unable to read tag list {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Tag list is not valid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Tag list has {} problem(s)", .0.len())]
    Invalid(Vec<Diagnostic>),
}

/// The tags defined by one or more tag list files.
///
/// Names are unique and no two tags share a device address.
#[derive(Debug, Default)]
pub struct TagList {
    tags: Vec<Tag>,
    by_name: HashMap<String, (usize, Label)>,
    by_address: HashMap<(String, String), Label>,
}

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the file and adds its tags.
    pub fn read(&mut self, path: &Path) -> Result<(), TagListError> {
        let text = fs::read_to_string(path).map_err(|source| TagListError::Io {
            file: path.display().to_string(),
            source,
        })?;
        self.parse(&path.display().to_string(), &text)
    }

    /// Parses tag list text and adds the tags. `file` names the source in
    /// diagnostics. Nothing is added when any row has a problem.
    pub fn parse(&mut self, file: &str, text: &str) -> Result<(), TagListError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut pending = TagList {
            tags: vec![],
            by_name: self.by_name.clone(),
            by_address: self.by_address.clone(),
        };
        let mut problems = vec![];

        for record in reader.records() {
            let record = record?;
            let position = record
                .position()
                .map(|p| QualifiedPosition::new(p.line() as usize, 1, p.byte() as usize))
                .unwrap_or_else(|| QualifiedPosition::new(0, 1, 0));
            trace!("Tag list row {}: {:?}", position.line, record);

            match row_to_tag(file, &position, &record) {
                Ok(tag) => {
                    let at = Label::qualified(file, position, "Tag defined here");
                    if let Err(diagnostic) = pending.insert(tag, at) {
                        problems.push(diagnostic);
                    }
                }
                Err(diagnostic) => problems.push(diagnostic),
            }
        }

        if !problems.is_empty() {
            return Err(TagListError::Invalid(problems));
        }
        debug!("Read {} tags from {}", pending.tags.len(), file);
        for tag in pending.tags {
            self.tags.push(tag);
        }
        self.by_name = pending.by_name;
        self.by_address = pending.by_address;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.by_name.get(name).map(|(index, _)| &self.tags[*index])
    }

    /// Finds the tag or reports it as unknown.
    pub fn require(&self, name: &str) -> Result<&Tag, Diagnostic> {
        self.get(name).ok_or_else(|| {
            Diagnostic::problem(
                Problem::UnknownTag,
                Label::element(name, "Tag is not in the tag list"),
            )
        })
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn insert(&mut self, tag: Tag, at: Label) -> Result<(), Diagnostic> {
        if let Some((_, first)) = self.by_name.get(tag.name()) {
            return Err(Diagnostic::problem(
                Problem::DuplicateTagName,
                Label {
                    location: at.location,
                    message: String::from("Tag name is defined again"),
                },
            )
            .with_context("name", tag.name())
            .with_secondary(first.clone()));
        }

        let address = (tag.device().to_string(), tag.address().to_string());
        if let Some(first) = self.by_address.get(&address) {
            return Err(Diagnostic::problem(
                Problem::DuplicateTagAddress,
                Label {
                    location: at.location,
                    message: String::from("Address is defined again"),
                },
            )
            .with_context("device", &address.0)
            .with_context("address", &address.1)
            .with_secondary(first.clone()));
        }

        // Indices refer to the combined list once the pending tags are
        // appended.
        let index = self.by_name.len();
        self.by_name.insert(tag.name().to_string(), (index, at.clone()));
        self.by_address.insert(address, at);
        self.tags.push(tag);
        Ok(())
    }
}

fn row_to_tag(
    file: &str,
    position: &QualifiedPosition,
    record: &StringRecord,
) -> Result<Tag, Diagnostic> {
    if record.len() != COLUMNS {
        return Err(Diagnostic::problem(
            Problem::InvalidTagListRow,
            Label::qualified(file, position.clone(), "Row does not have six columns"),
        )
        .with_context("columns", record.len()));
    }

    let label = &record[5];
    let tag_type = TagType::try_from(label).map_err(|_| {
        Diagnostic::problem(
            Problem::UnknownTagType,
            Label::qualified(file, position.clone(), "Type label is not recognized"),
        )
        .with_context("label", label)
    })?;

    let address = format!("{}, {}", &record[2], &record[3]);
    Tag::new(&record[0], &record[1], &address, tag_type).map_err(|diagnostic| {
        diagnostic.with_secondary(Label::qualified(file, position.clone(), "In this row"))
    })
}
