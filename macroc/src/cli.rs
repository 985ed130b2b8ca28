//! Implements the command line behavior.

use codespan_reporting::{
    diagnostic::{Diagnostic, Label, LabelStyle, Severity},
    files::SimpleFiles,
    term::{
        self,
        termcolor::{ColorChoice, StandardStream},
    },
};
use ebmacro_codegen::{BakeOptions, Macro, Script};
use ebmacro_dsl::common::Variable;
use ebmacro_dsl::diagnostic::Location;
use ebmacro_sequencer::IndirectTag;
use log::{debug, info};
use std::{
    fs::{self, metadata, read_dir},
    ops::Range,
    path::PathBuf,
};

use crate::taglist::{TagList, TagListError};

/// Which way data moves through an indirect tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    /// Copy the selected concrete tag to the logical tag.
    Read,
    /// Copy the logical tag to the selected concrete tag.
    Write,
}

/// Settings for baking an indirect tag dispatch macro.
#[derive(Clone, Debug)]
pub struct IndirectOptions {
    pub tags: Vec<PathBuf>,
    pub logical: String,
    pub buffer: String,
    pub actual: Vec<String>,
    /// Tag that holds the index of the concrete tag. When absent the
    /// macro selects `index`.
    pub selector: Option<String>,
    pub index: i64,
    pub direction: Direction,
    pub name: Option<String>,
    pub json: bool,
    pub indent: usize,
}

/// A file that diagnostics may point into.
struct Source {
    name: String,
    text: String,
}

/// Checks the tag list files. Reports duplicate names and addresses across
/// all of the files.
pub fn check_tags(paths: Vec<PathBuf>, suppress_output: bool) -> Result<(), String> {
    let (list, _) = load_tags(&paths, suppress_output)?;
    info!("Checked {} tags", list.len());
    if !suppress_output {
        println!("OK");
    }
    Ok(())
}

/// Bakes a macro that moves data between a logical tag and the concrete
/// tag selected at runtime, then prints it.
pub fn indirect(options: &IndirectOptions, suppress_output: bool) -> Result<(), String> {
    let (list, sources) = load_tags(&options.tags, suppress_output)?;

    let script = build_indirect(&list, options).map_err(|diagnostic| {
        handle_diagnostic(diagnostic, &sources, suppress_output);
        String::from("Unable to build indirect tag macro")
    })?;

    let text = if options.json {
        let mut json = script.to_json().map_err(|e| e.to_string())?;
        json.push('\n');
        json
    } else {
        script.to_string()
    };
    if !suppress_output {
        print!("{}", text);
    }
    Ok(())
}

/// Builds and bakes the dispatch macro from tags in the list.
pub fn build_indirect(
    list: &TagList,
    options: &IndirectOptions,
) -> Result<Script, ebmacro_dsl::diagnostic::Diagnostic> {
    let logical = list.require(&options.logical)?;
    let mut actual = vec![];
    for name in &options.actual {
        actual.push(list.require(name)?.clone());
    }
    let buffer = Variable::new(&options.buffer, logical.tag_type().data_type())?;
    let indirect = IndirectTag::new(logical, &buffer, actual)?;

    let mut stmts = vec![match &options.selector {
        Some(selector) => list.require(selector)?.read(indirect.selection())?,
        None => indirect.select(options.index)?,
    }];
    let verb = match options.direction {
        Direction::Read => {
            stmts.push(indirect.read_from_actual()?);
            stmts.push(indirect.write_to_indirect()?);
            "Reads"
        }
        Direction::Write => {
            stmts.push(indirect.read_from_indirect()?);
            stmts.push(indirect.write_to_actual()?);
            "Writes"
        }
    };

    let name = options
        .name
        .clone()
        .unwrap_or_else(|| format!("{}_dispatch", options.logical));
    let description = format!(
        "{} {} through {}",
        verb,
        options.logical,
        options.actual.join(", ")
    );
    debug!("Baking indirect macro {}", name);
    let m = Macro::build(name, description, stmts)?;
    m.bake_with(&BakeOptions {
        indent: options.indent,
        describe: true,
    })
}

/// Reads every tag list into one list. Problems in the files are reported
/// before returning the error.
fn load_tags(
    paths: &[PathBuf],
    suppress_output: bool,
) -> Result<(TagList, Vec<Source>), String> {
    let mut files: Vec<PathBuf> = vec![];
    for path in paths {
        files.append(&mut enumerate_files(path)?);
    }

    let mut list = TagList::new();
    let mut sources = vec![];
    let mut errors = 0;
    for path in files {
        let name = path.display().to_string();
        let text = fs::read_to_string(&path)
            .map_err(|e| format!("Failed opening file {}. {}", name, e))?;
        let result = list.parse(&name, &text);
        sources.push(Source { name, text });

        match result {
            Ok(()) => {}
            Err(TagListError::Invalid(problems)) => {
                errors += problems.len();
                for problem in problems {
                    handle_diagnostic(problem, &sources, suppress_output);
                }
            }
            Err(err) => return Err(err.to_string()),
        }
    }

    if errors > 0 {
        return Err(format!("Number of errors: {}", errors));
    }
    Ok((list, sources))
}

fn enumerate_files(path: &PathBuf) -> Result<Vec<PathBuf>, String> {
    let metadata = metadata(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    if metadata.is_dir() {
        let mut paths: Vec<PathBuf> = read_dir(path)
            .map_err(|e| e.to_string())?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        return Ok(paths);
    }
    Ok(vec![path.to_path_buf()])
}

fn handle_diagnostic(
    diagnostic: ebmacro_dsl::diagnostic::Diagnostic,
    sources: &[Source],
    suppress_output: bool,
) {
    if suppress_output {
        return;
    }
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = codespan_reporting::term::Config::default();

    let mut files: SimpleFiles<&str, &str> = SimpleFiles::new();
    for source in sources {
        files.add(source.name.as_str(), source.text.as_str());
    }

    let diagnostic = map_diagnostic(diagnostic, sources);

    let _ = term::emit(&mut writer.lock(), &config, &files, &diagnostic).map_err(|err| {
        println!("Failed writing to terminal: {}", err);
        1usize
    });
}

/// Maps a label to a file label when it refers to a position in a source,
/// otherwise to a note.
fn map_label(
    label: ebmacro_dsl::diagnostic::Label,
    style: LabelStyle,
    sources: &[Source],
) -> Result<Label<usize>, String> {
    match &label.location {
        Location::File { file, position } => {
            match sources.iter().position(|s| &s.name == file) {
                Some(id) => {
                    let text = &sources[id].text;
                    let end = text
                        .get(position.offset..)
                        .and_then(|rest| rest.find('\n'))
                        .map(|n| position.offset + n)
                        .unwrap_or(text.len());
                    let range = Range {
                        start: position.offset,
                        end,
                    };
                    Ok(Label::new(style, id, range).with_message(label.message))
                }
                None => Err(format!("{}: {}", label.location, label.message)),
            }
        }
        Location::Element(_) => Err(format!("{}: {}", label.location, label.message)),
    }
}

fn map_diagnostic(
    diagnostic: ebmacro_dsl::diagnostic::Diagnostic,
    sources: &[Source],
) -> Diagnostic<usize> {
    let description = diagnostic.description();

    let mut labels = vec![];
    let mut notes = vec![];
    let all = std::iter::once((diagnostic.primary, LabelStyle::Primary)).chain(
        diagnostic
            .secondary
            .into_iter()
            .map(|lbl| (lbl, LabelStyle::Secondary)),
    );
    for (label, style) in all {
        match map_label(label, style, sources) {
            Ok(label) => labels.push(label),
            Err(note) => notes.push(note),
        }
    }

    Diagnostic::new(Severity::Error)
        .with_code(diagnostic.code)
        .with_message(description)
        .with_labels(labels)
        .with_notes(notes)
}

#[cfg(test)]
mod tests {
    use ebmacro_test::shared_resource_path;

    use super::*;

    fn options(actual: &[&str]) -> IndirectOptions {
        IndirectOptions {
            tags: vec![shared_resource_path("tags.csv")],
            logical: String::from("tank_level"),
            buffer: String::from("level"),
            actual: actual.iter().map(|s| s.to_string()).collect(),
            selector: Some(String::from("tank_selector")),
            index: 0,
            direction: Direction::Read,
            name: None,
            json: false,
            indent: 4,
        }
    }

    #[test]
    fn check_tags_when_valid_then_ok() {
        let result = check_tags(vec![shared_resource_path("tags.csv")], true);
        assert!(result.is_ok());
    }

    #[test]
    fn check_tags_when_duplicates_then_err() {
        let result = check_tags(vec![shared_resource_path("tags_duplicate.csv")], true);
        assert_eq!(result.unwrap_err(), "Number of errors: 2");
    }

    #[test]
    fn check_tags_when_missing_file_then_err() {
        let result = check_tags(vec![PathBuf::from("test/file/doesnt/exist.csv")], true);
        assert!(result.is_err());
    }

    #[test]
    fn build_indirect_when_read_then_dispatch_then_write_logical() {
        let options = options(&["tank_level_a", "tank_level_b", "tank_level_c"]);
        let (list, _) = load_tags(&options.tags, true).unwrap();

        let script = build_indirect(&list, &options).unwrap();

        let main = script.main().unwrap();
        assert_eq!(main.name, "tank_level_dispatch");
        assert_eq!(main.text.matches("    case ").count(), 3);
        let dispatch = main.text.find("select case tank_level_selection").unwrap();
        let write = main.text.find("SetData(level, \"Local HMI\", LW, 100, 1)").unwrap();
        assert!(dispatch < write);
        assert!(main
            .text
            .contains("GetData(tank_level_selection, \"Local HMI\", LW, 120, 1)"));
    }

    #[test]
    fn build_indirect_when_unknown_actual_then_unknown_tag() {
        let options = options(&["tank_level_a", "tank_level_z"]);
        let (list, _) = load_tags(&options.tags, true).unwrap();

        let err = build_indirect(&list, &options).unwrap_err();

        assert!(err.is(ebmacro_problems::Problem::UnknownTag));
    }

    #[test]
    fn build_indirect_when_index_out_of_range_then_index_out_of_range() {
        let mut options = options(&["tank_level_a", "tank_level_b"]);
        options.selector = None;
        options.index = 2;
        let (list, _) = load_tags(&options.tags, true).unwrap();

        let err = build_indirect(&list, &options).unwrap_err();

        assert!(err.is(ebmacro_problems::Problem::IndexOutOfRange));
    }
}
