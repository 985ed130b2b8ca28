use std::path::PathBuf;

use clap::Parser;

use ebmacroc::cli::{self, Direction, IndirectOptions};
use ebmacroc::logger;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "ebmacroc", about = "EasyBuilder macro compiler")]
struct Args {
    /// Turn on verbose logging. Repeat to increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Sets the logging to write to a file.
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Selects the subcommand.
    #[command(subcommand)]
    action: Action,
}

#[derive(clap::Subcommand, Debug)]
enum Action {
    /// Checks tag list files for malformed rows and duplicate names or
    /// addresses.
    CheckTags {
        /// Tag list files or directories of tag list files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Bakes a macro that dispatches a logical tag to one of several
    /// concrete tags.
    Indirect {
        /// Tag list files that define the tags.
        #[arg(long, required = true)]
        tags: Vec<PathBuf>,

        /// Name of the logical tag.
        #[arg(long)]
        logical: String,

        /// Name of the variable that holds the value in transit.
        #[arg(long)]
        buffer: String,

        /// Names of the concrete tags, in selection order.
        #[arg(long, required = true, num_args = 1..)]
        actual: Vec<String>,

        /// Tag that holds the index of the concrete tag to use.
        #[arg(long, conflicts_with = "index")]
        selector: Option<String>,

        /// Fixed index of the concrete tag to use.
        #[arg(long, default_value_t = 0)]
        index: i64,

        /// Which way data moves.
        #[arg(long, value_enum, default_value_t = Direction::Read)]
        direction: Direction,

        /// Name of the generated macro (default: <logical>_dispatch).
        #[arg(long)]
        name: Option<String>,

        /// Write the baked macros as JSON.
        #[arg(long)]
        json: bool,

        /// Spaces per nesting level.
        #[arg(long, default_value_t = 4)]
        indent: usize,
    },
    /// Prints the version number of the compiler.
    Version,
}

pub fn main() -> Result<(), String> {
    let args = Args::parse();

    logger::configure(args.verbose, args.log_file)?;

    match args.action {
        Action::CheckTags { files } => cli::check_tags(files, false),
        Action::Indirect {
            tags,
            logical,
            buffer,
            actual,
            selector,
            index,
            direction,
            name,
            json,
            indent,
        } => cli::indirect(
            &IndirectOptions {
                tags,
                logical,
                buffer,
                actual,
                selector,
                index,
                direction,
                name,
                json,
                indent,
            },
            false,
        ),
        Action::Version => {
            println!("ebmacroc version {VERSION}");
            Ok(())
        }
    }
}
