//! db2rst: convert DocBook man pages to reStructuredText.
//!
//! Reads one DocBook reference entry and writes the equivalent reST to stdout
//! (or `-o FILE`). Constructs that have no reST rendering are reported on
//! stderr as `WARNING:` lines; conversion always continues past them.
//!
//! ```text
//! db2rst systemctl.xml > systemctl.rst
//! db2rst --part content --remove-comments -o out.rst systemctl.xml
//! ```

mod model;
mod parser;
mod render;
mod split;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "db2rst",
    about = "Convert a DocBook man page to reStructuredText"
)]
struct Cli {
    /// DocBook XML file to convert
    file: PathBuf,

    /// Write the result to this file instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Drop XML comments instead of converting them to reST comments
    #[arg(long)]
    remove_comments: bool,

    /// Part of the page to render: all (default), meta, content
    #[arg(long, default_value = "all")]
    part: String,

    /// Print the files included via XInclude instead of converting
    #[arg(long)]
    list_includes: bool,

    /// Suppress progress and warning messages
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let part = split::Part::from_name(&cli.part)?;

    if !cli.quiet {
        eprintln!("Parsing XML file `{}'...", cli.file.display());
    }
    let source = fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let mut root = parser::parse(&source)
        .with_context(|| format!("failed to parse {}", cli.file.display()))?;

    if cli.list_includes {
        let mut listing = String::new();
        for target in split::includes(&root) {
            listing.push_str(&target);
            listing.push('\n');
        }
        return emit(cli.output.as_ref(), &listing);
    }

    split::select(&mut root, part)
        .with_context(|| format!("cannot split {}", cli.file.display()))?;

    let options = render::RenderOptions {
        remove_comments: cli.remove_comments,
    };
    let rendered = render::render_document(&root, &options)
        .with_context(|| format!("failed to convert {}", cli.file.display()))?;

    if !cli.quiet {
        for warning in &rendered.warnings {
            eprintln!("WARNING: {}", warning);
        }
    }

    emit(cli.output.as_ref(), &rendered.text)
}

/// Write to the output file, or stdout when none is given.
fn emit(output: Option<&PathBuf>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}
