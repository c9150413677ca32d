mod defines;
mod resolver;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use cprep_engine::Engine;
use cprep_foundation::errors::{Diagnostic, Severity};
use cprep_foundation::source::open_file;
use tracing::{debug, error, metadata::LevelFilter, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::defines::parse_define_flag;
use crate::resolver::{parent_dir, SearchPathResolver};

#[derive(Debug, Parser)]
#[command(about = "Runs cprep's preprocessing engine over a single source file")]
pub struct Args {
    /// Source file to preprocess.
    input: PathBuf,

    /// A directory to search for `#include`d files, in addition to the
    /// input file's own directory. May be given multiple times; searched
    /// in the order given.
    #[clap(short = 'I', long = "include")]
    include: Vec<PathBuf>,

    /// Predefines a macro before processing begins, as `NAME` (defined as
    /// `1`) or `NAME=VALUE`. May be given multiple times.
    #[clap(short = 'D', long = "define")]
    define: Vec<String>,
}

pub fn fallible_main(args: Args) -> anyhow::Result<()> {
    debug!(input = %args.input.display(), "opening source file");
    let root = open_file(&args.input)
        .with_context(|| format!("cannot read source file at {:?}", args.input))?;

    let resolver = SearchPathResolver::new(parent_dir(&args.input), args.include.clone());
    let mut engine = Engine::new(Box::new(root), Box::new(resolver));

    for flag in &args.define {
        let (name, replacement) = parse_define_flag(flag);
        debug!(name, "predefining macro from -D flag");
        engine.define_object_macro(name, replacement);
    }

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let output = engine.process(&mut diagnostics);

    for diagnostic in &diagnostics {
        match diagnostic.severity {
            Severity::Error | Severity::Bug => error!("{}", diagnostic.message),
            Severity::Warning => warn!("{}", diagnostic.message),
            Severity::Note => debug!("{}", diagnostic.message),
        }
    }

    print!("{output}");
    Ok(())
}

fn main() {
    let subscriber = tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        );
    tracing::subscriber::set_global_default(subscriber)
        .expect("cannot set default tracing subscriber");

    let args = Args::parse();

    if let Err(error) = fallible_main(args) {
        error!("{error:?}");
        std::process::exit(1);
    }
}
