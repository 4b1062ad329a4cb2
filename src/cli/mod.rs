//! The strexpr command-line interface.
//!
//! Every command compiles its expression with one of the bundled languages:
//! arithmetic for `eval`, `tokens` and `tree`, the filter language for
//! `filter` and `tree --filter`. Failures are rendered as `miette` reports
//! on stderr with exit code 1.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::Parser;
use miette::{Diagnostic, LabeledSpan, SourceCode};
use thiserror::Error;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Command, StrexprArgs};
use crate::cli::data::{DataError, Rows};
use crate::diagnostics::{GrammarError, ParseError, StrexprError};
use crate::languages::{Arithmetic, Filter};

pub mod args;
pub mod data;
pub mod output;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CliError {
    #[error("expression is {len} bytes, over the {max}-byte limit")]
    InputTooLong { len: usize, max: usize },
    #[error("cannot read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path:?} is not valid JSON")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot load records from {path:?}")]
    Data {
        path: PathBuf,
        #[source]
        source: DataError,
    },
    #[error("`--filter` needs `--data`")]
    MissingData,
    #[error("cannot serialize the output")]
    Output(#[from] serde_json::Error),
    #[error(transparent)]
    Strexpr(#[from] StrexprError),
}

impl From<GrammarError> for CliError {
    fn from(err: GrammarError) -> Self {
        CliError::Strexpr(err.into())
    }
}

impl From<ParseError> for CliError {
    fn from(err: ParseError) -> Self {
        CliError::Strexpr(err.into())
    }
}

impl Diagnostic for CliError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let code = match self {
            CliError::InputTooLong { .. } => "strexpr::cli::input_too_long",
            CliError::Read { .. } => "strexpr::cli::read",
            CliError::Json { .. } => "strexpr::cli::json",
            CliError::Data { .. } => "strexpr::cli::data",
            CliError::MissingData => "strexpr::cli::missing_data",
            CliError::Output(_) => "strexpr::cli::output",
            CliError::Strexpr(err) => return err.code(),
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self {
            CliError::InputTooLong { .. } => Some(Box::new(
                "raise the limit with --max-input-len or STREXPR_MAX_INPUT",
            )),
            CliError::Strexpr(err) => err.help(),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match self {
            CliError::Strexpr(err) => err.source_code(),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            CliError::Strexpr(err) => err.labels(),
            _ => None,
        }
    }
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = StrexprArgs::parse();
    init_tracing(args.verbose);

    match execute(&args) {
        Ok(out) => print!("{out}"),
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs one command and returns what it prints.
pub fn execute(args: &StrexprArgs) -> Result<String, CliError> {
    let expr = match &args.command {
        Command::Eval { expr }
        | Command::Tokens { expr, .. }
        | Command::Filter { expr, .. }
        | Command::Tree { expr, .. } => expr,
    };
    if expr.len() > args.max_input_len {
        return Err(CliError::InputTooLong {
            len: expr.len(),
            max: args.max_input_len,
        });
    }
    debug!(command = ?args.command, "dispatching");

    // Dispatch to the appropriate subcommand handler.
    match &args.command {
        Command::Eval { expr } => {
            let value = Arithmetic::new()?.evaluate(expr)?;
            Ok(format!("{}\n", value.normalize()))
        }
        Command::Tokens { expr, json } => {
            let arithmetic = Arithmetic::new()?;
            let tokens = output::collect_tokens(arithmetic.language().tokenize(expr))?;
            if *json {
                Ok(format!("{}\n", output::tokens_json(&tokens)?))
            } else {
                Ok(output::tokens_text(&tokens))
            }
        }
        Command::Filter { expr, data } => {
            let rows = load_rows(data)?;
            let matches = Filter::new()?.filter(expr, &rows.schema, &rows.records)?;
            Ok(format!("{}\n", output::records_json(&matches)?))
        }
        Command::Tree {
            expr,
            filter: true,
            data,
        } => {
            let data = data.as_deref().ok_or(CliError::MissingData)?;
            let rows = load_rows(data)?;
            let lambda = Filter::new()?.parse(expr, rows.schema)?;
            Ok(format!("{}\n", lambda.body()))
        }
        Command::Tree { expr, .. } => {
            let lambda = Arithmetic::new()?.parse(expr)?;
            Ok(format!("{}\n", lambda.body()))
        }
    }
}

fn load_rows(path: &Path) -> Result<Rows, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let json = serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    data::load(&json).map_err(|source| CliError::Data {
        path: path.to_path_buf(),
        source,
    })
}
