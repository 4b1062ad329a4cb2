//! Defines the command-line arguments and subcommands for the strexpr CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure. Global options also
//! read from the environment.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "strexpr",
    version,
    about = "Compile and evaluate expressions written in grammar-defined languages."
)]
pub struct StrexprArgs {
    /// Reject expressions longer than this many bytes.
    #[arg(long, global = true, env = "STREXPR_MAX_INPUT", default_value_t = 4096)]
    pub max_input_len: usize,

    /// Log engine activity to stderr.
    #[arg(short, long, global = true, env = "STREXPR_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate an arithmetic expression and print the result.
    Eval {
        /// The expression, e.g. "(1 + 2) * sqrt(16)".
        expr: String,
    },
    /// Print the tokens of an arithmetic expression.
    Tokens {
        expr: String,
        /// Print the tokens as a JSON array.
        #[arg(long)]
        json: bool,
    },
    /// Print the records of a JSON file that match a filter predicate.
    Filter {
        /// The predicate, e.g. "Age gt 30 and startswith(Name, 'A')".
        expr: String,
        /// A JSON file holding an array of objects.
        #[arg(long, required = true)]
        data: PathBuf,
    },
    /// Print the parsed expression tree.
    Tree {
        expr: String,
        /// Parse with the filter language instead of arithmetic.
        #[arg(long, requires = "data")]
        filter: bool,
        /// The JSON file whose schema the filter is parsed against.
        #[arg(long)]
        data: Option<PathBuf>,
    },
}
