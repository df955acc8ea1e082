//! Command-line arguments

use std::path::PathBuf;

use bemkit_core::Strictness;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "idfcheck", version, about = "Check and reformat IDF files")]
pub struct Cli {
    /// Schema TOML to validate against (defaults to the bundled model schema)
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Workspace settings file (created with defaults if missing)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load an IDF file and print a validity report
    Check(CheckArgs),
    /// Load an IDF file and print it back in canonical layout
    Format(FormatArgs),
    /// List the object types the schema defines
    Types,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    pub file: PathBuf,

    /// Override the configured strictness
    #[arg(long, value_enum)]
    pub strictness: Option<StrictnessArg>,
}

#[derive(Debug, Args)]
pub struct FormatArgs {
    pub file: PathBuf,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrictnessArg {
    None,
    Draft,
    Final,
}

impl From<StrictnessArg> for Strictness {
    fn from(arg: StrictnessArg) -> Self {
        match arg {
            StrictnessArg::None => Strictness::None,
            StrictnessArg::Draft => Strictness::Draft,
            StrictnessArg::Final => Strictness::Final,
        }
    }
}
