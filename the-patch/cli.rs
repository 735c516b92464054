use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
  Subcommand,
  ValueEnum,
};
use the_lib::line_index::IndexStrategy;

#[derive(Parser, Debug)]
#[command(name = "the-patch", about, long_about = None)]
pub struct Cli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count, global = true)]
  pub verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE", global = true)]
  pub log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
  pub config_file: Option<PathBuf>,

  /// Line index used to translate hunks, overrides the config
  #[arg(long, value_enum, global = true)]
  pub strategy: Option<Strategy>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Patch a buffer holding OLD until it matches NEW
  Check {
    old:   PathBuf,
    new:   PathBuf,
    /// Print the edit ranges as JSON lines
    #[arg(long)]
    print: bool,
  },
  /// Check every consecutive pair of files in DIR, sorted by name
  Fixtures { dir: PathBuf },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
  Eager,
  Linear,
  Lazy,
}

impl From<Strategy> for IndexStrategy {
  fn from(strategy: Strategy) -> Self {
    match strategy {
      Strategy::Eager => IndexStrategy::Eager,
      Strategy::Linear => IndexStrategy::Linear,
      Strategy::Lazy => IndexStrategy::Lazy,
    }
  }
}
