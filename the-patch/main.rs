//! Command line harness for patch translation.
//!
//! Diffs two texts, translates the hunks into line/column edits and applies
//! them to an in-memory buffer, then checks that the buffer holds the new text.

mod check;
mod cli;
mod config;

use std::{
  path::Path,
  process::ExitCode,
};

use clap::Parser;
use eyre::Result;

use crate::cli::{
  Cli,
  Command,
};

fn setup_logging(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
  let level = match verbosity {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    2 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };

  let dispatch = fern::Dispatch::new()
    .level(level)
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} [{}] {}",
        record.target(),
        record.level(),
        message
      ))
    });

  let dispatch = match log_file {
    Some(path) => dispatch.chain(fern::log_file(path)?),
    None => dispatch.chain(std::io::stderr()),
  };
  dispatch.apply()?;

  Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
  let cli = Cli::parse();
  setup_logging(cli.verbosity, cli.log_file.as_deref())?;

  let mut config = config::load(cli.config_file.as_deref())?;
  if let Some(strategy) = cli.strategy {
    config.index.strategy = strategy.into();
  }
  log::debug!("using {:?}", config.index);

  let passed = match cli.command {
    Command::Check { old, new, print } => check::check_files(&old, &new, print, &config).await?,
    Command::Fixtures { dir } => check::check_fixtures(&dir, &config).await?.failed == 0,
  };

  Ok(if passed {
    ExitCode::SUCCESS
  } else {
    ExitCode::FAILURE
  })
}
