//! Loading of the `config.toml` file.

use std::{
  borrow::Cow,
  path::{
    Path,
    PathBuf,
  },
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};
use eyre::{
  Result,
  WrapErr,
};
use the_buffer::Config;

/// `$THE_PATCH_CONFIG_DIR`, or `the-patch` under the platform config directory.
pub fn config_dir() -> Option<PathBuf> {
  if let Ok(dir) = std::env::var("THE_PATCH_CONFIG_DIR") {
    return Some(PathBuf::from(dir));
  }
  let strategy = choose_base_strategy().ok()?;
  let mut path = strategy.config_dir();
  path.push("the-patch");
  Some(path)
}

pub fn default_config_file() -> Option<PathBuf> {
  config_dir().map(|dir| dir.join("config.toml"))
}

/// Loads `file`, or the default config file if it exists.
///
/// A missing default file means the built-in defaults; a missing `file` is an
/// error.
pub fn load(file: Option<&Path>) -> Result<Config> {
  let file = match file {
    Some(file) => Cow::Borrowed(file),
    None => {
      match default_config_file() {
        Some(file) if file.exists() => Cow::Owned(file),
        _ => {
          log::debug!("no config file, using defaults");
          return Ok(Config::default());
        },
      }
    },
  };

  let text = std::fs::read_to_string(&file)
    .wrap_err_with(|| format!("failed to read config {}", file.display()))?;
  let config = parse(&text).wrap_err_with(|| format!("failed to load config {}", file.display()))?;
  log::info!("loaded config from {}", file.display());
  Ok(config)
}

pub fn parse(text: &str) -> Result<Config> {
  toml::from_str(text).wrap_err("failed to parse config")
}
