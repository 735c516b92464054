//! Checks that patching a buffer reproduces the target text.

use std::{
  path::{
    Path,
    PathBuf,
  },
  time::{
    Duration,
    Instant,
  },
};

use eyre::{
  Result,
  WrapErr,
};
use ropey::Rope;
use the_buffer::{
  Config,
  DocumentHandle,
  TextBuffer,
  replace_text,
};
use the_core::line_ending::{
  LineEnding,
  auto_detect_line_ending,
  normalize_line_endings,
};
use the_lib::patch::EditRange;

#[derive(Debug)]
pub struct Outcome {
  pub edits:   Vec<EditRange>,
  pub applied: bool,
  /// The buffer ended up equal to the new text.
  pub matches: bool,
  /// Line endings of the old and new text as read, before normalizing.
  pub endings: (Option<LineEnding>, Option<LineEnding>),
}

impl Outcome {
  pub fn passed(&self) -> bool {
    self.applied && self.matches
  }
}

/// Opens a buffer with `old` and syncs it to `new`. Both are compared with
/// LF line endings.
pub async fn check_pair(old: &str, new: &str, config: &Config) -> Result<Outcome> {
  let endings = (
    auto_detect_line_ending(&Rope::from_str(old)),
    auto_detect_line_ending(&Rope::from_str(new)),
  );
  log::debug!("line endings: old {:?}, new {:?}", endings.0, endings.1);

  let doc = DocumentHandle::open(Rope::from(normalize_line_endings(old).as_ref()));
  let new = Rope::from(normalize_line_endings(new).as_ref());

  let report = replace_text(&doc, &new, config)
    .await
    .wrap_err("failed to patch buffer")?;
  let text = doc.text().await?;

  Ok(Outcome {
    edits:   report.edits,
    applied: report.applied,
    matches: text == new,
    endings,
  })
}

fn read(path: &Path) -> Result<String> {
  std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

pub async fn check_files(old: &Path, new: &Path, print: bool, config: &Config) -> Result<bool> {
  let outcome = check_pair(&read(old)?, &read(new)?, config).await?;

  if print {
    for edit in &outcome.edits {
      println!("{}", serde_json::to_string(edit)?);
    }
  }
  report(old, new, &outcome, None);
  Ok(outcome.passed())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
  pub passed: usize,
  pub failed: usize,
}

/// Checks every consecutive pair of files in `dir`, sorted by file name.
pub async fn check_fixtures(dir: &Path, config: &Config) -> Result<Summary> {
  let mut files = std::fs::read_dir(dir)
    .wrap_err_with(|| format!("failed to read fixtures in {}", dir.display()))?
    .map(|entry| entry.map(|entry| entry.path()))
    .collect::<std::io::Result<Vec<PathBuf>>>()?;
  files.retain(|path| path.is_file());
  files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

  if files.len() < 2 {
    eyre::bail!("{} needs at least two fixture files", dir.display());
  }

  let mut summary = Summary::default();
  for pair in files.windows(2) {
    let [old, new] = pair else { continue };
    let start = Instant::now();
    let outcome = check_pair(&read(old)?, &read(new)?, config).await?;
    report(old, new, &outcome, Some(start.elapsed()));

    if outcome.passed() {
      summary.passed += 1;
    } else {
      summary.failed += 1;
    }
  }

  println!("{} passed, {} failed", summary.passed, summary.failed);
  Ok(summary)
}

fn report(old: &Path, new: &Path, outcome: &Outcome, elapsed: Option<Duration>) {
  let status = match (outcome.applied, outcome.matches) {
    (true, true) => "ok",
    (false, _) => "REJECTED",
    (true, false) => "MISMATCH",
  };
  let elapsed = elapsed
    .map(|elapsed| format!(" in {:.3}ms", elapsed.as_secs_f64() * 1000.0))
    .unwrap_or_default();
  let endings = match outcome.endings {
    (Some(old), Some(new)) if old != new => format!(" ({old} -> {new})"),
    (Some(LineEnding::Crlf), _) | (_, Some(LineEnding::Crlf)) => " (CRLF)".to_string(),
    _ => String::new(),
  };
  println!(
    "{} -> {}: {} edits{elapsed}{endings} {status}",
    old.display(),
    new.display(),
    outcome.edits.len(),
  );
}
