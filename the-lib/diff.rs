//! Flat diffs between two texts.
//!
//! Produces the [`Hunk`]s that [`crate::patch`] translates: a line diff first,
//! then a char level refinement of small changed regions so hunks stay tight.

use std::{
  ops::Range,
  time::Instant,
};

use imara_diff::{
  Algorithm,
  Diff,
  IndentHeuristic,
  IndentLevel,
  InternedInput,
};
use ropey::{
  Rope,
  RopeSlice,
};
use serde::Deserialize;

use crate::{
  Tendril,
  patch::Hunk,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct DiffOptions {
  pub indent_width:              u8,
  pub max_char_diff_ratio:       u32,
  pub max_char_diff_total_lines: u32,
  pub max_char_diff_total_chars: usize,
  pub min_large_delete_lines:    u32,
  pub min_large_delete_chars:    usize,
}

impl Default for DiffOptions {
  fn default() -> Self {
    const DEFAULT_CHARS_PER_LINE: usize = 200;
    Self {
      indent_width:              4,
      max_char_diff_ratio:       5,
      max_char_diff_total_lines: 200,
      max_char_diff_total_chars: 200 * DEFAULT_CHARS_PER_LINE,
      min_large_delete_lines:    10,
      min_large_delete_chars:    10 * DEFAULT_CHARS_PER_LINE,
    }
  }
}

/// Collects sorted hunks while walking the old text front to back.
#[derive(Debug, Default)]
struct HunkBuilder {
  hunks: Vec<Hunk>,
  pos:   usize,
}

impl HunkBuilder {
  fn retain(&mut self, n: usize) {
    self.pos += n;
  }

  /// Replaces the next `len` chars of the old text with `text`.
  fn replace(&mut self, len: usize, text: Tendril) {
    if len == 0 && text.is_empty() {
      return;
    }

    let start = self.pos;
    self.pos += len;

    match self.hunks.last_mut() {
      Some(last) if last.end == start => {
        last.end = self.pos;
        last.text.push_str(&text);
      },
      _ => self.hunks.push(Hunk::new(start, self.pos, text)),
    }
  }
}

struct Refinement<'a> {
  res:       HunkBuilder,
  file:      &'a InternedInput<RopeSlice<'a>>,
  options:   &'a DiffOptions,
  char_hunk: InternedInput<char>,
  char_diff: Diff,
  line:      u32,
}

impl Refinement<'_> {
  fn before_len_chars(&self, range: Range<u32>) -> usize {
    self.file.before[range.start as usize..range.end as usize]
      .iter()
      .map(|&it| self.file.interner[it].len_chars())
      .sum()
  }

  fn after_len_chars(&self, range: Range<u32>) -> usize {
    self.file.after[range.start as usize..range.end as usize]
      .iter()
      .map(|&it| self.file.interner[it].len_chars())
      .sum()
  }

  fn after_text(&self, range: Range<u32>) -> Tendril {
    let mut text = Tendril::new();
    for &line in &self.file.after[range.start as usize..range.end as usize] {
      for chunk in self.file.interner[line].chunks() {
        text.push_str(chunk);
      }
    }
    text
  }

  fn should_char_diff(&self, before: &Range<u32>, after: &Range<u32>) -> bool {
    let len_before_lines = before.end - before.start;
    let len_after_lines = after.end - after.start;
    if len_before_lines == 0 || len_after_lines == 0 {
      return false;
    }

    let total_lines = len_before_lines as u64 + len_after_lines as u64;
    if total_lines > self.options.max_char_diff_total_lines as u64 {
      return false;
    }

    let len_before_chars = self.before_len_chars(before.clone());
    let len_after_chars = self.after_len_chars(after.clone());
    let total_chars = len_before_chars.saturating_add(len_after_chars) as u64;
    if total_chars > self.options.max_char_diff_total_chars as u64 {
      return false;
    }

    let ratio = self.options.max_char_diff_ratio as u64;
    if len_after_chars as u64 > ratio.saturating_mul(len_before_chars as u64) {
      return false;
    }

    if len_before_chars as u64 > ratio.saturating_mul(len_after_chars as u64)
      && (len_before_lines > self.options.min_large_delete_lines
        || len_before_chars > self.options.min_large_delete_chars)
    {
      return false;
    }

    true
  }

  fn char_diff(&mut self, before: Range<u32>, after: Range<u32>) {
    let file = self.file;
    self.char_hunk.update_before(
      file.before[before.start as usize..before.end as usize]
        .iter()
        .flat_map(|&it| file.interner[it].chars()),
    );
    self.char_hunk.update_after(
      file.after[after.start as usize..after.end as usize]
        .iter()
        .flat_map(|&it| file.interner[it].chars()),
    );
    // histogram does poorly on chars, they reoccur too often
    self.char_diff.compute_with(
      Algorithm::Myers,
      &self.char_hunk.before,
      &self.char_hunk.after,
      self.char_hunk.interner.num_tokens(),
    );

    let mut pos = 0;
    for imara_diff::Hunk { before, after } in self.char_diff.hunks() {
      self.res.retain((before.start - pos) as usize);
      let text = self.char_hunk.after[after.start as usize..after.end as usize]
        .iter()
        .map(|&token| self.char_hunk.interner[token])
        .collect();
      self.res.replace(before.len(), text);
      pos = before.end;
    }
    self.res.retain(self.char_hunk.before.len() - pos as usize);
    self.char_hunk.clear();
  }

  fn process_hunk(&mut self, before: Range<u32>, after: Range<u32>) {
    self.res.retain(self.before_len_chars(self.line..before.start));
    self.line = before.end;

    // pure insertions and removals, or changes too large to diff per char
    if self.should_char_diff(&before, &after) {
      self.char_diff(before, after);
    } else {
      let len = self.before_len_chars(before);
      let text = self.after_text(after);
      self.res.replace(len, text);
    }
  }
}

struct RopeLines<'a>(RopeSlice<'a>);

impl<'a> imara_diff::TokenSource for RopeLines<'a> {
  type Token = RopeSlice<'a>;
  type Tokenizer = ropey::iter::Lines<'a>;

  fn tokenize(&self) -> Self::Tokenizer {
    self.0.lines()
  }

  fn estimate_tokens(&self) -> u32 {
    u32::try_from(self.0.len_lines()).unwrap_or(u32::MAX)
  }
}

/// Compares `before` and `after` and returns the hunks that turn one into the
/// other, sorted and non-overlapping, in char offsets of `before`.
pub fn compare(before: &Rope, after: &Rope) -> Vec<Hunk> {
  compare_with_options(before, after, &DiffOptions::default())
}

pub fn compare_with_options(before: &Rope, after: &Rope, options: &DiffOptions) -> Vec<Hunk> {
  let start = log::log_enabled!(log::Level::Debug).then(Instant::now);
  let file = InternedInput::new(RopeLines(before.slice(..)), RopeLines(after.slice(..)));
  let mut diff = Diff::compute(Algorithm::Histogram, &file);
  diff.postprocess_with_heuristic(
    &file,
    IndentHeuristic::new(|token| {
      IndentLevel::for_ascii_line(file.interner[token].bytes(), options.indent_width)
    }),
  );

  let mut refinement = Refinement {
    res: HunkBuilder::default(),
    file: &file,
    options,
    char_hunk: InternedInput::default(),
    char_diff: Diff::default(),
    line: 0,
  };
  for hunk in diff.hunks() {
    refinement.process_hunk(hunk.before, hunk.after);
  }
  let hunks = refinement.res.hunks;

  if let Some(start) = start {
    log::debug!(
      "diff of {} chars produced {} hunks in {}s",
      before.len_chars(),
      hunks.len(),
      start.elapsed().as_secs_f64()
    );
  }
  hunks
}
