//! Flat char offset to line lookups.
//!
//! A text is split into lines by LF only; a CR in front of the LF is part of
//! the line's content. Every line owns its delimiter, and the last line owns a
//! virtual one, so the cumulative length table ends at `len_chars + 1`:
//!
//! ```text
//! "ab\ncd"      lines: "ab\n", "cd"
//! line_lengths: [3, 6]
//! ```
//!
//! Entry `i` of that table is the offset of the first char of line `i + 1`.
//! Looking up an offset therefore means finding the first entry greater than
//! it, and queries carry a lower bound line so that a caller walking the text
//! from left to right never searches behind itself.
//!
//! Three interchangeable implementations of [`LineIndex`] exist:
//!
//! - [`EagerLineIndex`] builds the whole table up front and bisects it.
//! - [`LinearLineIndex`] keeps no table and walks lines from the lower bound.
//!   Only sensible for small texts.
//! - [`LazyLineIndex`] fills the table on demand while the queries move
//!   forward and searches the filled prefix with a pivot biased towards the
//!   lower bound, since consecutive diff hunks tend to be close together.
//!
//! All three return identical results, errors included.

use ropey::{
  RopeSlice,
  iter::Chars,
};
use serde::{
  Deserialize,
  Serialize,
};
use the_core::line_ending::LINE_DELIMITER;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LineIndexError>;

/// Pivot divisor used by [`LazyLineIndex::new`].
pub const DEFAULT_SEARCH_BIAS: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LineIndexError {
  #[error("offset {pos} is out of bounds for text length {len}")]
  OffsetOutOfBounds { pos: usize, len: usize },
  #[error("line {line} is out of bounds for a text with {lines} lines")]
  LineOutOfBounds { line: usize, lines: usize },
  #[error("offset {pos} lies before line {line}, which starts at {line_start}")]
  OffsetBeforeLine {
    pos:        usize,
    line:       usize,
    line_start: usize,
  },
}

/// A line together with the flat offset of its first char.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineStart {
  pub line:        usize,
  pub char_offset: usize,
}

impl LineStart {
  pub const fn new(line: usize, char_offset: usize) -> Self {
    Self { line, char_offset }
  }
}

pub trait LineIndex {
  /// Length of the indexed text in chars.
  fn len_chars(&self) -> usize;

  /// Finds the line containing `pos`, looking only at lines `>= start_line`.
  ///
  /// `pos == len_chars()` is valid and resolves to the last line.
  fn find_line(&mut self, pos: usize, start_line: usize) -> Result<LineStart>;
}

fn ensure_offset(pos: usize, len: usize) -> Result<()> {
  if pos > len {
    return Err(LineIndexError::OffsetOutOfBounds { pos, len });
  }
  Ok(())
}

fn ensure_after_line_start(pos: usize, start: LineStart) -> Result<()> {
  if pos < start.char_offset {
    return Err(LineIndexError::OffsetBeforeLine {
      pos,
      line: start.line,
      line_start: start.char_offset,
    });
  }
  Ok(())
}

#[inline]
fn line_start_in(line_lengths: &[usize], line: usize) -> usize {
  match line {
    0 => 0,
    line => line_lengths[line - 1],
  }
}

/// Consumes the rest of the line `chars` is positioned in. Returns the offset
/// of the next line, or `None` if this was the last line.
fn next_line_start(chars: &mut Chars<'_>, line_start: usize) -> Option<usize> {
  let mut offset = line_start;
  for ch in chars {
    offset += 1;
    if ch == LINE_DELIMITER {
      return Some(offset);
    }
  }
  None
}

/// Cumulative line lengths computed before the first query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EagerLineIndex {
  line_lengths: Vec<usize>,
  len:          usize,
}

impl EagerLineIndex {
  pub fn new(text: RopeSlice) -> Self {
    let mut line_lengths = Vec::with_capacity(text.len_lines());
    let mut len = 0;
    for ch in text.chars() {
      len += 1;
      if ch == LINE_DELIMITER {
        line_lengths.push(len);
      }
    }
    line_lengths.push(len + 1);

    Self { line_lengths, len }
  }

  pub fn line_count(&self) -> usize {
    self.line_lengths.len()
  }

  pub fn line_lengths(&self) -> &[usize] {
    &self.line_lengths
  }

  pub fn line_start(&self, line: usize) -> Option<usize> {
    (line < self.line_count()).then(|| line_start_in(&self.line_lengths, line))
  }
}

impl LineIndex for EagerLineIndex {
  fn len_chars(&self) -> usize {
    self.len
  }

  fn find_line(&mut self, pos: usize, start_line: usize) -> Result<LineStart> {
    ensure_offset(pos, self.len)?;
    let lines = self.line_count();
    if start_line >= lines {
      return Err(LineIndexError::LineOutOfBounds {
        line: start_line,
        lines,
      });
    }
    ensure_after_line_start(
      pos,
      LineStart::new(start_line, line_start_in(&self.line_lengths, start_line)),
    )?;

    // The last entry is `len + 1`, so the search never runs off the end.
    let line =
      start_line + self.line_lengths[start_line..].partition_point(|&cumulative| cumulative <= pos);
    Ok(LineStart::new(
      line,
      line_start_in(&self.line_lengths, line),
    ))
  }
}

/// Walks the text line by line. Remembers the last resolved line so that
/// forward queries resume from there instead of from the top.
#[derive(Debug, Clone)]
pub struct LinearLineIndex<'a> {
  text:   RopeSlice<'a>,
  len:    usize,
  cursor: LineStart,
}

impl<'a> LinearLineIndex<'a> {
  pub fn new(text: RopeSlice<'a>) -> Self {
    Self {
      text,
      len: text.len_chars(),
      cursor: LineStart::default(),
    }
  }
}

impl LineIndex for LinearLineIndex<'_> {
  fn len_chars(&self) -> usize {
    self.len
  }

  fn find_line(&mut self, pos: usize, start_line: usize) -> Result<LineStart> {
    ensure_offset(pos, self.len)?;
    if start_line < self.cursor.line {
      self.cursor = LineStart::default();
    }

    let mut current = self.cursor;
    while current.line < start_line {
      let mut chars = self.text.chars_at(current.char_offset);
      match next_line_start(&mut chars, current.char_offset) {
        Some(next) => current = LineStart::new(current.line + 1, next),
        None => {
          self.cursor = current;
          return Err(LineIndexError::LineOutOfBounds {
            line:  start_line,
            lines: current.line + 1,
          });
        },
      }
    }
    self.cursor = current;
    ensure_after_line_start(pos, current)?;

    loop {
      let mut chars = self.text.chars_at(current.char_offset);
      match next_line_start(&mut chars, current.char_offset) {
        Some(next) if next <= pos => current = LineStart::new(current.line + 1, next),
        _ => break,
      }
    }

    self.cursor = current;
    Ok(current)
  }
}

/// Cumulative line lengths filled in on demand.
///
/// `line_lengths` only ever grows; its length is the fill pointer into the
/// text and `chars` sits right behind the last filled line.
#[derive(Debug, Clone)]
pub struct LazyLineIndex<'a> {
  chars:        Chars<'a>,
  line_lengths: Vec<usize>,
  exhausted:    bool,
  len:          usize,
  bias:         usize,
}

impl<'a> LazyLineIndex<'a> {
  pub fn new(text: RopeSlice<'a>) -> Self {
    Self::with_bias(text, DEFAULT_SEARCH_BIAS)
  }

  /// `bias` divides the remaining search range to pick the next pivot; `2`
  /// is plain bisection and larger values probe closer to the lower bound.
  pub fn with_bias(text: RopeSlice<'a>, bias: usize) -> Self {
    Self {
      chars:        text.chars(),
      line_lengths: Vec::new(),
      exhausted:    false,
      len:          text.len_chars(),
      bias:         bias.max(2),
    }
  }

  /// Number of lines whose cumulative length has been computed so far.
  pub fn filled_lines(&self) -> usize {
    self.line_lengths.len()
  }

  pub fn bias(&self) -> usize {
    self.bias
  }

  fn fill_next(&mut self) -> bool {
    if self.exhausted {
      return false;
    }

    let line_start = self.line_lengths.last().copied().unwrap_or(0);
    let next = match next_line_start(&mut self.chars, line_start) {
      Some(next) => next,
      None => {
        self.exhausted = true;
        // virtual delimiter after the last line
        self.len + 1
      },
    };
    self.line_lengths.push(next);
    true
  }

  fn fill_to_line(&mut self, line: usize) -> bool {
    while self.line_lengths.len() <= line {
      if !self.fill_next() {
        return false;
      }
    }
    true
  }

  fn fill_past_offset(&mut self, pos: usize) {
    while self
      .line_lengths
      .last()
      .is_none_or(|&cumulative| cumulative <= pos)
    {
      if !self.fill_next() {
        break;
      }
    }
  }
}

impl LineIndex for LazyLineIndex<'_> {
  fn len_chars(&self) -> usize {
    self.len
  }

  fn find_line(&mut self, pos: usize, start_line: usize) -> Result<LineStart> {
    ensure_offset(pos, self.len)?;
    if !self.fill_to_line(start_line) {
      return Err(LineIndexError::LineOutOfBounds {
        line:  start_line,
        lines: self.line_lengths.len(),
      });
    }
    ensure_after_line_start(
      pos,
      LineStart::new(start_line, line_start_in(&self.line_lengths, start_line)),
    )?;
    self.fill_past_offset(pos);

    let mut low = start_line;
    let mut high = self.line_lengths.len() - 1;
    while low < high {
      let mid = low + (high - low) / self.bias;
      if self.line_lengths[mid] <= pos {
        low = mid + 1;
      } else {
        high = mid;
      }
    }

    Ok(LineStart::new(low, line_start_in(&self.line_lengths, low)))
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexStrategy {
  Eager,
  Linear,
  #[default]
  Lazy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct IndexConfig {
  pub strategy: IndexStrategy,
  /// Pivot divisor for the lazy strategy, ignored by the others.
  pub bias:     usize,
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self {
      strategy: IndexStrategy::default(),
      bias:     DEFAULT_SEARCH_BIAS,
    }
  }
}

impl IndexConfig {
  pub fn build<'a>(&self, text: RopeSlice<'a>) -> AnyLineIndex<'a> {
    match self.strategy {
      IndexStrategy::Eager => AnyLineIndex::Eager(EagerLineIndex::new(text)),
      IndexStrategy::Linear => AnyLineIndex::Linear(LinearLineIndex::new(text)),
      IndexStrategy::Lazy => AnyLineIndex::Lazy(LazyLineIndex::with_bias(text, self.bias)),
    }
  }
}

/// A line index whose strategy is picked at runtime.
#[derive(Debug, Clone)]
pub enum AnyLineIndex<'a> {
  Eager(EagerLineIndex),
  Linear(LinearLineIndex<'a>),
  Lazy(LazyLineIndex<'a>),
}

impl LineIndex for AnyLineIndex<'_> {
  fn len_chars(&self) -> usize {
    match self {
      Self::Eager(index) => index.len_chars(),
      Self::Linear(index) => index.len_chars(),
      Self::Lazy(index) => index.len_chars(),
    }
  }

  fn find_line(&mut self, pos: usize, start_line: usize) -> Result<LineStart> {
    match self {
      Self::Eager(index) => index.find_line(pos, start_line),
      Self::Linear(index) => index.find_line(pos, start_line),
      Self::Lazy(index) => index.find_line(pos, start_line),
    }
  }
}
