use ropey::RopeSlice;
use the_core::line_ending::{
  LINE_DELIMITER,
  line_content_len,
};

use crate::line_index::{
  LineIndex,
  LineStart,
  Result,
};

/// This is a single point in a text buffer.
/// 0-indexed as all things should be, column counted in chars.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Position {
  pub line: usize,
  pub col:  usize,
}

impl Position {
  pub const fn new(line: usize, col: usize) -> Self {
    Self { line, col }
  }

  pub const fn zero() -> Self {
    Self { line: 0, col: 0 }
  }

  /// Moves the position over `text`, as if `text` started here.
  pub fn traverse(self, text: impl AsRef<str>) -> Self {
    let Self { mut line, mut col } = self;

    for ch in text.as_ref().chars() {
      if ch == LINE_DELIMITER {
        line += 1;
        col = 0;
      } else {
        col += 1;
      }
    }

    Self { line, col }
  }
}

impl From<(usize, usize)> for Position {
  fn from(value: (usize, usize)) -> Self {
    Position::new(value.0, value.1)
  }
}

impl std::fmt::Display for Position {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.line, self.col)
  }
}

/// Converts a `Position` into a char index.
///
/// Returns `None` if the line does not exist or the column points past the
/// line's content (its LF excluded).
pub fn char_idx_at_position(text: RopeSlice, position: Position) -> Option<usize> {
  if position.line >= text.len_lines() {
    return None;
  }
  if position.col > line_content_len(&text, position.line) {
    return None;
  }
  Some(text.line_to_char(position.line) + position.col)
}

/// Resolves flat offsets to positions on top of a [`LineIndex`].
#[derive(Debug, Clone)]
pub struct PositionMapper<L> {
  index: L,
}

impl<L: LineIndex> PositionMapper<L> {
  pub fn new(index: L) -> Self {
    Self { index }
  }

  /// Resolves `pos` without looking at lines before `lower_bound`.
  ///
  /// Returns the position and the line start it was measured from, which is
  /// the lower bound for the next query.
  pub fn resolve(&mut self, pos: usize, lower_bound: LineStart) -> Result<(Position, LineStart)> {
    let found = self.index.find_line(pos, lower_bound.line)?;
    Ok((Position::new(found.line, pos - found.char_offset), found))
  }
}
