//! Translation of flat diff hunks into line/column edit ranges.
//!
//! A diff over a flat string produces [`Hunk`]s: `[start, end)` char ranges of
//! the old text together with their replacement. A line oriented buffer wants
//! the same edits as [`EditRange`]s, i.e. `(line, col)` pairs.
//!
//! Hunks arrive sorted and never overlap, so the line of every offset is at or
//! after the line of the offset before it. [`EditRanges`] keeps the last
//! resolved line as a cursor and never searches behind it, which keeps a whole
//! patch sub-quadratic.
//!
//! ```ignore
//! use ropey::Rope;
//! use the_lib::{line_index::EagerLineIndex, patch::{Hunk, translate}};
//!
//! let old = Rope::from("foo\nbar");
//! let hunks = vec![Hunk::new(1, 6, "")];
//! let edits = translate(EagerLineIndex::new(old.slice(..)), hunks)
//!   .collect::<Result<Vec<_>, _>>()?;
//! // deletes from 0:1 up to 1:2
//! ```

use std::iter::FusedIterator;

use ropey::RopeSlice;
use serde::Serialize;
use thiserror::Error;

use crate::{
  Tendril,
  line_index::{
    IndexConfig,
    LineIndex,
    LineIndexError,
    LineStart,
  },
  position::{
    Position,
    PositionMapper,
  },
};

pub type Result<T> = std::result::Result<T, PatchError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatchError {
  #[error("invalid hunk: start {start} is after end {end}")]
  InvalidRange { start: usize, end: usize },
  #[error("hunk {start}..{end} overlaps previous end {prev_end}")]
  Overlap {
    prev_end: usize,
    start:    usize,
    end:      usize,
  },
  #[error(transparent)]
  Index(#[from] LineIndexError),
}

/// `[start, end)` of the old text, replaced by `text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hunk {
  pub start: usize,
  pub end:   usize,
  pub text:  Tendril,
}

impl Hunk {
  pub fn new(start: usize, end: usize, text: impl Into<Tendril>) -> Self {
    Self {
      start,
      end,
      text: text.into(),
    }
  }
}

/// A [`Hunk`] in line/column coordinates of the text it was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EditRange {
  pub start:        Position,
  pub end:          Position,
  pub text:         Tendril,
  /// Number of chars between `start` and `end` in the old text.
  pub replaced_len: usize,
}

/// Lazily translates hunks into [`EditRange`]s, in hunk order.
///
/// Yields one item per hunk. After the first error the iterator is done.
#[derive(Debug)]
pub struct EditRanges<L, I> {
  mapper:   PositionMapper<L>,
  hunks:    I,
  cursor:   LineStart,
  prev_end: usize,
  failed:   bool,
}

/// Translates `hunks` against the text indexed by `index`.
pub fn translate<L, I>(index: L, hunks: I) -> EditRanges<L, I::IntoIter>
where
  L: LineIndex,
  I: IntoIterator<Item = Hunk>,
{
  EditRanges {
    mapper:   PositionMapper::new(index),
    hunks:    hunks.into_iter(),
    cursor:   LineStart::default(),
    prev_end: 0,
    failed:   false,
  }
}

/// Translates a whole patch with the strategy from `config`.
pub fn translate_patch<I>(text: RopeSlice, hunks: I, config: &IndexConfig) -> Result<Vec<EditRange>>
where
  I: IntoIterator<Item = Hunk>,
{
  translate(config.build(text), hunks).collect()
}

impl<L: LineIndex, I> EditRanges<L, I> {
  /// The last line resolved so far.
  pub fn cursor(&self) -> LineStart {
    self.cursor
  }

  fn translate_hunk(&mut self, hunk: Hunk) -> Result<EditRange> {
    let Hunk { start, end, text } = hunk;
    if start > end {
      return Err(PatchError::InvalidRange { start, end });
    }
    if start < self.prev_end {
      return Err(PatchError::Overlap {
        prev_end: self.prev_end,
        start,
        end,
      });
    }

    let (start_pos, start_line) = self.mapper.resolve(start, self.cursor)?;
    let (end_pos, end_line) = self.mapper.resolve(end, start_line)?;

    self.cursor = end_line;
    self.prev_end = end;

    Ok(EditRange {
      start: start_pos,
      end: end_pos,
      text,
      replaced_len: end - start,
    })
  }
}

impl<L: LineIndex, I: Iterator<Item = Hunk>> Iterator for EditRanges<L, I> {
  type Item = Result<EditRange>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.failed {
      return None;
    }

    let hunk = self.hunks.next()?;
    let result = self.translate_hunk(hunk);
    match &result {
      Ok(edit) => log::trace!("{}..{} <- {:?}", edit.start, edit.end, edit.text),
      Err(err) => {
        log::debug!("patch translation stopped: {err}");
        self.failed = true;
      },
    }
    Some(result)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    if self.failed {
      (0, Some(0))
    } else {
      (0, self.hunks.size_hint().1)
    }
  }
}

impl<L: LineIndex, I: Iterator<Item = Hunk>> FusedIterator for EditRanges<L, I> {}

#[cfg(test)]
mod tests {
  use ropey::Rope;

  use super::*;
  use crate::{
    diff::compare,
    line_index::{
      EagerLineIndex,
      IndexStrategy,
      LazyLineIndex,
      LinearLineIndex,
    },
  };

  fn configs() -> Vec<IndexConfig> {
    let mut configs = vec![
      IndexConfig {
        strategy: IndexStrategy::Eager,
        ..IndexConfig::default()
      },
      IndexConfig {
        strategy: IndexStrategy::Linear,
        ..IndexConfig::default()
      },
    ];
    for bias in [2, 4, 9] {
      configs.push(IndexConfig {
        strategy: IndexStrategy::Lazy,
        bias,
      });
    }
    configs
  }

  #[track_caller]
  fn assert_translates(old: &str, hunks: Vec<Hunk>, expected: Vec<EditRange>) {
    let rope = Rope::from(old);
    for config in configs() {
      let edits = translate_patch(rope.slice(..), hunks.clone(), &config).unwrap();
      assert_eq!(edits, expected, "{config:?}");
    }
  }

  fn edit(start: (usize, usize), end: (usize, usize), text: &str, replaced_len: usize) -> EditRange {
    EditRange {
      start: start.into(),
      end: end.into(),
      text: text.into(),
      replaced_len,
    }
  }

  #[test]
  fn insertion_at_end_of_text() {
    assert_translates("a\nb", vec![Hunk::new(3, 3, "\nc")], vec![edit(
      (1, 1),
      (1, 1),
      "\nc",
      0,
    )]);
  }

  #[test]
  fn deletion_across_line_break() {
    assert_translates("foo\nbar", vec![Hunk::new(1, 6, "")], vec![edit(
      (0, 1),
      (1, 2),
      "",
      5,
    )]);
  }

  #[test]
  fn replacement_within_a_line() {
    assert_translates(
      "line1\nline2\nline3",
      vec![Hunk::new(6, 11, "LINE2")],
      vec![edit((1, 0), (1, 5), "LINE2", 5)],
    );
  }

  #[test]
  fn several_hunks_keep_their_order() {
    assert_translates(
      "one\ntwo\nthree\nfour",
      vec![
        Hunk::new(0, 0, ">"),
        Hunk::new(3, 4, ""),
        Hunk::new(4, 7, "2"),
        Hunk::new(8, 13, "3"),
        Hunk::new(18, 18, "!"),
      ],
      vec![
        edit((0, 0), (0, 0), ">", 0),
        edit((0, 3), (1, 0), "", 1),
        edit((1, 0), (1, 3), "2", 3),
        edit((2, 0), (2, 5), "3", 5),
        edit((3, 4), (3, 4), "!", 0),
      ],
    );
  }

  #[test]
  fn empty_patch() {
    assert_translates("anything", Vec::new(), Vec::new());
    assert_translates("", vec![Hunk::new(0, 0, "new")], vec![edit(
      (0, 0),
      (0, 0),
      "new",
      0,
    )]);
  }

  #[test]
  fn translation_is_lazy() {
    let rope = Rope::from("a\nb\nc\nd");
    let hunks = vec![Hunk::new(0, 1, "A"), Hunk::new(6, 7, "D")];
    let mut edits = translate(LazyLineIndex::new(rope.slice(..)), hunks);

    assert_eq!(edits.next(), Some(Ok(edit((0, 0), (0, 1), "A", 1))));
    assert_eq!(edits.cursor(), LineStart::new(0, 0));
    assert_eq!(edits.next(), Some(Ok(edit((3, 0), (3, 1), "D", 1))));
    assert_eq!(edits.cursor(), LineStart::new(3, 6));
    assert_eq!(edits.next(), None);
  }

  #[test]
  fn out_of_range_hunk() {
    let rope = Rope::from("abc");
    let mut edits = translate(EagerLineIndex::new(rope.slice(..)), vec![
      Hunk::new(2, 4, ""),
      Hunk::new(0, 0, "never"),
    ]);

    assert_eq!(
      edits.next(),
      Some(Err(PatchError::Index(LineIndexError::OffsetOutOfBounds {
        pos: 4,
        len: 3,
      })))
    );
    assert_eq!(edits.next(), None);
  }

  #[test]
  fn overlapping_and_inverted_hunks() {
    let rope = Rope::from("abc\ndef");
    let result: Result<Vec<_>> = translate(LinearLineIndex::new(rope.slice(..)), vec![
      Hunk::new(1, 5, "x"),
      Hunk::new(4, 6, "y"),
    ])
    .collect();
    assert_eq!(
      result,
      Err(PatchError::Overlap {
        prev_end: 5,
        start:    4,
        end:      6,
      })
    );

    let result: Result<Vec<_>> =
      translate(EagerLineIndex::new(rope.slice(..)), vec![Hunk::new(3, 2, "")]).collect();
    assert_eq!(result, Err(PatchError::InvalidRange { start: 3, end: 2 }));
  }

  #[test]
  fn ranges_span_the_replaced_text() {
    let old = "fn main() {\r\n    let x = 1;\n}\n\ntrailing";
    let rope = Rope::from(old);
    let hunks = vec![
      Hunk::new(3, 7, "start"),
      Hunk::new(11, 20, ""),
      Hunk::new(29, 31, "\n"),
      Hunk::new(33, 33, "…"),
    ];

    for config in configs() {
      let edits = translate_patch(rope.slice(..), hunks.clone(), &config).unwrap();
      for (edit, hunk) in edits.iter().zip(&hunks) {
        let replaced = rope.slice(hunk.start..hunk.end).to_string();
        assert_eq!(edit.start.traverse(&replaced), edit.end, "{config:?}");
        assert_eq!(edit.replaced_len, replaced.chars().count());
      }
    }
  }

  quickcheck::quickcheck! {
      fn lines_never_move_back(a: String, b: String) -> bool {
          let old = Rope::from(a.as_str());
          let hunks = compare(&old, &Rope::from(b.as_str()));
          configs().into_iter().all(|config| {
              let edits = translate_patch(old.slice(..), hunks.clone(), &config).unwrap();
              edits
                .iter()
                .all(|edit| edit.end.line >= edit.start.line && edit.start <= edit.end)
                && edits.windows(2).all(|pair| {
                    pair[1].start.line >= pair[0].end.line && pair[1].start >= pair[0].end
                })
          })
      }
  }
}
