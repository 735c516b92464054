//! Atomic batches of edits against a [`Rope`].
//!
//! A buffer commits a whole patch through one [`Transaction`]. The batch is
//! lowered to a [`ChangeSet`], a list of [`Operation`]s walked once from the
//! start of the document:
//!
//! - **Retain(n)** - Keep `n` characters unchanged
//! - **Delete(n)** - Remove `n` characters
//! - **Insert(s)** - Insert string `s`
//!
//! A changeset only applies to a document of the length it was built for.
//!
//! A [`Transaction`] is built from edits that all refer to the document as it
//! was *before* the transaction, either as flat char ranges
//! ([`Transaction::change`]) or as line/column ranges
//! ([`Transaction::from_edits`]). Building validates every edit, so applying a
//! transaction either changes the whole document or fails up front with the
//! document untouched.
//!
//! ```ignore
//! use ropey::Rope;
//! use the_lib::transaction::Transaction;
//!
//! let doc = Rope::from("hello world");
//!
//! // Replace "world" with "rust"
//! let tx = Transaction::change(&doc, vec![
//!     (6, 11, Some("rust".into()))
//! ]).unwrap();
//!
//! let doc = tx.apply_to(&doc).unwrap();
//! assert_eq!(doc.to_string(), "hello rust");
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, TransactionError>`]:
//!
//! - **LengthMismatch** - Document length doesn't match changeset expectation
//! - **InvalidRange** - Change range has start > end
//! - **RangeOutOfBounds** - Change range extends past document end
//! - **OverlappingRange** - Changes overlap
//! - **InvalidPosition** - A line/column position does not exist in the
//!   document

use ropey::{
  Rope,
  RopeBuilder,
  RopeSlice,
};
use thiserror::Error;

use crate::{
  Tendril,
  patch::EditRange,
  position::{
    Position,
    char_idx_at_position,
  },
};

pub type Result<T> = std::result::Result<T, TransactionError>;

/// (from, to) replacement.
pub type Change = (usize, usize, Option<Tendril>);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransactionError {
  #[error("changeset length mismatch: expected {expected}, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("invalid change range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("change range {from}..{to} is out of bounds for document length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("change range {from}..{to} overlaps previous end {prev_end}")]
  OverlappingRange {
    prev_end: usize,
    from:     usize,
    to:       usize,
  },
  #[error("position {position} does not exist in the document")]
  InvalidPosition { position: Position },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  /// Move cursor by n characters.
  Retain(usize),

  /// Delete n characters.
  Delete(usize),

  /// Insert text at position.
  Insert(Tendril),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
  pub(crate) changes: Vec<Operation>,
  /// The required document length. Will refuse to apply changes unless it
  /// matches.
  len:                usize,
}

impl ChangeSet {
  fn with_capacity(capacity: usize) -> Self {
    Self {
      changes: Vec::with_capacity(capacity),
      len:     0,
    }
  }

  #[must_use]
  pub fn new(doc: RopeSlice) -> Self {
    Self {
      changes: Vec::new(),
      len:     doc.len_chars(),
    }
  }

  pub fn changes(&self) -> &[Operation] {
    &self.changes
  }

  /// Returns the expected document length for this changeset
  pub fn len(&self) -> usize {
    self.len
  }

  // Changeset builder operations: delete/insert/retain.
  //

  pub fn delete(&mut self, n: usize) {
    use Operation::*;

    if n == 0 {
      return;
    }

    self.len += n;

    if let Some(Delete(count)) = self.changes.last_mut() {
      *count += n;
    } else {
      self.changes.push(Delete(n))
    }
  }

  pub fn insert(&mut self, fragment: Tendril) {
    use Operation::*;

    if fragment.is_empty() {
      return;
    }

    let new_last = match self.changes.as_mut_slice() {
      [.., Insert(prev)] | [.., Insert(prev), Delete(_)] => {
        prev.push_str(&fragment);
        return;
      },
      [.., last @ Delete(_)] => std::mem::replace(last, Insert(fragment)),
      _ => Insert(fragment),
    };

    self.changes.push(new_last);
  }

  pub fn retain(&mut self, n: usize) {
    use Operation::*;

    if n == 0 {
      return;
    }

    self.len += n;

    if let Some(Retain(count)) = self.changes.last_mut() {
      *count += n;
    } else {
      self.changes.push(Retain(n))
    }
  }

  fn ensure_len(&self, text_len: usize) -> Result<()> {
    if text_len != self.len {
      return Err(TransactionError::LengthMismatch {
        expected: self.len,
        actual:   text_len,
      });
    }
    Ok(())
  }

  /// Apply this changeset to a rope and return the updated rope.
  pub fn apply_to(&self, text: &Rope) -> Result<Rope> {
    self.ensure_len(text.len_chars())?;
    if self.is_empty() {
      return Ok(text.clone());
    }

    let mut builder = RopeBuilder::new();
    let mut pos = 0;

    let append_slice = |from: usize, to: usize, builder: &mut RopeBuilder| {
      if from >= to {
        return;
      }
      let slice = text.slice(from..to);
      for chunk in slice.chunks() {
        builder.append(chunk);
      }
    };

    for change in &self.changes {
      use Operation::*;
      match change {
        Retain(n) => {
          append_slice(pos, pos + *n, &mut builder);
          pos += n;
        },
        Delete(n) => {
          pos += n;
        },
        Insert(s) => {
          builder.append(s.as_str());
        },
      }
    }

    append_slice(pos, self.len, &mut builder);

    Ok(builder.finish())
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.changes.is_empty() || self.changes == [Operation::Retain(self.len)]
  }
}

fn validate_change_bounds(from: usize, to: usize, len: usize) -> Result<()> {
  if from > to {
    return Err(TransactionError::InvalidRange { from, to });
  }
  if to > len {
    return Err(TransactionError::RangeOutOfBounds { from, to, len });
  }
  Ok(())
}

impl From<ChangeSet> for Transaction {
  fn from(changes: ChangeSet) -> Self {
    Self { changes }
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transaction {
  changes: ChangeSet,
}

impl Transaction {
  pub fn new(doc: &Rope) -> Self {
    Self {
      changes: ChangeSet::new(doc.slice(..)),
    }
  }

  /// Changes made to the buffer.
  pub fn changes(&self) -> &ChangeSet {
    &self.changes
  }

  /// Apply this transaction to a rope and return the updated rope.
  pub fn apply_to(&self, doc: &Rope) -> Result<Rope> {
    self.changes.apply_to(doc)
  }

  /// Generate a transaction from a set of sorted, non-overlapping changes.
  pub fn change<I>(doc: &Rope, changes: I) -> Result<Self>
  where
    I: IntoIterator<Item = Change>,
  {
    let len = doc.len_chars();
    let changes = changes.into_iter();
    let (lower, upper) = changes.size_hint();
    let size = upper.unwrap_or(lower);
    let mut changeset = ChangeSet::with_capacity(2 * size + 1); // rough estimate

    let mut last = 0;
    for (from, to, tendril) in changes {
      validate_change_bounds(from, to, len)?;
      if from < last {
        return Err(TransactionError::OverlappingRange {
          prev_end: last,
          from,
          to,
        });
      }

      // Retain from last "to" to current "from"
      changeset.retain(from - last);
      let span = to - from;
      match tendril {
        Some(text) => {
          changeset.insert(text);
          changeset.delete(span);
        },
        None => changeset.delete(span),
      }
      last = to;
    }

    changeset.retain(len - last);

    Ok(Self::from(changeset))
  }

  /// Generate a transaction from line/column edits.
  ///
  /// Every position refers to `doc` as it is before any of the edits, so the
  /// edits may come in any order. They must not overlap; two insertions at the
  /// same position count as overlapping since their order would matter.
  pub fn from_edits<'a, I>(doc: &Rope, edits: I) -> Result<Self>
  where
    I: IntoIterator<Item = &'a EditRange>,
  {
    let text = doc.slice(..);
    let char_idx = |position: Position| {
      char_idx_at_position(text, position).ok_or(TransactionError::InvalidPosition { position })
    };

    let mut changes = edits
      .into_iter()
      .map(|edit| {
        Ok((
          char_idx(edit.start)?,
          char_idx(edit.end)?,
          Some(edit.text.clone()),
        ))
      })
      .collect::<Result<Vec<Change>>>()?;
    changes.sort_by_key(|(from, to, _)| (*from, *to));

    for pair in changes.windows(2) {
      let (prev_from, prev_to, _) = pair[0];
      let (from, to, _) = pair[1];
      if prev_from == prev_to && from == to && from == prev_to {
        return Err(TransactionError::OverlappingRange {
          prev_end: prev_to,
          from,
          to,
        });
      }
    }

    Self::change(doc, changes)
  }
}
