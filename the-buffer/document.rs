//! Versioned document state.
//!
//! A [`Document`] owns its text and a version counter. Edits are submitted as
//! a whole batch together with the version they were computed against; a
//! batch against any other version is refused, as is every batch once the
//! document is closed.
//!
//! ```no_run
//! use ropey::Rope;
//! use the_buffer::document::Document;
//!
//! let mut doc = Document::new(Rope::from("hello"));
//! let version = doc.version();
//! doc.edit(version, &[]).unwrap();
//! ```

use ropey::Rope;
use the_lib::{
  patch::EditRange,
  transaction::{
    Transaction,
    TransactionError,
  },
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
  #[error("document is closed")]
  Closed,
  #[error("document changed: edit is for version {expected}, document is at {actual}")]
  VersionMismatch { expected: u64, actual: u64 },
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Clone)]
pub struct Document {
  text:    Rope,
  version: u64,
  closed:  bool,
}

impl Document {
  pub fn new(text: Rope) -> Self {
    Self {
      text,
      version: 0,
      closed: false,
    }
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }

  pub fn close(&mut self) {
    self.closed = true;
  }

  pub fn apply_transaction(&mut self, transaction: &Transaction) -> Result<()> {
    if self.closed {
      return Err(DocumentError::Closed);
    }

    self.text = transaction.apply_to(&self.text)?;

    if !transaction.changes().is_empty() {
      self.version = self.version.saturating_add(1);
    }

    Ok(())
  }

  /// Applies `edits` as one transaction and returns the new version.
  ///
  /// All positions refer to the text at `version`. Nothing changes unless
  /// every edit is valid.
  pub fn edit(&mut self, version: u64, edits: &[EditRange]) -> Result<u64> {
    if self.closed {
      return Err(DocumentError::Closed);
    }
    if version != self.version {
      return Err(DocumentError::VersionMismatch {
        expected: version,
        actual:   self.version,
      });
    }

    let transaction = Transaction::from_edits(&self.text, edits)?;
    self.apply_transaction(&transaction)?;

    log::debug!(
      "applied {} edits, document at version {}",
      edits.len(),
      self.version
    );
    Ok(self.version)
  }
}
