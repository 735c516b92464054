//! Text buffers that accept line/column edit batches.
//!
//! [`TextBuffer`] is the host side of a patch: it hands out [`Snapshot`]s and
//! commits a batch of [`EditRange`]s computed against one of them, all or
//! nothing. [`DocumentHandle`] is the in-memory host. [`apply`] and
//! [`replace_text`] drive a buffer from translated patches.

use async_trait::async_trait;
use ropey::Rope;
use the_lib::patch::EditRange;
use thiserror::Error;

pub mod document;
mod handle;
mod sync;

pub use handle::DocumentHandle;
pub use sync::{
  ApplyError,
  Config,
  SyncError,
  SyncReport,
  apply,
  replace_text,
};

use crate::document::DocumentError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BufferError {
  #[error(transparent)]
  Document(#[from] DocumentError),
  #[error("buffer task is gone")]
  Disconnected,
}

pub type Result<T> = std::result::Result<T, BufferError>;

/// The text of a buffer at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
  pub text:    Rope,
  pub version: u64,
}

#[async_trait]
pub trait TextBuffer: Send + Sync {
  async fn snapshot(&self) -> Result<Snapshot>;

  /// Commits `edits` as a single transaction.
  ///
  /// Every position refers to the text at `version`. Fails without changing
  /// anything if the buffer is no longer at `version` or any edit is invalid.
  /// Returns the version after the commit.
  async fn edit(&self, version: u64, edits: Vec<EditRange>) -> Result<u64>;

  async fn text(&self) -> Result<Rope> {
    Ok(self.snapshot().await?.text)
  }
}
