use std::time::Instant;

use ropey::Rope;
use serde::Deserialize;
use the_lib::{
  diff::{
    DiffOptions,
    compare_with_options,
  },
  line_index::IndexConfig,
  patch::{
    EditRange,
    PatchError,
    translate_patch,
  },
  position::Position,
};
use thiserror::Error;

use crate::{
  BufferError,
  Snapshot,
  TextBuffer,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApplyError {
  #[error("edit {start}..{end} overlaps an edit ending at {prev_end}")]
  Overlap {
    prev_end: Position,
    start:    Position,
    end:      Position,
  },
}

/// Applies `edits` to `buffer` as one transaction.
///
/// Positions refer to `snapshot`, the buffer's text before any of the edits.
/// Overlapping edits are an error and nothing is submitted. Returns `Ok(false)`
/// if the buffer rejects the batch, for example because it changed since
/// `snapshot` was taken; the caller decides whether to start over.
pub async fn apply<B, I>(buffer: &B, snapshot: &Snapshot, edits: I) -> Result<bool, ApplyError>
where
  B: TextBuffer + ?Sized,
  I: IntoIterator<Item = EditRange>,
{
  let edits: Vec<_> = edits.into_iter().collect();
  ensure_disjoint(&edits)?;

  let count = edits.len();
  match buffer.edit(snapshot.version, edits).await {
    Ok(version) => {
      log::debug!(
        "committed {count} edits against version {}, buffer at {version}",
        snapshot.version
      );
      Ok(true)
    },
    Err(err) => {
      log::warn!("transaction of {count} edits rejected: {err}");
      Ok(false)
    },
  }
}

fn ensure_disjoint(edits: &[EditRange]) -> Result<(), ApplyError> {
  let mut ranges: Vec<_> = edits.iter().map(|edit| (edit.start, edit.end)).collect();
  ranges.sort_unstable();

  let mut prev: Option<(Position, Position)> = None;
  for (start, end) in ranges {
    if let Some((prev_start, prev_end)) = prev {
      // two inserts at one position have no defined order
      let same_insert = prev_start == prev_end && start == end && start == prev_end;
      if start < prev_end || same_insert {
        return Err(ApplyError::Overlap {
          prev_end,
          start,
          end,
        });
      }
    }
    prev = Some((start, end));
  }
  Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub index: IndexConfig,
  pub diff:  DiffOptions,
}

#[derive(Debug, Error)]
pub enum SyncError {
  #[error(transparent)]
  Buffer(#[from] BufferError),
  #[error(transparent)]
  Patch(#[from] PatchError),
  #[error(transparent)]
  Apply(#[from] ApplyError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
  pub edits:   Vec<EditRange>,
  pub applied: bool,
}

/// Makes the buffer's text equal to `new_text` with a minimal set of edits.
pub async fn replace_text<B>(
  buffer: &B,
  new_text: &Rope,
  config: &Config,
) -> Result<SyncReport, SyncError>
where
  B: TextBuffer + ?Sized,
{
  let snapshot = buffer.snapshot().await?;

  let start = Instant::now();
  let hunks = compare_with_options(&snapshot.text, new_text, &config.diff);
  let hunk_count = hunks.len();
  let edits = translate_patch(snapshot.text.slice(..), hunks, &config.index)?;
  log::debug!(
    "translated {hunk_count} hunks with the {:?} index in {}s",
    config.index.strategy,
    start.elapsed().as_secs_f64()
  );

  let applied = apply(buffer, &snapshot, edits.clone()).await?;
  Ok(SyncReport { edits, applied })
}

#[cfg(test)]
mod tests {
  use the_lib::{
    line_index::IndexStrategy,
    patch::Hunk,
  };

  use super::*;
  use crate::DocumentHandle;

  fn edit(start: (usize, usize), end: (usize, usize), text: &str) -> EditRange {
    EditRange {
      start:        start.into(),
      end:          end.into(),
      text:         text.into(),
      replaced_len: 0,
    }
  }

  async fn sync(old: &str, new: &str) -> (SyncReport, Rope) {
    let doc = DocumentHandle::open(Rope::from(old));
    let report = replace_text(&doc, &Rope::from(new), &Config::default())
      .await
      .unwrap();
    (report, doc.text().await.unwrap())
  }

  #[tokio::test]
  async fn insertion_at_end_of_text() {
    let (report, text) = sync("a\nb", "a\nb\nc").await;
    assert!(report.applied);
    assert_eq!(report.edits, vec![EditRange {
      start:        Position::new(1, 1),
      end:          Position::new(1, 1),
      text:         "\nc".into(),
      replaced_len: 0,
    }]);
    assert_eq!(text, Rope::from("a\nb\nc"));
  }

  #[tokio::test]
  async fn deletion_across_line_break() {
    let old = Rope::from("foo\nbar");
    assert_eq!(
      compare_with_options(&old, &Rope::from("fr"), &DiffOptions::default()),
      vec![Hunk::new(1, 6, "")]
    );

    let (report, text) = sync("foo\nbar", "fr").await;
    assert!(report.applied);
    assert_eq!(report.edits, vec![EditRange {
      start:        Position::new(0, 1),
      end:          Position::new(1, 2),
      text:         "".into(),
      replaced_len: 5,
    }]);
    assert_eq!(text, Rope::from("fr"));
  }

  #[tokio::test]
  async fn replacement_within_a_line() {
    let (report, text) = sync("line1\nline2\nline3", "line1\nLINE2\nline3").await;
    assert!(report.applied);
    assert!(!report.edits.is_empty());
    for edit in &report.edits {
      assert_eq!(edit.start.line, 1);
      assert_eq!(edit.end.line, 1);
      assert!(edit.end.col <= 5);
    }
    assert_eq!(text, Rope::from("line1\nLINE2\nline3"));
  }

  #[tokio::test]
  async fn no_op_patch() {
    let doc = DocumentHandle::open(Rope::from("same\ntext\n"));
    let report = replace_text(&doc, &Rope::from("same\ntext\n"), &Config::default())
      .await
      .unwrap();
    assert!(report.applied);
    assert!(report.edits.is_empty());

    let snapshot = doc.snapshot().await.unwrap();
    assert_eq!(snapshot.text, Rope::from("same\ntext\n"));
    assert_eq!(snapshot.version, 0);
  }

  #[tokio::test]
  async fn edits_apply_against_original_positions() {
    let doc = DocumentHandle::open(Rope::from("one\ntwo\nthree"));
    let snapshot = doc.snapshot().await.unwrap();
    // deliberately out of order, every position is in the snapshot's text
    let edits = vec![
      edit((2, 0), (2, 5), "3"),
      edit((0, 0), (0, 3), "1"),
      edit((1, 3), (2, 0), " "),
    ];
    assert!(apply(&doc, &snapshot, edits).await.unwrap());
    assert_eq!(doc.text().await.unwrap(), Rope::from("1\ntwo 3"));
  }

  #[tokio::test]
  async fn stale_snapshot_is_rejected() {
    let doc = DocumentHandle::open(Rope::from("abc"));
    let snapshot = doc.snapshot().await.unwrap();

    let other = doc.clone();
    other
      .edit(snapshot.version, vec![edit((0, 3), (0, 3), "!")])
      .await
      .unwrap();

    let applied = apply(&doc, &snapshot, vec![edit((0, 0), (0, 1), "A")])
      .await
      .unwrap();
    assert!(!applied);
    assert_eq!(doc.text().await.unwrap(), Rope::from("abc!"));
  }

  #[tokio::test]
  async fn closed_buffer_is_rejected() {
    let doc = DocumentHandle::open(Rope::from("abc"));
    let snapshot = doc.snapshot().await.unwrap();
    doc.close().await.unwrap();

    let applied = apply(&doc, &snapshot, vec![edit((0, 0), (0, 0), "x")])
      .await
      .unwrap();
    assert!(!applied);

    let err = replace_text(&doc, &Rope::from("xyz"), &Config::default())
      .await
      .unwrap_err();
    assert!(matches!(err, SyncError::Buffer(_)));
  }

  #[tokio::test]
  async fn overlapping_edits_fail_fast() {
    let doc = DocumentHandle::open(Rope::from("abc\ndef"));
    let snapshot = doc.snapshot().await.unwrap();

    let err = apply(&doc, &snapshot, vec![
      edit((1, 0), (1, 2), "x"),
      edit((0, 1), (1, 1), "y"),
    ])
    .await
    .unwrap_err();
    assert_eq!(err, ApplyError::Overlap {
      prev_end: Position::new(1, 1),
      start:    Position::new(1, 0),
      end:      Position::new(1, 2),
    });

    let err = apply(&doc, &snapshot, vec![
      edit((0, 2), (0, 2), "x"),
      edit((0, 2), (0, 2), "y"),
    ])
    .await
    .unwrap_err();
    assert!(matches!(err, ApplyError::Overlap { .. }));

    // nothing was submitted
    assert_eq!(doc.snapshot().await.unwrap(), snapshot);
  }

  #[tokio::test]
  async fn every_strategy_syncs() {
    for strategy in [IndexStrategy::Eager, IndexStrategy::Linear, IndexStrategy::Lazy] {
      let config = Config {
        index: IndexConfig {
          strategy,
          ..IndexConfig::default()
        },
        ..Config::default()
      };
      let doc = DocumentHandle::open(Rope::from("fn main() {\r\n  let x = 1;\n}\n"));
      let new = Rope::from("fn main() {\r\n  let y = 2;\n  dbg!(y);\n}\n");
      let report = replace_text(&doc, &new, &config).await.unwrap();
      assert!(report.applied, "{strategy:?}");
      assert_eq!(doc.text().await.unwrap(), new, "{strategy:?}");
    }
  }

  #[test]
  fn config_from_toml() {
    let config: Config = toml::from_str(
      r#"
      [index]
      strategy = "eager"

      [diff]
      max-char-diff-ratio = 3
      "#,
    )
    .unwrap();
    assert_eq!(config.index.strategy, IndexStrategy::Eager);
    assert_eq!(config.index.bias, IndexConfig::default().bias);
    assert_eq!(config.diff.max_char_diff_ratio, 3);

    assert_eq!(toml::from_str::<Config>("").unwrap(), Config::default());
    assert!(toml::from_str::<Config>("[render]").is_err());
  }

  quickcheck::quickcheck! {
      fn replace_text_round_trips(a: String, b: String) -> bool {
          let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
          runtime.block_on(async {
              let doc = DocumentHandle::open(Rope::from(a.as_str()));
              let new = Rope::from(b.as_str());
              let report = replace_text(&doc, &new, &Config::default()).await.unwrap();
              report.applied && doc.text().await.unwrap() == new
          })
      }
  }
}
