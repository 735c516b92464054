//! Benchmarks for patch translation in the-lib.
//!
//! Run with: `cargo bench -p the-lib --bench line_index`

use divan::{
  Bencher,
  black_box,
};
use ropey::Rope;
use the_lib::{
  line_index::{
    IndexConfig,
    IndexStrategy,
  },
  patch::{
    Hunk,
    translate_patch,
  },
  transaction::Transaction,
};

fn main() {
  divan::main();
}

const STRATEGIES: [IndexStrategy; 3] =
  [IndexStrategy::Eager, IndexStrategy::Linear, IndexStrategy::Lazy];

fn make_text(lines: usize) -> Rope {
  let line = "The quick brown fox jumps over the lazy dog.\n";
  let mut s = String::with_capacity(lines * line.len());
  for _ in 0..lines {
    s.push_str(line);
  }
  Rope::from_str(&s)
}

/// `count` evenly spread replacements of `span` chars.
fn make_hunks(len: usize, count: usize, span: usize) -> Vec<Hunk> {
  let step = len / (count + 1);
  (0..count)
    .map(|i| {
      let start = (i + 1) * step;
      Hunk::new(start, (start + span).min(len), "xyz")
    })
    .collect()
}

mod translate {
  use super::*;

  const LINES: usize = 20_000;

  #[divan::bench(args = STRATEGIES)]
  fn sparse(bencher: Bencher, strategy: IndexStrategy) {
    let doc = make_text(LINES);
    let hunks = make_hunks(doc.len_chars(), 8, 3);
    let config = IndexConfig {
      strategy,
      ..IndexConfig::default()
    };

    bencher.bench(|| {
      let edits = translate_patch(doc.slice(..), black_box(hunks.clone()), &config).unwrap();
      black_box(edits);
    });
  }

  #[divan::bench(args = STRATEGIES)]
  fn dense(bencher: Bencher, strategy: IndexStrategy) {
    let doc = make_text(LINES);
    let hunks = make_hunks(doc.len_chars(), 4096, 3);
    let config = IndexConfig {
      strategy,
      ..IndexConfig::default()
    };

    bencher.bench(|| {
      let edits = translate_patch(doc.slice(..), black_box(hunks.clone()), &config).unwrap();
      black_box(edits);
    });
  }

  #[divan::bench(args = [2, 4, 16])]
  fn lazy_bias(bencher: Bencher, bias: usize) {
    let doc = make_text(LINES);
    let hunks = make_hunks(doc.len_chars(), 64, 3);
    let config = IndexConfig {
      strategy: IndexStrategy::Lazy,
      bias,
    };

    bencher.bench(|| {
      let edits = translate_patch(doc.slice(..), black_box(hunks.clone()), &config).unwrap();
      black_box(edits);
    });
  }
}

mod apply {
  use super::*;

  #[divan::bench(args = [8, 64, 512])]
  fn from_edits(bencher: Bencher, count: usize) {
    let doc = make_text(2_000);
    let hunks = make_hunks(doc.len_chars(), count, 3);
    let edits = translate_patch(doc.slice(..), hunks, &IndexConfig::default()).unwrap();

    bencher.bench(|| {
      let next = Transaction::from_edits(black_box(&doc), &edits)
        .unwrap()
        .apply_to(&doc)
        .unwrap();
      black_box(next);
    });
  }
}
