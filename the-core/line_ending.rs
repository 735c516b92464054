use std::borrow::Cow;

use ropey::{
  Rope,
  RopeSlice,
};

/// The only char that ends a line. A carriage return in front of it belongs to
/// the content of the line it terminates.
pub const LINE_DELIMITER: char = '\n';

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LineEnding {
  /// CarriageReturn followed by LineFeed.
  Crlf,

  /// U+000A -- LineFeed
  LF,
}

impl std::fmt::Display for LineEnding {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::Crlf => "CRLF",
      Self::LF => "LF",
    })
  }
}

/// The ending of the first terminated line among the first 100 lines of `doc`.
pub fn auto_detect_line_ending(doc: &Rope) -> Option<LineEnding> {
  doc.lines().take(100).find_map(|line| {
    let len = line.len_chars();
    if len == 0 || line.char(len - 1) != LINE_DELIMITER {
      None
    } else if len >= 2 && line.char(len - 2) == '\r' {
      Some(LineEnding::Crlf)
    } else {
      Some(LineEnding::LF)
    }
  })
}

/// Rewrites every CRLF pair as a bare LF. Text without CRLF is borrowed as is.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
  if text.contains("\r\n") {
    Cow::Owned(text.replace("\r\n", "\n"))
  } else {
    Cow::Borrowed(text)
  }
}

/// Number of chars on `line` excluding the terminating LF. A CR in front of the
/// LF is counted.
pub fn line_content_len(slice: &RopeSlice, line: usize) -> usize {
  let line = slice.line(line);
  let len = line.len_chars();
  if len > 0 && line.char(len - 1) == LINE_DELIMITER {
    len - 1
  } else {
    len
  }
}
