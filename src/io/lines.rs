//! Logical-line reading for the Ra format: backslash continuation and
//! `#` comment stripping with `\#` escapes.

use std::io::{self, BufRead};

/// Reads *logical* lines from a buffered reader, joining physical lines that
/// end in an unescaped backslash.
///
/// Each physical line has its surrounding whitespace stripped before joining,
/// so the leading whitespace of a continuation line disappears:
///
/// ```
/// use rafile::io::LineReader;
/// use std::io::Cursor;
///
/// let mut reader = LineReader::new(Cursor::new("path /a/b\\\n  /c\n"));
/// let line = reader.read_logical_line().unwrap().unwrap();
/// assert_eq!(line, "path /a/b/c");
/// ```
///
/// The indent-keeping variant used for hierarchical stanza files preserves the
/// left edge of the first physical line, since nesting depth is derived from it.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    keep_indent: bool,
}

impl<R: BufRead> LineReader<R> {
    /// Create a reader that strips surrounding whitespace from every line.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            keep_indent: false,
        }
    }

    /// Create a reader that keeps the leading whitespace of each logical
    /// line's first physical line.
    pub fn new_keep_indent(inner: R) -> Self {
        Self {
            inner,
            keep_indent: true,
        }
    }

    /// Read one logical line, or `None` at end of stream.
    ///
    /// A trailing backslash is removed at each join. A backslash is a
    /// continuation only if it is unescaped, i.e. ends an odd-length run of
    /// backslashes. End of stream in the middle of a continuation yields the
    /// text accumulated so far.
    pub fn read_logical_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let mut first = true;

        loop {
            let mut raw = String::new();
            if self.inner.read_line(&mut raw)? == 0 {
                if first {
                    return Ok(None);
                }
                break;
            }
            let piece = if self.keep_indent && first {
                raw.trim_end()
            } else {
                raw.trim()
            };
            line.push_str(piece);
            first = false;

            if ends_in_continuation(&line) {
                line.pop();
                continue;
            }
            break;
        }
        Ok(Some(line))
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_logical_line().transpose()
    }
}

/// A trailing backslash marks a continuation only when unescaped: an even run
/// of backslashes is literal backslashes.
fn ends_in_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Strip the trailing comment from a line.
///
/// Scans left to right for the first unescaped `#`; everything from there to
/// the end of the line is discarded. An escaped marker `\#` is unescaped to a
/// literal `#`, consuming the backslash. A line starting with `#` yields the
/// empty string. This cannot fail: stray backslashes are kept as literal text.
pub fn strip_comments(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'#') {
            out.push('#');
            chars.next();
        } else if c == '#' {
            break;
        } else {
            out.push(c);
        }
    }
    out
}
