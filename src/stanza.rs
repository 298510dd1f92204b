//! The [`RaStanza`] type: one ordered, named block of a Ra file.
//!
//! A stanza is an ordered sequence of [`Entry`] items: comment lines carried
//! through verbatim for round-trip output, and unique key/value pairs. The
//! stanza's *name* is the value of its first key/value line (or of the line
//! matching a caller-supplied designator key), and the key that produced the
//! name is kept as the *name field* so a collection can check that all of its
//! stanzas agree on it.

use indexmap::IndexMap;
use std::fmt;

use crate::error::RaError;
use crate::io::strip_comments;

/// One entry in a stanza (or at the top level of a file): either text carried
/// through verbatim for round-trip fidelity, or a key/value pair.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    /// A comment or blank line, stored verbatim; never participates in key
    /// lookup.
    Passthrough(String),
    /// A key (unique within its container) and its value (possibly empty).
    KeyValue { key: String, value: String },
}

/// One stanza: ordered entries, a unique-key index, and a derived name.
///
/// The `parent` back-reference is an index into the owning [`RaFile`]'s stanza
/// arena, set only when parsing hierarchical files. It is non-owning and is
/// only used to resolve inherited defaults at parse time.
///
/// [`RaFile`]: crate::rafile::RaFile
#[derive(Clone, Debug, Default)]
pub struct RaStanza {
    entries: Vec<Entry>,
    by_key: IndexMap<String, usize>,
    name: String,
    name_field: String,
    parent: Option<usize>,
}

impl PartialEq for RaStanza {
    /// Structural equality: same ordered entries, name, and name field.
    /// The parent back-reference is not part of a stanza's identity.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
            && self.name == other.name
            && self.name_field == other.name_field
    }
}

impl RaStanza {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stanza from its name line, e.g. `with_name("track", "wgEncodeCshlShortRnaSeq")`.
    pub fn with_name(field: impl Into<String>, value: impl Into<String>) -> Self {
        let field = field.into();
        let value = value.into();
        let mut stanza = Self {
            name: value.clone(),
            name_field: field.clone(),
            ..Self::default()
        };
        // the name line is the first entry; a fresh stanza cannot collide
        stanza.insert(field, value).unwrap();
        stanza
    }

    /// Parse one stanza from the logical lines of a block.
    ///
    /// Lines starting with `#` become [`Entry::Passthrough`]; every other line
    /// is comment-stripped and split at its first whitespace run into a
    /// key/value pair (the value may be empty). A duplicate key within the
    /// block is a [`RaError::DuplicateKey`].
    ///
    /// With `designator = None` the first key/value line supplies the name
    /// field and name. With `Some(key)`, the first line whose key matches
    /// supplies them; if no line matches, the block produces no stanza and
    /// `Ok(None)` is returned so the caller can filter it out.
    pub fn parse(lines: &[String], designator: Option<&str>) -> Result<Option<Self>, RaError> {
        let mut stanza = Self::new();

        for line in lines {
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                stanza.entries.push(Entry::Passthrough(trimmed.to_string()));
                continue;
            }
            let stripped = strip_comments(trimmed);
            let stripped = stripped.trim();
            if stripped.is_empty() {
                continue;
            }
            // a line reduced by unescaping to a leading '#' reads as a comment
            if stripped.starts_with('#') {
                stanza.entries.push(Entry::Passthrough(stripped.to_string()));
                continue;
            }
            let (key, value) = split_key_value(stripped);
            stanza.insert(key, value)?;
        }

        match designator {
            None => {
                let first = stanza.entries.iter().find_map(|entry| match entry {
                    Entry::KeyValue { key, value } => Some((key.clone(), value.clone())),
                    Entry::Passthrough(_) => None,
                });
                match first {
                    Some((field, value)) if value.is_empty() => {
                        return Err(RaError::MissingNameValue(field));
                    }
                    Some((field, value)) => {
                        stanza.name_field = field;
                        stanza.name = value;
                    }
                    None => return Err(RaError::EmptyStanza),
                }
            }
            Some(key) => match stanza.get(key).map(str::to_string) {
                None => return Ok(None),
                Some(value) if value.is_empty() => {
                    return Err(RaError::MissingNameValue(key.to_string()));
                }
                Some(value) => {
                    stanza.name_field = key.to_string();
                    stanza.name = value;
                }
            },
        }

        Ok(Some(stanza))
    }

    /// The stanza's name: the value of its name line.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key that produced the name.
    pub fn name_field(&self) -> &str {
        &self.name_field
    }

    /// The parent stanza's arena index, if this stanza was parsed from a
    /// hierarchical file at depth > 0.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: usize) {
        self.parent = Some(parent);
    }

    pub(crate) fn clear_parent(&mut self) {
        self.parent = None;
    }

    /// Get a key's value, or `None` if the key is absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(|i| match &self.entries[*i] {
            Entry::KeyValue { value, .. } => value.as_str(),
            Entry::Passthrough(_) => unreachable!("key index points at passthrough entry"),
        })
    }

    /// Get a key's value, or a [`RaError::MissingField`] naming this stanza.
    ///
    /// This is the accessor to use inside [`RaFile::filter`] closures: the
    /// filter combinator converts `MissingField` into "exclude this stanza".
    ///
    /// [`RaFile::filter`]: crate::rafile::RaFile::filter
    pub fn try_get(&self, key: &str) -> Result<&str, RaError> {
        self.get(key)
            .ok_or_else(|| RaError::MissingField(self.name.clone(), key.to_string()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Append a new key/value pair; a duplicate key is an error.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), RaError> {
        let key = key.into();
        if self.by_key.contains_key(&key) {
            return Err(RaError::DuplicateKey(key));
        }
        self.by_key.insert(key.clone(), self.entries.len());
        self.entries.push(Entry::KeyValue {
            key,
            value: value.into(),
        });
        Ok(())
    }

    /// Set a key's value, overwriting in place if present, appending if not.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(i) = self.by_key.get(&key) {
            self.entries[*i] = Entry::KeyValue {
                key,
                value: value.into(),
            };
        } else {
            self.by_key.insert(key.clone(), self.entries.len());
            self.entries.push(Entry::KeyValue {
                key,
                value: value.into(),
            });
        }
    }

    /// Append a comment or blank line.
    pub fn push_passthrough(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Passthrough(text.into()));
    }

    /// The ordered entries, passthrough lines included.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Keys in entry order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }

    /// Key/value pairs in entry order, skipping passthrough lines.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::KeyValue { key, value } => Some((key.as_str(), value.as_str())),
            Entry::Passthrough(_) => None,
        })
    }

    /// The number of key/value pairs.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// The entries of `self` whose values differ from `other`'s entry for the
    /// same key. Keys absent from either stanza are skipped; run with the
    /// arguments swapped to get the other side's differences.
    pub fn difference(&self, other: &RaStanza) -> RaStanza {
        let mut out = RaStanza {
            name: self.name.clone(),
            name_field: self.name_field.clone(),
            ..RaStanza::default()
        };
        for (key, other_value) in other.iter_pairs() {
            if let Some(value) = self.get(key) {
                if value != other_value {
                    out.set(key, value);
                }
            }
        }
        out
    }
}

impl fmt::Display for RaStanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match entry {
                Entry::Passthrough(text) => writeln!(f, "{}", text)?,
                Entry::KeyValue { key, value } if value.is_empty() => writeln!(f, "{}", key)?,
                Entry::KeyValue { key, value } => writeln!(f, "{} {}", key, value)?,
            }
        }
        Ok(())
    }
}

/// Split a line at its first whitespace run; the value defaults to the empty
/// string for a single-token line.
pub(crate) fn split_key_value(line: &str) -> (String, String) {
    match line.split_once(char::is_whitespace) {
        Some((key, value)) => (key.to_string(), value.trim().to_string()),
        None => (line.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::RaStanza;
    use crate::error::RaError;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_basic() {
        let stanza = RaStanza::parse(&lines(&["name fooA", "version 1"]), None)
            .unwrap()
            .unwrap();
        assert_eq!(stanza.name(), "fooA");
        assert_eq!(stanza.name_field(), "name");
        assert_eq!(stanza.get("version"), Some("1"));
        assert_eq!(stanza.len(), 2);
        assert_eq!(stanza.keys().collect::<Vec<_>>(), vec!["name", "version"]);
        assert_eq!(
            stanza.iter_pairs().collect::<Vec<_>>(),
            vec![("name", "fooA"), ("version", "1")]
        );
    }

    #[test]
    fn test_parse_value_with_spaces() {
        let stanza = RaStanza::parse(&lines(&["track one", "longLabel Short RNA-seq from CSHL"]), None)
            .unwrap()
            .unwrap();
        assert_eq!(stanza.get("longLabel"), Some("Short RNA-seq from CSHL"));
    }

    #[test]
    fn test_parse_empty_value() {
        let stanza = RaStanza::parse(&lines(&["name fooA", "flagOnly"]), None)
            .unwrap()
            .unwrap();
        assert_eq!(stanza.get("flagOnly"), Some(""));
    }

    #[test]
    fn test_parse_missing_name_value() {
        let result = RaStanza::parse(&lines(&["name"]), None);
        assert!(matches!(result, Err(RaError::MissingNameValue(_))));
    }

    #[test]
    fn test_parse_duplicate_key() {
        let result = RaStanza::parse(&lines(&["name fooA", "version 1", "version 2"]), None);
        assert!(matches!(result, Err(RaError::DuplicateKey(key)) if key == "version"));
    }

    #[test]
    fn test_parse_interior_comment_is_passthrough() {
        let stanza = RaStanza::parse(&lines(&["name fooA", "# midway", "version 1"]), None)
            .unwrap()
            .unwrap();
        assert_eq!(stanza.len(), 2);
        assert_eq!(stanza.entries().len(), 3);
        assert_eq!(stanza.to_string(), "name fooA\n# midway\nversion 1\n");
    }

    #[test]
    fn test_parse_trailing_comment_stripped() {
        let stanza = RaStanza::parse(&lines(&["name fooA", "tool bwa # the aligner"]), None)
            .unwrap()
            .unwrap();
        assert_eq!(stanza.get("tool"), Some("bwa"));
    }

    #[test]
    fn test_parse_escaped_comment_marker() {
        let stanza = RaStanza::parse(&lines(&["name fooA", "key value1 \\# not a comment"]), None)
            .unwrap()
            .unwrap();
        assert_eq!(stanza.get("key"), Some("value1 # not a comment"));
    }

    #[test]
    fn test_designator_selects_name_line() {
        let block = lines(&["track fooA", "metaObject obj1", "version 1"]);
        let stanza = RaStanza::parse(&block, Some("metaObject")).unwrap().unwrap();
        assert_eq!(stanza.name(), "obj1");
        assert_eq!(stanza.name_field(), "metaObject");
    }

    #[test]
    fn test_designator_absent_filters_block_out() {
        let block = lines(&["track fooA", "version 1"]);
        assert!(RaStanza::parse(&block, Some("metaObject")).unwrap().is_none());
    }

    #[test]
    fn test_with_name_and_set() {
        let mut stanza = RaStanza::with_name("track", "fooA");
        stanza.set("grant", "Gingeras");
        stanza.set("grant", "Snyder");
        assert_eq!(stanza.name(), "fooA");
        assert_eq!(stanza.get("grant"), Some("Snyder"));
        assert_eq!(stanza.len(), 2);
        // overwriting keeps the original entry position
        assert_eq!(stanza.to_string(), "track fooA\ngrant Snyder\n");
    }

    #[test]
    fn test_insert_duplicate_errors() {
        let mut stanza = RaStanza::with_name("track", "fooA");
        assert!(stanza.insert("track", "again").is_err());
    }

    #[test]
    fn test_try_get_missing_field() {
        let stanza = RaStanza::with_name("track", "fooA");
        let err = stanza.try_get("cell").unwrap_err();
        assert!(matches!(err, RaError::MissingField(name, field)
            if name == "fooA" && field == "cell"));
    }

    #[test]
    fn test_difference() {
        let mut a = RaStanza::with_name("track", "fooA");
        a.set("cell", "K562");
        a.set("lab", "CSHL");
        let mut b = RaStanza::with_name("track", "fooA");
        b.set("cell", "GM12878");
        b.set("sex", "F");

        let diff = a.difference(&b);
        assert_eq!(diff.get("cell"), Some("K562"));
        // keys missing from either side are skipped
        assert_eq!(diff.get("lab"), None);
        assert_eq!(diff.get("sex"), None);
        assert_eq!(diff.name(), "fooA");
    }
}
