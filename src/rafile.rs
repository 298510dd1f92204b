//! The [`RaFile`] type: an ordered, round-trippable collection of stanzas.
//!
//! A Ra file is a sequence of stanzas separated by blank lines, with `#`
//! comments allowed anywhere. To load one, it is usually easiest to pass its
//! path:
//!
//! ```no_run
//! use rafile::prelude::*;
//!
//! let rafile = RaFile::read("metaDb.ra", None)?;
//! let stanza = rafile.get("wgEncodeCshlShortRnaSeq").unwrap();
//! let cell = stanza.get("cell");
//! # Ok::<(), RaError>(())
//! ```
//!
//! The collection is order preserving: stanzas and interleaved comments are
//! written back out in the order they were read, so a parse/serialize round
//! trip reproduces the file's structure. Inserted stanzas are appended at the
//! end.
//!
//! Rather than looping over [`RaFile::iter`] with conditionals, most querying
//! is best expressed with [`RaFile::filter`], which takes a `where` predicate
//! and a `select` closure. Field access inside either closure should go
//! through [`RaStanza::try_get`]; a missing field excludes that stanza rather
//! than failing the whole query:
//!
//! ```
//! use rafile::prelude::*;
//! use std::io::Cursor;
//!
//! let text = "track a\nexpId 123\nfileName a.fastq\n\ntrack b\nexpId 290\n";
//! let rafile = RaFile::from_reader(Cursor::new(text), None,
//!     DuplicateNamePolicy::Warn)?;
//! let fastqs = rafile.filter(
//!     |s| Ok(s.try_get("fileName")?.ends_with(".fastq")),
//!     |s| Ok(s.name().to_string()),
//! )?;
//! assert_eq!(fastqs, vec!["a".to_string()]);
//! # Ok::<(), RaError>(())
//! ```

use indexmap::IndexMap;
use lazy_static::lazy_static;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::RaError;
use crate::hierarchy::{block_depth, ScopeTracker};
use crate::io::{InputFile, LineReader, OutputFile};
use crate::stanza::RaStanza;

lazy_static! {
    /// The standard Ra format configuration.
    pub static ref RA_FORMAT: RaConfig = RaConfig {
        indent_unit: 3,
        sort_key_separator: ' ',
    };
}

/// Format-level constants shared by parsing and indexing.
pub struct RaConfig {
    /// Leading space characters per nesting level in hierarchical files.
    pub indent_unit: usize,
    /// Separator joining the fields of an index comparison key.
    pub sort_key_separator: char,
}

/// What to do when a parsed or inserted stanza's name is already present.
///
/// The loose `Warn` default matches the reference behavior of warning and
/// replacing the stanza in place; `Error` makes the collision fatal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicateNamePolicy {
    #[default]
    Warn,
    Error,
}

/// One top-level entry of a Ra file: verbatim comment/blank text, or an index
/// into the stanza arena.
#[derive(Clone, Debug)]
enum FileEntry {
    Passthrough(String),
    Stanza(usize),
}

/// An ordered collection of named stanzas and interleaved comment lines.
#[derive(Clone, Debug, Default)]
pub struct RaFile {
    entries: Vec<FileEntry>,
    arena: Vec<RaStanza>,
    by_name: IndexMap<String, usize>,
    name_field: Option<String>,
    policy: DuplicateNamePolicy,
    filename: Option<PathBuf>,
}

impl RaFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicateNamePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Read a flat Ra file.
    ///
    /// With `designator = Some(key)`, each stanza's name comes from the line
    /// whose key matches, and stanzas lacking the key are dropped. With
    /// `None`, the first line of each stanza names it.
    pub fn read(
        filepath: impl Into<PathBuf>,
        designator: Option<&str>,
    ) -> Result<Self, RaError> {
        Self::read_with_policy(filepath, designator, DuplicateNamePolicy::Warn)
    }

    pub fn read_with_policy(
        filepath: impl Into<PathBuf>,
        designator: Option<&str>,
        policy: DuplicateNamePolicy,
    ) -> Result<Self, RaError> {
        let filepath = filepath.into();
        let reader = InputFile::new(&filepath).reader()?;
        let mut rafile = Self::parse_reader(reader, designator, policy, false)?;
        rafile.filename = Some(filepath);
        Ok(rafile)
    }

    /// Read a hierarchical Ra file, in which a stanza indented one unit
    /// deeper than its predecessor inherits the predecessor's settings.
    pub fn read_hierarchical(filepath: impl Into<PathBuf>) -> Result<Self, RaError> {
        Self::read_hierarchical_with_policy(filepath, DuplicateNamePolicy::Warn)
    }

    pub fn read_hierarchical_with_policy(
        filepath: impl Into<PathBuf>,
        policy: DuplicateNamePolicy,
    ) -> Result<Self, RaError> {
        let filepath = filepath.into();
        let reader = InputFile::new(&filepath).reader()?;
        let mut rafile = Self::parse_reader(reader, None, policy, true)?;
        rafile.filename = Some(filepath);
        Ok(rafile)
    }

    /// Parse a flat Ra file from any buffered reader.
    pub fn from_reader<R: BufRead>(
        reader: R,
        designator: Option<&str>,
        policy: DuplicateNamePolicy,
    ) -> Result<Self, RaError> {
        Self::parse_reader(reader, designator, policy, false)
    }

    /// Parse a hierarchical Ra file from any buffered reader.
    pub fn from_reader_hierarchical<R: BufRead>(
        reader: R,
        policy: DuplicateNamePolicy,
    ) -> Result<Self, RaError> {
        Self::parse_reader(reader, None, policy, true)
    }

    fn parse_reader<R: BufRead>(
        reader: R,
        designator: Option<&str>,
        policy: DuplicateNamePolicy,
        hierarchical: bool,
    ) -> Result<Self, RaError> {
        let mut rafile = Self::with_policy(policy);
        let mut lines = if hierarchical {
            LineReader::new_keep_indent(reader)
        } else {
            LineReader::new(reader)
        };
        let mut block: Vec<String> = Vec::new();
        let mut scopes = ScopeTracker::new();

        loop {
            let line = lines.read_logical_line()?;

            if let Some(text) = &line {
                let trimmed = text.trim();
                // comments and blanks outside a stanza pass through at the
                // file level; the blank that ends a stanza is consumed, since
                // serialization re-emits one blank after every stanza
                if block.is_empty() && (trimmed.starts_with('#') || trimmed.is_empty()) {
                    rafile.entries.push(FileEntry::Passthrough(text.clone()));
                    continue;
                }
                if !trimmed.is_empty() {
                    block.push(text.clone());
                    continue;
                }
            } else if block.is_empty() {
                break;
            }

            let depth = if hierarchical {
                Some(block_depth(&block, RA_FORMAT.indent_unit)?)
            } else {
                None
            };
            if let Some(stanza) = RaStanza::parse(&block, designator)? {
                let idx = rafile.insert_stanza(stanza)?;
                if let Some(depth) = depth {
                    scopes.attach(&mut rafile.arena, idx, depth)?;
                }
            }
            block.clear();

            if line.is_none() {
                break;
            }
        }
        Ok(rafile)
    }

    /// Append a stanza, returning a mutable handle to the stored copy for
    /// further `set` calls.
    ///
    /// All stanzas in one collection must share a name field; the first
    /// insert fixes it. A duplicate name follows the collection's
    /// [`DuplicateNamePolicy`]: `Warn` logs and replaces the existing stanza
    /// in place (keeping its file position), `Error` fails.
    pub fn insert(&mut self, stanza: RaStanza) -> Result<&mut RaStanza, RaError> {
        let idx = self.insert_stanza(stanza)?;
        Ok(&mut self.arena[idx])
    }

    fn insert_stanza(&mut self, stanza: RaStanza) -> Result<usize, RaError> {
        match &self.name_field {
            None => self.name_field = Some(stanza.name_field().to_string()),
            Some(expected) if expected != stanza.name_field() => {
                return Err(RaError::InconsistentNameField {
                    expected: expected.clone(),
                    found: stanza.name_field().to_string(),
                });
            }
            Some(_) => {}
        }

        let name = stanza.name().to_string();
        if let Some(&existing) = self.by_name.get(&name) {
            match self.policy {
                DuplicateNamePolicy::Error => return Err(RaError::DuplicateName(name)),
                DuplicateNamePolicy::Warn => {
                    log::warn!("duplicate stanza name '{}'; keeping the later stanza", name);
                    self.arena[existing] = stanza;
                    return Ok(existing);
                }
            }
        }

        let idx = self.arena.len();
        self.arena.push(stanza);
        self.by_name.insert(name, idx);
        self.entries.push(FileEntry::Stanza(idx));
        Ok(idx)
    }

    /// Get a stanza by name.
    pub fn get(&self, name: &str) -> Option<&RaStanza> {
        self.by_name.get(name).map(|i| &self.arena[*i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RaStanza> {
        self.by_name.get(name).copied().map(|i| &mut self.arena[i])
    }

    /// Get the parent of a named stanza, set when reading hierarchical files.
    pub fn parent(&self, name: &str) -> Option<&RaStanza> {
        self.get(name)
            .and_then(RaStanza::parent)
            .map(|i| &self.arena[i])
    }

    /// Iterate over stanzas in file order, skipping comments and blanks.
    pub fn iter(&self) -> StanzaIter<'_> {
        StanzaIter {
            rafile: self,
            position: 0,
        }
    }

    /// Stanza names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    /// The name field shared by all stanzas, `None` while the collection is
    /// empty.
    pub fn name_field(&self) -> Option<&str> {
        self.name_field.as_deref()
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// The number of stanzas.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Select data from stanzas matching a predicate.
    ///
    /// For each stanza, if `where_` holds, `select`'s result is appended. A
    /// [`RaError::MissingField`] from either closure (the error
    /// [`RaStanza::try_get`] returns) excludes that stanza; any other error
    /// aborts the query.
    pub fn filter<T>(
        &self,
        where_: impl Fn(&RaStanza) -> Result<bool, RaError>,
        select: impl Fn(&RaStanza) -> Result<T, RaError>,
    ) -> Result<Vec<T>, RaError> {
        let mut out = Vec::new();
        for stanza in self.iter() {
            match where_(stanza) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(RaError::MissingField(..)) => continue,
                Err(e) => return Err(e),
            }
            match select(stanza) {
                Ok(value) => out.push(value),
                Err(RaError::MissingField(..)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// Like [`RaFile::filter`], but returns the matching stanzas as a new
    /// collection. Easier to chain, at the cost of cloning.
    pub fn filter_collection(
        &self,
        where_: impl Fn(&RaStanza) -> Result<bool, RaError>,
    ) -> Result<RaFile, RaError> {
        let mut out = RaFile::with_policy(self.policy);
        for stanza in self.iter() {
            match where_(stanza) {
                Ok(true) => {
                    let mut stanza = stanza.clone();
                    // parent indices point into this collection's arena
                    stanza.clear_parent();
                    out.insert(stanza)?;
                }
                Ok(false) => continue,
                Err(RaError::MissingField(..)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    /// Serialize the collection: passthrough lines verbatim, each stanza's
    /// entries in order, one blank line after each stanza.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            match entry {
                FileEntry::Passthrough(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
                FileEntry::Stanza(i) => {
                    out.push_str(&self.arena[*i].to_string());
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Write the serialized collection to a file, or to standard output when
    /// `output` is `None`.
    pub fn write(&self, output: Option<&PathBuf>) -> Result<(), RaError> {
        let output_file = output.map_or(OutputFile::new_stdout(None), |file| {
            OutputFile::new(file, None)
        });
        let mut writer = output_file.writer()?;
        write!(writer, "{}", self.serialize())?;
        Ok(())
    }
}

impl PartialEq for RaFile {
    /// Structural equality: same ordered passthrough/stanza sequence with
    /// structurally equal stanzas, and the same name field.
    fn eq(&self, other: &Self) -> bool {
        self.name_field == other.name_field
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| match (a, b) {
                    (FileEntry::Passthrough(x), FileEntry::Passthrough(y)) => x == y,
                    (FileEntry::Stanza(i), FileEntry::Stanza(j)) => {
                        self.arena[*i] == other.arena[*j]
                    }
                    _ => false,
                })
    }
}

impl fmt::Display for RaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

/// An iterator over a collection's stanzas in file order.
pub struct StanzaIter<'a> {
    rafile: &'a RaFile,
    position: usize,
}

impl<'a> Iterator for StanzaIter<'a> {
    type Item = &'a RaStanza;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.rafile.entries.len() {
            let entry = &self.rafile.entries[self.position];
            self.position += 1;
            if let FileEntry::Stanza(i) = entry {
                return Some(&self.rafile.arena[*i]);
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a RaFile {
    type Item = &'a RaStanza;
    type IntoIter = StanzaIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{DuplicateNamePolicy, RaFile};
    use crate::error::RaError;
    use crate::stanza::RaStanza;
    use std::io::Cursor;

    fn parse(text: &str) -> RaFile {
        RaFile::from_reader(Cursor::new(text), None, DuplicateNamePolicy::Warn).unwrap()
    }

    #[test]
    fn test_two_stanza_file() {
        let rafile = parse("name fooA\nversion 1\n\nname fooB\nversion 2\n");
        assert_eq!(rafile.len(), 2);
        assert_eq!(rafile.names().collect::<Vec<_>>(), vec!["fooA", "fooB"]);
        assert_eq!(rafile.get("fooA").unwrap().get("version"), Some("1"));
        assert_eq!(rafile.name_field(), Some("name"));
    }

    #[test]
    fn test_round_trip() {
        let text = "# header comment\n\nname fooA\nversion 1\n# note\n\n\nname fooB\nversion 2\n";
        let first = parse(text);
        let second = parse(&first.serialize());
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialize_idempotent() {
        let text = "name fooA\nversion 1\n\nname fooB\nversion 2";
        let once = parse(text).serialize();
        let twice = parse(&once).serialize();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_serialize_layout() {
        let rafile = parse("# top\nname fooA\nversion 1\n\nname fooB\n");
        assert_eq!(
            rafile.serialize(),
            "# top\nname fooA\nversion 1\n\nname fooB\n\n"
        );
    }

    #[test]
    fn test_blank_runs_survive_round_trip() {
        let text = "name fooA\n\n\n\nname fooB\n";
        let rafile = parse(text);
        // the first blank ends the stanza; the other two pass through
        assert_eq!(rafile.serialize(), "name fooA\n\n\n\nname fooB\n\n");
    }

    #[test]
    fn test_inconsistent_name_field() {
        let result = RaFile::from_reader(
            Cursor::new("name fooA\n\ntrack fooB\n"),
            None,
            DuplicateNamePolicy::Warn,
        );
        assert!(matches!(
            result,
            Err(RaError::InconsistentNameField { expected, found })
                if expected == "name" && found == "track"
        ));
    }

    #[test]
    fn test_duplicate_name_warns_and_overwrites() {
        let rafile = parse("name fooA\nversion 1\n\nname fooA\nversion 2\n");
        assert_eq!(rafile.len(), 1);
        assert_eq!(rafile.get("fooA").unwrap().get("version"), Some("2"));
        // the survivor keeps the original file position
        assert_eq!(rafile.serialize(), "name fooA\nversion 2\n\n");
    }

    #[test]
    fn test_duplicate_name_error_policy() {
        let result = RaFile::from_reader(
            Cursor::new("name fooA\n\nname fooA\n"),
            None,
            DuplicateNamePolicy::Error,
        );
        assert!(matches!(result, Err(RaError::DuplicateName(name)) if name == "fooA"));
    }

    #[test]
    fn test_designator_filters_stanzas() {
        let text = "track a\nmetaObject objA\n\ntrack b\n\ntrack c\nmetaObject objC\n";
        let rafile =
            RaFile::from_reader(Cursor::new(text), Some("metaObject"), DuplicateNamePolicy::Warn)
                .unwrap();
        assert_eq!(rafile.names().collect::<Vec<_>>(), vec!["objA", "objC"]);
        assert_eq!(rafile.name_field(), Some("metaObject"));
    }

    #[test]
    fn test_filter_missing_field_excludes() {
        let text = "track a\nexpId 123\n\ntrack b\n\ntrack c\nexpId 123\n";
        let rafile = parse(text);
        let matched = rafile
            .filter(
                |s| Ok(s.try_get("expId")? == "123"),
                |s| Ok(s.name().to_string()),
            )
            .unwrap();
        assert_eq!(matched, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_filter_select_missing_field_excludes() {
        let text = "track a\nexpId 123\nfileName a.bam\n\ntrack b\nexpId 123\n";
        let rafile = parse(text);
        let files = rafile
            .filter(|s| Ok(s.try_get("expId")? == "123"), |s| {
                Ok(s.try_get("fileName")?.to_string())
            })
            .unwrap();
        assert_eq!(files, vec!["a.bam".to_string()]);
    }

    #[test]
    fn test_filter_collection() {
        let text = "track a\ncell K562\n\ntrack b\ncell GM12878\n\ntrack c\ncell K562\n";
        let rafile = parse(text);
        let k562 = rafile
            .filter_collection(|s| Ok(s.try_get("cell")? == "K562"))
            .unwrap();
        assert_eq!(k562.names().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_insert_returns_handle() {
        let mut rafile = RaFile::new();
        let stanza = rafile.insert(RaStanza::with_name("track", "fooA")).unwrap();
        stanza.set("cell", "K562");
        assert_eq!(rafile.get("fooA").unwrap().get("cell"), Some("K562"));
    }

    #[test]
    fn test_insert_checks_name_field() {
        let mut rafile = RaFile::new();
        rafile.insert(RaStanza::with_name("track", "fooA")).unwrap();
        let result = rafile.insert(RaStanza::with_name("name", "fooB"));
        assert!(matches!(result, Err(RaError::InconsistentNameField { .. })));
    }

    #[test]
    fn test_continuation_and_comments_in_stanzas() {
        let text = "name fooA\npath /a/b\\\n  /c\nflag on # trailing\n";
        let rafile = parse(text);
        let stanza = rafile.get("fooA").unwrap();
        assert_eq!(stanza.get("path"), Some("/a/b/c"));
        assert_eq!(stanza.get("flag"), Some("on"));
    }

    const HIERARCHICAL: &str = "\
track parentA
x 1
y 2

   track childB
   x 9

track parentC
z 3

   track childD
   w 4
";

    #[test]
    fn test_hierarchical_inheritance() {
        let rafile =
            RaFile::from_reader_hierarchical(Cursor::new(HIERARCHICAL), DuplicateNamePolicy::Warn)
                .unwrap();
        let child = rafile.get("childB").unwrap();
        // local wins, missing keys inherited
        assert_eq!(child.get("x"), Some("9"));
        assert_eq!(child.get("y"), Some("2"));
        assert_eq!(rafile.parent("childB").unwrap().name(), "parentA");

        // scopes reset when a shallower stanza arrives
        let child = rafile.get("childD").unwrap();
        assert_eq!(child.get("z"), Some("3"));
        assert_eq!(child.get("y"), None);
        assert_eq!(rafile.parent("childD").unwrap().name(), "parentC");
    }

    #[test]
    fn test_hierarchical_mutating_parent_after_parse() {
        let mut rafile =
            RaFile::from_reader_hierarchical(Cursor::new(HIERARCHICAL), DuplicateNamePolicy::Warn)
                .unwrap();
        rafile.get_mut("parentA").unwrap().set("y", "changed");
        assert_eq!(rafile.get("childB").unwrap().get("y"), Some("2"));
    }

    #[test]
    fn test_hierarchical_inconsistent_indent() {
        let text = "track a\n\n   track b\n    x 1\n";
        let result =
            RaFile::from_reader_hierarchical(Cursor::new(text), DuplicateNamePolicy::Warn);
        assert!(matches!(result, Err(RaError::InconsistentIndent)));
    }

    #[test]
    fn test_empty_input() {
        let rafile = parse("");
        assert!(rafile.is_empty());
        assert_eq!(rafile.serialize(), "");
    }

    #[test]
    fn test_comment_only_input() {
        let rafile = parse("# just a comment\n\n");
        assert!(rafile.is_empty());
        assert_eq!(rafile.serialize(), "# just a comment\n\n");
    }
}
