//! Flat `key value` configuration files with the [`Settings`] type.
//!
//! A settings file works like a single stanza with no name: every non-blank,
//! non-comment logical line is one key/value pair, with the same continuation
//! and `\#` escape rules as stanza files. Unlike [`RaFile`], a duplicate key
//! anywhere in the file is always fatal; the two containers intentionally
//! differ here.
//!
//! A settings file may instead be a JSON object, in which case each top-level
//! member becomes one setting.
//!
//! [`RaFile`]: crate::rafile::RaFile

use indexmap::IndexMap;
use std::fmt;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::error::RaError;
use crate::io::{strip_comments, InputFile, LineReader};
use crate::stanza::{split_key_value, Entry};

/// An ordered scalar `key -> value` store with typed accessors.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    entries: Vec<Entry>,
    by_key: IndexMap<String, usize>,
    filename: Option<PathBuf>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a settings file, trying JSON first and falling back to the Ra
    /// line format.
    pub fn read(filepath: impl Into<PathBuf>) -> Result<Self, RaError> {
        let filepath = filepath.into();
        let mut reader = InputFile::new(&filepath).reader()?;
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut settings = Self::parse_str(&text)?;
        settings.filename = Some(filepath);
        Ok(settings)
    }

    /// Parse settings text: a JSON object if it is one, Ra lines otherwise.
    pub fn parse_str(text: &str) -> Result<Self, RaError> {
        if let Ok(serde_json::Value::Object(object)) = serde_json::from_str(text) {
            let mut settings = Self::new();
            for (key, value) in object {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                settings.insert(key, value)?;
            }
            return Ok(settings);
        }
        Self::from_reader(text.as_bytes())
    }

    /// Parse Ra-format settings lines from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, RaError> {
        let mut settings = Self::new();
        let mut lines = LineReader::new(reader);
        while let Some(line) = lines.read_logical_line()? {
            let trimmed = line.trim();
            if trimmed.starts_with('#') || trimmed.is_empty() {
                settings.entries.push(Entry::Passthrough(trimmed.to_string()));
                continue;
            }
            let stripped = strip_comments(trimmed);
            let stripped = stripped.trim();
            if stripped.is_empty() || stripped.starts_with('#') {
                continue;
            }
            let (key, value) = split_key_value(stripped);
            settings.insert(key, value)?;
        }
        Ok(settings)
    }

    /// Append a setting; a duplicate key is a hard [`RaError::DuplicateKey`].
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), RaError> {
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

    fn lookup(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(|i| match &self.entries[*i] {
            Entry::KeyValue { value, .. } => value.as_str(),
            Entry::Passthrough(_) => unreachable!("key index points at passthrough entry"),
        })
    }

    /// Get a setting's value; absent without a default is an error.
    pub fn get(&self, key: &str) -> Result<&str, RaError> {
        self.lookup(key)
            .ok_or_else(|| RaError::MissingSetting(key.to_string()))
    }

    /// Get a setting's value, or `default` when absent.
    pub fn get_or<'s>(&'s self, key: &str, default: &'s str) -> &'s str {
        self.lookup(key).unwrap_or(default)
    }

    /// Get a setting's value, falling back to an alternate key when the
    /// primary is absent. The error names the primary key.
    pub fn get_fallback(&self, key: &str, alt: &str) -> Result<&str, RaError> {
        self.lookup(key)
            .or_else(|| self.lookup(alt))
            .ok_or_else(|| RaError::MissingSetting(key.to_string()))
    }

    /// The boolean reading of a value: case-insensitive `0`, `no`, `n`,
    /// `false`, and `f` are false, everything else is true.
    pub fn as_bool(value: &str) -> bool {
        !matches!(
            value.to_lowercase().as_str(),
            "0" | "no" | "n" | "false" | "f"
        )
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, RaError> {
        Ok(Self::as_bool(self.get(key)?))
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.lookup(key).map(Self::as_bool).unwrap_or(default)
    }

    /// The directory reading of a value: an absolute path (resolved against
    /// the current directory) always ending in the path separator. An empty
    /// value is returned unchanged.
    pub fn as_dir(value: &str) -> Result<String, RaError> {
        if value.is_empty() {
            return Ok(String::new());
        }
        let absolute = std::path::absolute(value)?;
        let mut dir = absolute.to_string_lossy().into_owned();
        if !dir.ends_with(MAIN_SEPARATOR) {
            dir.push(MAIN_SEPARATOR);
        }
        Ok(dir)
    }

    pub fn get_dir(&self, key: &str) -> Result<String, RaError> {
        Self::as_dir(self.get(key)?)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Keys in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }

    /// Key/value pairs in file order.
    pub fn iter_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::KeyValue { key, value } => Some((key.as_str(), value.as_str())),
            Entry::Passthrough(_) => None,
        })
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// The number of settings.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl fmt::Display for Settings {
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
