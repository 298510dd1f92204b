//! Alternate-key lookup over a [`RaFile`] with the [`AltIndex`] type.
//!
//! A Ra file's primary key is the stanza name, which is unique. Callers often
//! need to look stanzas up by some other field that is *not* unique. The
//! classic case is a tool registry keyed by md5sum, queried by tool `name`
//! with several versions of one tool present. [`AltIndex`] builds that lookup
//! once, and disambiguates non-unique matches deterministically through a
//! configurable multi-field sort order.

use indexmap::IndexMap;

use crate::error::RaError;
use crate::rafile::{RaFile, RA_FORMAT};
use crate::stanza::RaStanza;

/// The comparison key for a stanza: its lower-cased values for `fields` in
/// order (missing fields contribute nothing), joined by the format separator,
/// with the stanza name appended as a final tiebreaker so the order is total.
pub fn sort_key(stanza: &RaStanza, fields: &[String]) -> String {
    let mut key = String::new();
    for field in fields {
        if let Some(value) = stanza.get(field) {
            key.push_str(&value.to_lowercase());
        }
        key.push(RA_FORMAT.sort_key_separator);
    }
    key.push_str(stanza.name());
    key
}

/// A non-unique alternate key built over a [`RaFile`].
#[derive(Debug)]
pub struct AltIndex<'a> {
    rafile: &'a RaFile,
    field: String,
    unique: bool,
    effectively_unique: bool,
    map: IndexMap<String, Vec<String>>,
    sort_fields: Vec<String>,
}

impl<'a> AltIndex<'a> {
    /// Build an index over `field`.
    ///
    /// Every stanza must carry the field ([`RaError::MissingField`]
    /// otherwise). With `unique = true`, two stanzas sharing an alt value fail
    /// the build with [`RaError::NonUniqueKey`]; the underlying collection
    /// stays valid and usable without the index.
    pub fn build(
        rafile: &'a RaFile,
        field: impl Into<String>,
        unique: bool,
    ) -> Result<Self, RaError> {
        let field = field.into();
        let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut collisions = false;

        for stanza in rafile.iter() {
            let alt_value = stanza.try_get(&field)?.to_string();
            let names = map.entry(alt_value.clone()).or_default();
            if !names.is_empty() {
                if unique {
                    return Err(RaError::NonUniqueKey {
                        field,
                        value: alt_value,
                        first: names[0].clone(),
                        second: stanza.name().to_string(),
                    });
                }
                collisions = true;
            }
            names.push(stanza.name().to_string());
        }

        let sort_fields = match rafile.name_field() {
            Some(primary) => vec![primary.to_string(), field.clone()],
            None => vec![field.clone()],
        };

        Ok(Self {
            rafile,
            field,
            unique,
            effectively_unique: unique || !collisions,
            map,
            sort_fields,
        })
    }

    /// Override the sort order used to disambiguate non-unique matches.
    pub fn with_sort_order(mut self, fields: Vec<String>) -> Self {
        self.sort_fields = fields;
        self
    }

    /// The alternate key field this index is built over.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Whether the caller asserted uniqueness at build time.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Whether every alt value observed at build time mapped to exactly one
    /// stanza. True for a `unique` index by construction; a non-unique index
    /// without actual collisions behaves exactly like a unique one, and this
    /// flag makes that observable.
    pub fn is_effectively_unique(&self) -> bool {
        self.effectively_unique
    }

    /// The fields, in priority order, of the comparison key.
    pub fn sort_fields(&self) -> &[String] {
        &self.sort_fields
    }

    /// The distinct alt values, in first-seen order.
    pub fn alt_values(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// The number of distinct alt values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get the stanza for an alt value only if exactly one matches; `None`
    /// when the value is ambiguous (use [`AltIndex::lookup_iter`]) or absent.
    pub fn lookup_unique(&self, alt_value: &str) -> Option<&'a RaStanza> {
        match self.map.get(alt_value) {
            Some(names) if names.len() == 1 => self.rafile.get(&names[0]),
            _ => None,
        }
    }

    /// All stanzas matching an alt value, in sort order.
    pub fn matches(&self, alt_value: &str) -> Vec<&'a RaStanza> {
        let mut stanzas: Vec<&'a RaStanza> = self
            .map
            .get(alt_value)
            .map(|names| names.iter().filter_map(|n| self.rafile.get(n)).collect())
            .unwrap_or_default();
        stanzas.sort_by_cached_key(|s| sort_key(s, &self.sort_fields));
        stanzas
    }

    /// Resumable iteration over an alt value's matches.
    ///
    /// With `previous = None`, returns the first match in sort order; with
    /// `previous = Some(stanza)`, the match immediately after it, or `None`
    /// once exhausted. The iteration is stateless, so a caller enumerates all
    /// matches with:
    ///
    /// ```no_run
    /// # use rafile::prelude::*;
    /// # let rafile = RaFile::read("tools.ra", None)?;
    /// # let index = AltIndex::build(&rafile, "name", false)?;
    /// let mut current = None;
    /// loop {
    ///     current = index.lookup_iter("bwa", current);
    ///     match current {
    ///         None => break,
    ///         Some(stanza) => println!("{}", stanza.name()),
    ///     }
    /// }
    /// # Ok::<(), RaError>(())
    /// ```
    pub fn lookup_iter(
        &self,
        alt_value: &str,
        previous: Option<&RaStanza>,
    ) -> Option<&'a RaStanza> {
        let matches = self.matches(alt_value);
        match previous {
            None => matches.first().copied(),
            Some(prev) => {
                let position = matches.iter().position(|s| s.name() == prev.name())?;
                matches.get(position + 1).copied()
            }
        }
    }

    /// Every stanza name in the collection, ordered by the comparison key.
    pub fn sorted_names(&self) -> Vec<&'a str> {
        let mut stanzas: Vec<&'a RaStanza> = self.rafile.iter().collect();
        stanzas.sort_by_cached_key(|s| sort_key(s, &self.sort_fields));
        stanzas.into_iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{sort_key, AltIndex};
    use crate::error::RaError;
    use crate::rafile::{DuplicateNamePolicy, RaFile};
    use std::io::Cursor;

    const TOOLS: &str = "\
toolId md5_bwa_a
name bwa
version 0.7.0

toolId md5_samtools
name samtools
version 1.9

toolId md5_bwa_b
name bwa
version 0.7.12

toolId md5_bwa_c
name bwa
version 0.6.2
";

    fn tools() -> RaFile {
        RaFile::from_reader(Cursor::new(TOOLS), None, DuplicateNamePolicy::Warn).unwrap()
    }

    #[test]
    fn test_unique_assertion_fails_on_collision() {
        let rafile = tools();
        let result = AltIndex::build(&rafile, "name", true);
        assert!(matches!(
            result,
            Err(RaError::NonUniqueKey { field, value, first, second })
                if field == "name" && value == "bwa"
                    && first == "md5_bwa_a" && second == "md5_bwa_b"
        ));
        // the collection is still usable after a failed build
        assert_eq!(rafile.len(), 4);
    }

    #[test]
    fn test_unique_build_over_unique_field() {
        let rafile = tools();
        let index = AltIndex::build(&rafile, "version", true).unwrap();
        assert!(index.is_unique());
        assert!(index.is_effectively_unique());
        assert_eq!(
            index.lookup_unique("1.9").unwrap().name(),
            "md5_samtools"
        );
    }

    #[test]
    fn test_effectively_unique_observation() {
        let rafile = tools();
        let by_name = AltIndex::build(&rafile, "name", false).unwrap();
        assert!(!by_name.is_unique());
        assert!(!by_name.is_effectively_unique());

        let by_version = AltIndex::build(&rafile, "version", false).unwrap();
        assert!(!by_version.is_unique());
        assert!(by_version.is_effectively_unique());
    }

    #[test]
    fn test_missing_field_fails_build() {
        let text = "toolId a\nname bwa\n\ntoolId b\n";
        let rafile = RaFile::from_reader(Cursor::new(text), None, DuplicateNamePolicy::Warn).unwrap();
        let result = AltIndex::build(&rafile, "name", false);
        assert!(matches!(result, Err(RaError::MissingField(name, field))
            if name == "b" && field == "name"));
    }

    #[test]
    fn test_lookup_unique_is_none_for_ambiguous() {
        let rafile = tools();
        let index = AltIndex::build(&rafile, "name", false).unwrap();
        assert!(index.lookup_unique("bwa").is_none());
        assert_eq!(index.lookup_unique("samtools").unwrap().name(), "md5_samtools");
        assert!(index.lookup_unique("absent").is_none());
    }

    #[test]
    fn test_lookup_iter_visits_all_matches_once() {
        let rafile = tools();
        let index = AltIndex::build(&rafile, "name", false)
            .unwrap()
            .with_sort_order(vec!["name".to_string(), "version".to_string()]);

        let mut seen = Vec::new();
        let mut current = None;
        loop {
            current = index.lookup_iter("bwa", current);
            match current {
                None => break,
                Some(stanza) => seen.push(stanza.get("version").unwrap().to_string()),
            }
        }
        assert_eq!(seen, vec!["0.6.2", "0.7.0", "0.7.12"]);
    }

    #[test]
    fn test_lookup_iter_single_match() {
        let rafile = tools();
        let index = AltIndex::build(&rafile, "name", false).unwrap();
        let first = index.lookup_iter("samtools", None).unwrap();
        assert_eq!(first.name(), "md5_samtools");
        assert!(index.lookup_iter("samtools", Some(first)).is_none());
    }

    #[test]
    fn test_default_sort_order_is_primary_then_alt() {
        let rafile = tools();
        let index = AltIndex::build(&rafile, "name", false).unwrap();
        assert_eq!(index.sort_fields(), ["toolId", "name"]);
        let versions: Vec<_> = index
            .matches("bwa")
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(versions, vec!["md5_bwa_a", "md5_bwa_b", "md5_bwa_c"]);
    }

    #[test]
    fn test_sorted_names() {
        let rafile = tools();
        let index = AltIndex::build(&rafile, "name", false)
            .unwrap()
            .with_sort_order(vec!["name".to_string(), "version".to_string()]);
        assert_eq!(
            index.sorted_names(),
            vec!["md5_bwa_c", "md5_bwa_a", "md5_bwa_b", "md5_samtools"]
        );
    }

    #[test]
    fn test_sort_key_is_case_insensitive_with_name_tiebreak() {
        let rafile = tools();
        let stanza = rafile.get("md5_bwa_a").unwrap();
        let fields = vec!["name".to_string(), "version".to_string()];
        assert_eq!(sort_key(stanza, &fields), "bwa 0.7.0 md5_bwa_a");
    }
}
