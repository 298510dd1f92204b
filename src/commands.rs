//! Implementations of the `rafile` command line tool's subcommands.

use std::io::Write;
use std::path::PathBuf;

use crate::{
    error::RaError,
    index::{sort_key, AltIndex},
    io::OutputFile,
    rafile::{DuplicateNamePolicy, RaFile},
    reporting::{CommandOutput, Report},
    stanza::RaStanza,
};

/// Parse a Ra file and report on its consistency.
///
/// With `--strict`, duplicate stanza names abort the parse instead of
/// warning. With `--alt FIELD`, builds a non-unique alternate index over
/// `FIELD` and reports whether it is effectively unique; stanzas missing the
/// field are collected as issues instead of aborting the index build.
pub fn ra_check(
    rafile_path: &PathBuf,
    alt: Option<&String>,
    strict: bool,
) -> Result<CommandOutput<()>, RaError> {
    let policy = if strict {
        DuplicateNamePolicy::Error
    } else {
        DuplicateNamePolicy::Warn
    };
    let rafile = RaFile::read_with_policy(rafile_path, None, policy)?;
    let mut report = Report::new();

    println!(
        "{}: {} stanzas keyed on '{}'",
        rafile_path.display(),
        rafile.len(),
        rafile.name_field().unwrap_or("(empty file)")
    );

    if let Some(alt_field) = alt {
        let missing = rafile.filter(
            |s| Ok(!s.contains_key(alt_field)),
            |s| Ok(s.name().to_string()),
        )?;
        for name in &missing {
            report.add_issue(format!(
                "stanza '{}' is missing alternate field '{}'",
                name, alt_field
            ));
        }
        if missing.is_empty() {
            let index = AltIndex::build(&rafile, alt_field.as_str(), false)?;
            if index.is_effectively_unique() {
                println!(
                    "alternate key '{}' is effectively unique over {} values",
                    alt_field,
                    index.len()
                );
            } else {
                println!("alternate key '{}' has non-unique values:", alt_field);
                for value in index.alt_values() {
                    let matches = index.matches(value);
                    if matches.len() > 1 {
                        println!("  {} {}", alt_field, value);
                        for stanza in matches {
                            println!("    {}", stanza.name());
                        }
                    }
                }
            }
        }
    }

    Ok(CommandOutput::new((), report))
}

/// Print the stanzas (or one field of them) matching a set of `key=value`
/// predicates. Stanzas missing a predicate or picked field are excluded.
pub fn ra_select(
    rafile_path: &PathBuf,
    conditions: &[(String, String)],
    pick: Option<&String>,
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, RaError> {
    let rafile = RaFile::read(rafile_path, None)?;

    let output_stream = output.map_or(OutputFile::new_stdout(None), |file| {
        OutputFile::new(file, None)
    });
    let mut writer = output_stream.writer()?;

    let where_ = |stanza: &RaStanza| -> Result<bool, RaError> {
        for (key, value) in conditions {
            if stanza.try_get(key)? != value.as_str() {
                return Ok(false);
            }
        }
        Ok(true)
    };

    match pick {
        Some(field) => {
            let values = rafile.filter(where_, |s| Ok(s.try_get(field)?.to_string()))?;
            for value in values {
                writeln!(writer, "{}", value)?;
            }
        }
        None => {
            let matched = rafile.filter_collection(where_)?;
            write!(writer, "{}", matched.serialize())?;
        }
    }

    Ok(CommandOutput::new((), Report::new()))
}

/// Print every stanza of a Ra file, ordered by the given fields.
pub fn ra_sort(
    rafile_path: &PathBuf,
    by: &[String],
    output: Option<&PathBuf>,
) -> Result<CommandOutput<()>, RaError> {
    let rafile = RaFile::read(rafile_path, None)?;

    let mut stanzas: Vec<&RaStanza> = rafile.iter().collect();
    stanzas.sort_by_cached_key(|s| sort_key(s, by));

    let output_stream = output.map_or(OutputFile::new_stdout(None), |file| {
        OutputFile::new(file, None)
    });
    let mut writer = output_stream.writer()?;
    for stanza in stanzas {
        writeln!(writer, "{}", stanza)?;
    }

    Ok(CommandOutput::new((), Report::new()))
}
