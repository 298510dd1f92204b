//! Test cases and test utility functions.
//!

use rand::{seq::SliceRandom, thread_rng, Rng};
use std::io::Write;
use tempfile::NamedTempFile;

use crate::rafile::{DuplicateNamePolicy, RaFile};

// Random test collection defaults
//
// This is the random number of stanzas to use in tests.
// The tradeoff is catching stochastic errors vs test time.
pub const NRANDOM_STANZAS: usize = 500;

pub const CELLS: &[&str] = &["K562", "GM12878", "HeLa-S3", "HepG2", "HUVEC"];
pub const LABS: &[&str] = &["CSHL", "Caltech", "UW", "Stanford"];

/// Sample a random cell line.
pub fn random_cell() -> String {
    let mut rng = thread_rng();
    CELLS.choose(&mut rng).unwrap().to_string()
}

/// Build the text of a random flat collection of `n` stanzas keyed on
/// `track`, with a mix of always-present and sometimes-missing fields.
pub fn random_rafile_content(n: usize) -> String {
    let mut rng = thread_rng();
    let mut out = String::from("# randomly generated track metadata\n\n");
    for i in 0..n {
        out.push_str(&format!("track track{}\n", i));
        out.push_str(&format!("cell {}\n", random_cell()));
        out.push_str(&format!("expId {}\n", rng.gen_range(100..1000)));
        if rng.gen_bool(0.5) {
            let lab = LABS.choose(&mut rng).unwrap();
            out.push_str(&format!("lab {}\n", lab));
        }
        if rng.gen_bool(0.2) {
            out.push_str(&format!("# stanza {} note\n", i));
        }
        out.push('\n');
    }
    out
}

/// Build a random flat [`RaFile`] of `n` stanzas.
pub fn random_rafile(n: usize) -> RaFile {
    let content = random_rafile_content(n);
    RaFile::from_reader(
        std::io::Cursor::new(content),
        None,
        DuplicateNamePolicy::Warn,
    )
    .unwrap()
}

/// Write content to a temporary file, e.g. for round-trip tests through
/// real file I/O.
pub fn temp_rafile(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file.flush().unwrap();
    file
}
