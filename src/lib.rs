
pub mod commands;
pub mod error;
pub mod hierarchy;
pub mod index;
pub mod io;
pub mod rafile;
pub mod reporting;
pub mod settings;
pub mod stanza;
pub mod test_utilities;

pub mod prelude {
    pub use crate::error::RaError;
    pub use crate::index::AltIndex;
    pub use crate::io::{InputFile, LineReader, OutputFile};
    pub use crate::rafile::{DuplicateNamePolicy, RaFile, RA_FORMAT};
    pub use crate::settings::Settings;
    pub use crate::stanza::{Entry, RaStanza};
}
