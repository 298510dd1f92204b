//! Types and methods for reading and parsing input and writing output.

pub mod file;
pub mod lines;

pub use file::{InputFile, OutputFile};
pub use lines::{strip_comments, LineReader};
