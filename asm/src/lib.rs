//! Assembles the toolkit's small assembly language into a vector of
//! [`mvm::Operation`]s.
//!
//! The language: whitespace-separated tokens, one-line `%` comments,
//! colon-suffixed labels, `enum`/`def` constant directives, and
//! `include <path>` as the first token on a line. See `SPEC_FULL.md` at
//! the workspace root for the full grammar and per-opcode operand shapes.
//!
//! This crate never touches the filesystem directly: callers implement
//! [`source::SourceLoader`] to supply file contents, keeping assembly
//! testable without disk I/O and usable from any host (CLI, embedded
//! tooling, the self-interpreter generator's own tests).

pub mod assembler;
pub mod error;
pub mod error_map;
pub mod lexer;
pub mod source;
pub mod symbols;

pub use assembler::assemble;
pub use error::{AssembleError, Error};
pub use source::{read_with_includes, MergedSource, ReadError, SourceLoader, SourceMap, SourceMapItem};

use mvm::Operation;

/// Reads `root` (expanding `include`s through `loader`) and assembles the
/// result, mapping any assembly error's merged-buffer line back to its
/// original file and line via the recorded source map.
pub fn assemble_source<L: SourceLoader>(
    loader: &mut L,
    root: &str,
) -> Result<Vec<Operation>, Error<L::Error>> {
    let merged = read_with_includes(loader, root)?;
    assemble(&merged.text).map_err(Error::Assemble)
}

/// Like [`assemble_source`], but on an assembly error returns the original
/// `(file, local line)` instead of the merged-buffer line, using the
/// source map produced while reading.
pub fn assemble_source_located<L: SourceLoader>(
    loader: &mut L,
    root: &str,
) -> Result<Vec<Operation>, LocatedError<L::Error>> {
    let merged = read_with_includes(loader, root).map_err(LocatedError::Source)?;
    assemble(&merged.text).map_err(|e| {
        let location = error_map::decode_location(&merged.map, e.line());
        LocatedError::Assemble { error: e, location }
    })
}

/// Like [`assemble_source_located`], but also returns the source map on
/// success so a caller (the CLI's `--source-map` flag) can persist it
/// without re-reading the input.
pub fn assemble_source_with_map<L: SourceLoader>(
    loader: &mut L,
    root: &str,
) -> Result<(Vec<Operation>, SourceMap), LocatedError<L::Error>> {
    let merged = read_with_includes(loader, root).map_err(LocatedError::Source)?;
    let ops = assemble(&merged.text).map_err(|e| {
        let location = error_map::decode_location(&merged.map, e.line());
        LocatedError::Assemble { error: e, location }
    })?;
    Ok((ops, merged.map))
}

#[derive(Debug)]
pub enum LocatedError<E> {
    Source(ReadError<E>),
    Assemble { error: AssembleError, location: Option<(String, u32)> },
}

impl<E: std::fmt::Display> std::fmt::Display for LocatedError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LocatedError::Source(e) => write!(f, "{}", e),
            LocatedError::Assemble { error, location: Some((file, line)) } => {
                write!(f, "error at {} line {}: {}", file, line, error)
            }
            LocatedError::Assemble { error, location: None } => write!(f, "{}", error),
        }
    }
}
