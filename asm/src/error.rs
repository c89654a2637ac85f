use std::fmt;

use crate::source::ReadError;

/// Assembly-time failures, each anchored to a line of the merged buffer.
/// A driver resolves that line back to `(file, local line)` via
/// [`crate::error_map::decode_location`].
#[derive(Debug)]
pub enum AssembleError {
    MissingOperand { line: u32, context: String },
    UnknownMnemonic { line: u32, token: String },
    DuplicateLabel { line: u32, name: String },
    /// The reference directive-duplicate check tests the directive name
    /// (`enum`/`def`) rather than the symbol being defined; preserved here
    /// rather than tightened into a real duplicate-symbol check.
    DuplicateDirective { line: u32, directive: &'static str, name: String },
    UnresolvedOperand { line: u32, token: String },
    MalformedInteger { line: u32, token: String },
}

impl AssembleError {
    pub fn line(&self) -> u32 {
        match self {
            AssembleError::MissingOperand { line, .. }
            | AssembleError::UnknownMnemonic { line, .. }
            | AssembleError::DuplicateLabel { line, .. }
            | AssembleError::DuplicateDirective { line, .. }
            | AssembleError::UnresolvedOperand { line, .. }
            | AssembleError::MalformedInteger { line, .. } => *line,
        }
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssembleError::MissingOperand { context, .. } => {
                write!(f, "missing operand for '{}'", context)
            }
            AssembleError::UnknownMnemonic { token, .. } => {
                write!(f, "unknown mnemonic '{}'", token)
            }
            AssembleError::DuplicateLabel { name, .. } => write!(f, "duplicate label '{}'", name),
            AssembleError::DuplicateDirective { directive, name, .. } => {
                write!(f, "duplicate '{}' for '{}'", directive, name)
            }
            AssembleError::UnresolvedOperand { token, .. } => {
                write!(f, "unresolved operand '{}'", token)
            }
            AssembleError::MalformedInteger { token, .. } => {
                write!(f, "malformed integer '{}'", token)
            }
        }
    }
}

impl std::error::Error for AssembleError {}

/// Top-level error returned by [`crate::assemble_source`]: either the
/// include-expansion stage or the assembler itself failed.
#[derive(Debug)]
pub enum Error<E> {
    Source(ReadError<E>),
    Assemble(AssembleError),
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Source(e) => write!(f, "{}", e),
            Error::Assemble(e) => write!(f, "{}", e),
        }
    }
}

impl<E> From<AssembleError> for Error<E> {
    fn from(e: AssembleError) -> Error<E> {
        Error::Assemble(e)
    }
}

impl<E> From<ReadError<E>> for Error<E> {
    fn from(e: ReadError<E>) -> Error<E> {
        Error::Source(e)
    }
}
