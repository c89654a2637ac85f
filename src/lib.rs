//! Core of the minimal virtual machine: the opcode table, instruction
//! memory layout, and the reference interpreter.
//!
//! This crate deliberately knows nothing about source text, assembly
//! syntax, or the filesystem; it consumes an ordered list of
//! [`operation::Operation`]s and executes them. Assembling text into that
//! list lives in the `asm` crate; generating a self-interpreting program
//! lives in the `selfgen` crate.

pub mod machine;
pub mod opcode;
pub mod operation;

pub use machine::{Machine, RunResult, INST_SIZE};
pub use opcode::OpCode;
pub use operation::Operation;

#[cfg(test)]
mod test;
