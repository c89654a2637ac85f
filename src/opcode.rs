//! The canonical, ordered opcode table (component A of the toolkit).
//!
//! Numeric codes are assigned by position and are part of the wire contract:
//! the assembler, the interpreter and the self-interpreter generator all
//! rely on this exact ordering.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum OpCode {
    Nop = 0,
    Hlt,
    Jr,
    Ja,
    Jnz,
    Jz,
    Jg,
    Jge,
    Jl,
    Jle,
    Lia,
    Ld,
    St,
    Stv,
    Mov,
    Add,
    Sub,
    Mul,
    Div,
    Movv,
    Addv,
    Subv,
    Mulv,
    Divv,
    Dbg,
    Dbgext,
}

/// Mnemonic table in opcode order. Index `i` is the mnemonic for code `i`.
pub const MNEMONICS: [&str; 26] = [
    "nop", "hlt", "jr", "ja", "jnz", "jz", "jg", "jge", "jl", "jle", "lia", "ld", "st", "stv",
    "mov", "add", "sub", "mul", "div", "movv", "addv", "subv", "mulv", "divv", "dbg", "dbgext",
];

/// Number of operand tokens each mnemonic consumes in source text.
pub fn arity(op: OpCode) -> usize {
    use OpCode::*;
    match op {
        Nop | Hlt | Dbgext => 0,
        Jr | Ja | Dbg => 1,
        Jnz | Jz | Jg | Jge | Jl | Jle | Mov | Movv | Add | Addv | Sub | Subv | Mul | Mulv
        | Div | Divv | Ld | St | Stv => 2,
        Lia => 3,
    }
}

pub fn by_name(name: &str) -> Option<OpCode> {
    MNEMONICS
        .iter()
        .position(|&m| m == name)
        .and_then(|i| OpCode::from_usize(i))
}

pub fn mnemonic(code: i32) -> Option<&'static str> {
    if code >= 0 && (code as usize) < MNEMONICS.len() {
        Some(MNEMONICS[code as usize])
    } else {
        None
    }
}

impl OpCode {
    pub fn code(self) -> i32 {
        self.to_i32().expect("opcode always fits in i32")
    }

    pub fn name(self) -> &'static str {
        MNEMONICS[self.code() as usize]
    }
}
