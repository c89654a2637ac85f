//! Unit tests for the interpreter and memory layout, organized per
//! opcode (or closely related opcode group) the way the instruction
//! semantics themselves are grouped in `machine.rs`.

mod nop_hlt;

use crate::{Machine, OpCode, Operation, RunResult};

fn op(code: OpCode, a1: i32, a2: i32) -> Operation {
    Operation::new(code, a1, a2)
}

fn run(ops: &[Operation]) -> (Machine, RunResult) {
    let mut m = Machine::new(ops);
    let mut sink = std::io::sink();
    let result = m.run(&mut sink);
    (m, result)
}

fn run_with_margins(ops: &[Operation], data_margin: i32, mem_margin: i32) -> (Machine, RunResult) {
    let mut m = Machine::with_margins(ops, data_margin, mem_margin);
    let mut sink = std::io::sink();
    let result = m.run(&mut sink);
    (m, result)
}
