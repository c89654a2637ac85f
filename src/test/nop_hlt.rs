use super::*;
use matches::assert_matches;

#[test]
fn nop_then_halt() {
    let ops = [op(OpCode::Nop, 0, 0), op(OpCode::Hlt, 0, 0)];
    let (m, result) = run(&ops);
    assert_eq!(result, RunResult::Halt);
    // hlt returns before the cycle counter is incremented, so only the nop counts.
    assert_eq!(m.cycles, 1);
}

#[test]
fn halt_alone_costs_no_cycles() {
    let ops = [op(OpCode::Hlt, 0, 0)];
    let (m, result) = run(&ops);
    assert_eq!(result, RunResult::Halt);
    assert_eq!(m.cycles, 0);
}

#[test]
fn empty_program_is_invalid_inst_addr() {
    let ops: [Operation; 0] = [];
    let (_, result) = run(&ops);
    assert_matches!(result, RunResult::InvalidInstAddr);
}

#[test]
fn unknown_opcode_is_rejected() {
    let mut m = Machine::new(&[op(OpCode::Nop, 0, 0)]);
    // Corrupt the single instruction's opcode word directly.
    let top = (m.data_offset - crate::INST_SIZE + 2) as usize;
    m.mem[top] = 99;
    let mut sink = std::io::sink();
    assert_eq!(m.run(&mut sink), RunResult::InvalidOpCode);
}
