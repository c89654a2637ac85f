//! End-to-end self-host test: assembles the generated interpreter together
//! with a small driver, has it interpret a nested program, and checks the
//! nested program's own result comes back out.

use std::fmt::Write as _;

use mvm::{Machine, RunResult};

use crate::generate;

/// The thirteen named data cells occupy outer data indices `[0, 13)`; the
/// nested program's own layout must sit above that, and the return slot
/// used to get back out of `@execute_program` above the nested program.
const REGISTER_SLOTS: i32 = 13;

#[test]
fn self_hosted_execution_reproduces_nested_program_result() {
    // By convention the interpreter reads its nested program's result from
    // the nested program's own data index 1 (its own "ret_val" slot),
    // mirroring the outer convention recursively.
    let payload_ops = asm::assemble("movv 1 42\nhlt").expect("payload should assemble");
    let payload = Machine::with_margins(&payload_ops, REGISTER_SLOTS as i32 + 6, 10);

    let mut driver = String::new();
    driver.push_str("@main:\n");
    writeln!(driver, "movv m_base_offs 0").unwrap();
    writeln!(driver, "movv m_data_offs {}", payload.data_offset).unwrap();
    writeln!(driver, "movv m_mem_size {}", payload.mem_size).unwrap();
    for (idx, &value) in payload.mem.iter().enumerate() {
        if value != 0 {
            writeln!(driver, "movv {} {}", idx, value).unwrap();
        }
    }
    let return_slot = payload.mem_size + 1;
    writeln!(driver, "movv top {}", return_slot - 1).unwrap();
    writeln!(driver, "lia {} @after_exec 0", return_slot).unwrap();
    driver.push_str("jr @execute_program\n");
    driver.push_str("@after_exec:\nhlt\n");

    let combined = format!("{}\n{}", generate(), driver);
    let ops = asm::assemble(&combined).expect("generated self-interpreter should assemble");
    let mut m = Machine::new(&ops);
    let mut sink = std::io::sink();
    let result = m.run(&mut sink);

    assert_eq!(result, RunResult::Halt);
    // ret_val is data cell index 1.
    assert_eq!(m.mem[(m.data_offset + 1) as usize], 42);
}

#[test]
fn self_hosted_execution_reports_division_by_zero_from_the_nested_program() {
    let payload_ops = asm::assemble("divv 1 0\nhlt").expect("payload should assemble");
    let payload = Machine::with_margins(&payload_ops, REGISTER_SLOTS as i32 + 6, 10);

    let mut driver = String::new();
    driver.push_str("@main:\n");
    writeln!(driver, "movv m_base_offs 0").unwrap();
    writeln!(driver, "movv m_data_offs {}", payload.data_offset).unwrap();
    writeln!(driver, "movv m_mem_size {}", payload.mem_size).unwrap();
    for (idx, &value) in payload.mem.iter().enumerate() {
        if value != 0 {
            writeln!(driver, "movv {} {}", idx, value).unwrap();
        }
    }
    let return_slot = payload.mem_size + 1;
    writeln!(driver, "movv top {}", return_slot - 1).unwrap();
    writeln!(driver, "lia {} @after_exec 0", return_slot).unwrap();
    driver.push_str("jr @execute_program\n");
    driver.push_str("@after_exec:\nhlt\n");

    let combined = format!("{}\n{}", generate(), driver);
    let ops = asm::assemble(&combined).expect("generated self-interpreter should assemble");
    let mut m = Machine::new(&ops);
    let mut sink = std::io::sink();
    let result = m.run(&mut sink);

    assert_eq!(result, RunResult::Halt);
    // ret_val carries the interpreter's own division-by-zero sentinel,
    // since the nested program never reaches its own hlt.
    assert_eq!(m.mem[(m.data_offset + 1) as usize], crate::ERR_DIVZERO);
}
