//! Self-interpreter generator (component H).
//!
//! Emits assembly text for a program that, executed by the reference
//! interpreter, itself interprets an arbitrary program sitting in its data
//! region — using the same per-opcode semantics as [`mvm::machine`] and a
//! balanced binary-search dispatch tree, since the target machine has no
//! indirect computed jump.
//!
//! The thirteen named data cells below are not CPU registers; they are
//! plain `def`-declared constants addressing data memory, exactly like any
//! other named constant the assembler understands.

use num_traits::FromPrimitive;

use mvm::opcode::{self, OpCode};

const REGISTERS: [&str; 13] = [
    "top",
    "ret_val",
    "param",
    "ra",
    "rb",
    "rc",
    "rd",
    "re",
    "rcnt",
    "m_inst_addr",
    "m_base_offs",
    "m_data_offs",
    "m_mem_size",
];

/// Reserved `ret_val` sentinels a generated program reports runtime errors
/// through, since it is itself just a VM program and has no native error
/// channel.
pub const ERR_INVALID_JUMP: i32 = -11111112;
pub const ERR_BOUNDS: i32 = -11111113;
pub const ERR_DIVZERO: i32 = -11111114;
pub const ERR_INFLOOP: i32 = -11111115;
pub const ERR_OPCODE: i32 = -11111116;

fn write_tab(out: &mut String, lev: i32) {
    for _ in 0..lev {
        out.push(' ');
    }
}

fn write_line(out: &mut String, lev: i32, s: &str) {
    write_tab(out, lev);
    out.push_str(s);
    out.push('\n');
}

fn verify_addr(arg_idx: u32, lines: &mut Vec<&'static str>) {
    match arg_idx {
        1 => lines.push("mov rd rb"),
        2 => lines.push("mov rd rc"),
        _ => unreachable!("verify_addr only supports operand 1 or 2"),
    }
    lines.push("sub rd m_base_offs");
    lines.push("jl @execute_error_bounds rd");
    lines.push("sub rd m_mem_size");
    lines.push("jge @execute_error_bounds rd");
}

fn get_addr(arg_idx: u32, lines: &mut Vec<&'static str>) {
    match arg_idx {
        1 => lines.push("add rb m_data_offs"),
        2 => lines.push("add rc m_data_offs"),
        _ => unreachable!("get_addr only supports operand 1 or 2"),
    }
    verify_addr(arg_idx, lines);
}

fn binary_op(op: OpCode, lines: &mut Vec<&'static str>) {
    use OpCode::*;
    match op {
        Add | Addv => lines.push("add re rc"),
        Sub | Subv => lines.push("sub re rc"),
        Mul | Mulv => lines.push("mul re rc"),
        Div | Divv => {
            lines.push("jz @execute_error_divzero rc");
            lines.push("div re rc");
        }
        _ => unreachable!("binary_op only supports add/sub/mul/div and their immediate forms"),
    }
}

fn do_jump(relative: bool, lines: &mut Vec<&'static str>) {
    lines.push("mov rd rb");
    lines.push("divv rd 3");
    lines.push("mulv rd 3");
    lines.push("sub rd rb");
    lines.push("jnz @execute_error_jump rd");
    if relative {
        lines.push("add rb m_inst_addr");
    } else {
        lines.push("add rb m_data_offs");
        lines.push("subv rb 3");
    }
    verify_addr(1, lines);
    lines.push("addv rb 3");
    lines.push("mov m_inst_addr rb");
}

fn cond_jump(op: OpCode, lines: &mut Vec<&'static str>) {
    use OpCode::*;
    let label = match op {
        Jz => {
            lines.push("jnz @execute_skip_jz rc");
            "@execute_skip_jz:"
        }
        Jnz => {
            lines.push("jz @execute_skip_jnz rc");
            "@execute_skip_jnz:"
        }
        Jg => {
            lines.push("jle @execute_skip_jg rc");
            "@execute_skip_jg:"
        }
        Jl => {
            lines.push("jge @execute_skip_jl rc");
            "@execute_skip_jl:"
        }
        Jge => {
            lines.push("jl @execute_skip_jge rc");
            "@execute_skip_jge:"
        }
        Jle => {
            lines.push("jg @execute_skip_jle rc");
            "@execute_skip_jle:"
        }
        _ => unreachable!("cond_jump only supports the six comparison jumps"),
    };
    do_jump(true, lines);
    lines.push(label);
}

/// Inline body for one opcode's dispatch leaf.
fn execute_op(op: OpCode, lines: &mut Vec<&'static str>) {
    use OpCode::*;
    match op {
        Nop => {}
        Hlt => lines.push("jr @execute_loopend"),
        Ja => {
            get_addr(1, lines);
            lines.push("ld rb rb");
            lines.push("addv rb 1");
            do_jump(false, lines);
        }
        Jr => do_jump(true, lines),
        Jz | Jnz | Jg | Jl | Jge | Jle => {
            get_addr(2, lines);
            lines.push("ld rc rc");
            cond_jump(op, lines);
        }
        Lia => {
            get_addr(1, lines);
            lines.push("mov rd rc");
            lines.push("add rd m_inst_addr");
            lines.push("addv rd 2");
            lines.push("sub rd m_data_offs");
            lines.push("st rb rd");
        }
        Ld => {
            get_addr(1, lines);
            get_addr(2, lines);
            lines.push("ld rc rc");
            get_addr(2, lines);
            lines.push("ld rc rc");
            lines.push("st rb rc");
        }
        St => {
            get_addr(1, lines);
            lines.push("ld rb rb");
            get_addr(1, lines);
            get_addr(2, lines);
            lines.push("ld rc rc");
            lines.push("st rb rc");
        }
        Stv => {
            get_addr(1, lines);
            lines.push("ld rb rb");
            get_addr(1, lines);
            lines.push("st rb rc");
        }
        Mov => {
            get_addr(1, lines);
            get_addr(2, lines);
            lines.push("ld rc rc");
            lines.push("st rb rc");
        }
        Add | Sub | Mul | Div => {
            get_addr(1, lines);
            lines.push("ld re rb");
            get_addr(2, lines);
            lines.push("ld rc rc");
            binary_op(op, lines);
            lines.push("st rb re");
        }
        Movv => {
            get_addr(1, lines);
            lines.push("st rb rc");
        }
        Addv | Subv | Mulv | Divv => {
            get_addr(1, lines);
            lines.push("ld re rb");
            binary_op(op, lines);
            lines.push("st rb re");
        }
        Dbg => {
            get_addr(1, lines);
            lines.push("ld rb rb");
            lines.push("dbg rb");
        }
        Dbgext => lines.push("dbgext"),
    }
}

/// Builds the dispatch tree recursively over opcode range `[s, e]`,
/// splitting in half at each level the way a balanced binary search does,
/// since there is no indirect computed jump to dispatch on the opcode
/// value directly.
fn gen_dispatch(out: &mut String, s: i32, e: i32, lev: i32) {
    if s == e {
        out.push('\n');
        let op = OpCode::from_i32(s).expect("opcode index is in range");
        write_tab(out, lev);
        out.push_str("% ");
        out.push_str(opcode::MNEMONICS[s as usize]);
        out.push('\n');
        let mut lines = Vec::new();
        execute_op(op, &mut lines);
        for line in &lines {
            write_line(out, lev, line);
        }
        write_tab(out, lev);
        out.push_str("jr @execute_continue\n\n");
        return;
    }
    let m = (s + e) >> 1;
    let mnemonic = opcode::MNEMONICS[m as usize];
    write_tab(out, lev);
    out.push_str("mov rd ra\n");
    write_tab(out, lev);
    out.push_str(&format!("subv rd ${}\n", mnemonic));
    write_tab(out, lev);
    out.push_str(&format!("jg @execute_after_{} rd\n", mnemonic));
    gen_dispatch(out, s, m, lev + 1);
    write_tab(out, lev);
    out.push_str(&format!("@execute_after_{}:\n", mnemonic));
    gen_dispatch(out, m + 1, e, lev + 1);
}

const EXECUTE_BEGIN: &str = "\
%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%
% Execute self-interpreting machine code      %
% with safety checks.                         %
% Arguments:                                  %
%  m_base_offs = machine memory start         %
%  m_data_offs = machine data start           %
%                (and code size limit)        %
%  m_mem_size = total code+data size limit    %
% Returns:                                    %
%  ret_val = error code or program ret_val    %
%  -11111112 = invalid jump location          %
%  -11111113 = out-of-bounds memory access    %
%  -11111114 = division by zero               %
%  -11111115 = infinite loop                  %
%  -11111116 = unknown operation code         %
%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%
@execute_program:
 mov m_inst_addr m_data_offs

 movv rcnt 10000000 % execution limit
 @execute_loop:
  subv m_inst_addr 1
  ld ra m_inst_addr
  subv m_inst_addr 1
  ld rb m_inst_addr
  subv m_inst_addr 1
  ld rc m_inst_addr

  % ra = opcode, rb = arg1, rc = arg2

  mov rd ra
  jl @execute_error_opcode rd
  subv rd $dbgext
  jg @execute_error_opcode rd

  % switch as binary search tree

";

const EXECUTE_END: &str = "\
  @execute_continue:

  subv rcnt 1
  jg @execute_loop rcnt
  jr @execute_error_infloop
 @execute_loopend:

 mov ra m_data_offs
 addv ra ret_val
 ld ret_val ra

 jr @execute_errorend
 @execute_error_jump:
  dbg rb
  movv ret_val -11111112
  jr @execute_errorend
 @execute_error_bounds:
  dbg rd
  movv ret_val -11111113
  jr @execute_errorend
 @execute_error_divzero:
  movv ret_val -11111114
  jr @execute_errorend
 @execute_error_infloop:
  movv ret_val -11111115
  jr @execute_errorend
 @execute_error_opcode:
  movv ret_val -11111116
 @execute_errorend:

 addv top 1
 ld ra top
 ja ra
";

/// Emits the self-interpreter as assembly text. The caller appends a
/// `@main:` entry point (and whatever nested program it wants interpreted)
/// after this text before assembling the two together — `generate()`'s
/// output only defines `@execute_program` and jumps straight to `@main`.
pub fn generate() -> String {
    let mut out = String::new();
    out.push_str("%%% auto-generated begin: do not edit %%%\n\n");
    out.push_str("%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%\n");
    out.push_str("%%% Self-interpreting VM %%%\n");
    out.push_str("%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%\n");

    for (i, name) in REGISTERS.iter().enumerate() {
        out.push_str(&format!("def {} {}\n", name, i));
    }
    out.push('\n');

    out.push_str("jr @main\n\n");
    out.push_str(EXECUTE_BEGIN);

    gen_dispatch(&mut out, 0, opcode::MNEMONICS.len() as i32 - 1, 2);

    out.push_str(EXECUTE_END);
    out.push_str("\n%%% auto-generated end %%%\n");
    out
}

#[cfg(test)]
mod test;

#[cfg(test)]
mod unit_test {
    use super::*;

    #[test]
    fn defines_every_register_slot_and_jumps_to_main_first() {
        let text = generate();
        for (i, name) in REGISTERS.iter().enumerate() {
            assert!(text.contains(&format!("def {} {}", name, i)));
        }
        assert!(text.find("jr @main").unwrap() < text.find("@execute_program:").unwrap());
    }

    #[test]
    fn every_opcode_has_exactly_one_dispatch_leaf() {
        let text = generate();
        for mnemonic in opcode::MNEMONICS.iter() {
            let marker = format!("% {}\n", mnemonic);
            assert_eq!(text.matches(&marker).count(), 1, "missing or duplicated leaf for {}", mnemonic);
        }
    }

    #[test]
    fn dispatch_tree_has_one_fewer_internal_node_than_leaves() {
        let text = generate();
        let internal_nodes = text.matches("jg @execute_after_").count();
        assert_eq!(internal_nodes, opcode::MNEMONICS.len() - 1);
    }
}
