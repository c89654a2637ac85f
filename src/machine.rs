//! Instruction memory layout (component F) and the reference interpreter
//! (component G).

use std::io::Write;

use num_traits::FromPrimitive;

use crate::opcode::OpCode;
use crate::operation::Operation;

pub const INST_SIZE: i32 = 3;

/// Margin added to the instruction count to obtain `data_offset`, and to
/// `data_offset` to obtain `mem_size`. These match the reference defaults;
/// an embedder may pick smaller margins for tests via [`Machine::with_margins`].
pub const DATA_OFFSET_MARGIN: i32 = 100_000;
pub const MEM_SIZE_MARGIN: i32 = 1_000_000;
pub const DEFAULT_MAX_CYCLES: u64 = 500_000_000;

/// Outcome of a single step or a full run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunResult {
    /// Execution may continue; never observed as the final result of [`Machine::run`].
    Continue,
    Halt,
    InfiniteLoop,
    InvalidInstAddr,
    InvalidDataAddr,
    InvalidJumpAddr,
    InvalidOpCode,
    DivByZero,
}

impl RunResult {
    pub fn is_terminal(self) -> bool {
        self != RunResult::Continue
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            RunResult::Continue => "continue",
            RunResult::Halt => "halt",
            RunResult::InfiniteLoop => "infinite loop",
            RunResult::InvalidInstAddr => "invalid instruction address",
            RunResult::InvalidDataAddr => "invalid data address",
            RunResult::InvalidJumpAddr => "invalid jump address",
            RunResult::InvalidOpCode => "invalid opcode",
            RunResult::DivByZero => "division by zero",
        };
        write!(f, "{}", s)
    }
}

/// Machine state: a flat word-addressed memory split into a code region
/// `[0, data_offset)` and a data region `[data_offset, mem_size)`.
pub struct Machine {
    pub mem: Vec<i32>,
    pub data_offset: i32,
    pub mem_size: i32,
    pub inst_addr: i32,
    pub cycles: u64,
    pub max_cycles: u64,
    pub last_dbgext_cycles: u64,
}

impl Machine {
    /// Lays `ops` out in memory using the reference margins.
    pub fn new(ops: &[Operation]) -> Machine {
        Machine::with_margins(ops, DATA_OFFSET_MARGIN, MEM_SIZE_MARGIN)
    }

    /// Lays `ops` out in memory using caller-chosen margins. Smaller margins
    /// are convenient in tests that want to exercise out-of-bounds access
    /// without allocating the reference megabyte-scale `Vec`.
    pub fn with_margins(ops: &[Operation], data_offset_margin: i32, mem_size_margin: i32) -> Machine {
        let data_offset = ops.len() as i32 + data_offset_margin;
        let mem_size = data_offset + mem_size_margin;
        let mut mem = vec![0i32; mem_size as usize];
        for (i, op) in ops.iter().enumerate() {
            let top = data_offset - INST_SIZE * (i as i32 + 1) + 2;
            mem[top as usize] = op.code.code();
            mem[(top - 1) as usize] = op.arg1;
            mem[(top - 2) as usize] = op.arg2;
        }
        Machine {
            mem,
            data_offset,
            mem_size,
            inst_addr: data_offset,
            cycles: 0,
            max_cycles: DEFAULT_MAX_CYCLES,
            last_dbgext_cycles: 0,
        }
    }

    /// Runs until a terminal [`RunResult`] is produced.
    pub fn run(&mut self, dbg_out: &mut dyn Write) -> RunResult {
        loop {
            match self.step(dbg_out) {
                RunResult::Continue => continue,
                other => return other,
            }
        }
    }

    /// Executes a single instruction. `dbg_out` receives `dbg`/`dbgext` trace lines.
    pub fn step(&mut self, dbg_out: &mut dyn Write) -> RunResult {
        self.inst_addr -= INST_SIZE;
        if self.inst_addr < 0 || self.inst_addr as i64 + 2 >= self.mem_size as i64 {
            return RunResult::InvalidInstAddr;
        }
        let ia = self.inst_addr as usize;
        let opcode_word = self.mem[ia + 2];
        let arg1 = self.mem[ia + 1];
        let arg2 = self.mem[ia];

        let op = match OpCode::from_i32(opcode_word) {
            Some(op) => op,
            None => return RunResult::InvalidOpCode,
        };

        match self.execute(op, arg1, arg2, dbg_out) {
            Ok(()) => {
                self.cycles += 1;
                if self.cycles >= self.max_cycles {
                    RunResult::InfiniteLoop
                } else {
                    RunResult::Continue
                }
            }
            Err(result) => result,
        }
    }

    fn resolve_addr(&self, arg: i32) -> Result<usize, RunResult> {
        let a = arg as i64 + self.data_offset as i64;
        if a < 0 || a >= self.mem_size as i64 {
            Err(RunResult::InvalidDataAddr)
        } else {
            Ok(a as usize)
        }
    }

    fn jump(&mut self, base: i32, rel: i32) -> Result<(), RunResult> {
        if rel % INST_SIZE != 0 {
            return Err(RunResult::InvalidJumpAddr);
        }
        let t = base as i64 + rel as i64;
        if t < 0 || t >= self.mem_size as i64 {
            return Err(RunResult::InvalidJumpAddr);
        }
        self.inst_addr = t as i32 + INST_SIZE;
        Ok(())
    }

    fn cond_jump(&mut self, rel: i32, test_arg: i32, pred: fn(i32) -> bool) -> Result<(), RunResult> {
        let a = self.resolve_addr(test_arg)?;
        if pred(self.mem[a]) {
            self.jump(self.inst_addr, rel)?;
        }
        Ok(())
    }

    fn execute(
        &mut self,
        op: OpCode,
        arg1: i32,
        arg2: i32,
        dbg_out: &mut dyn Write,
    ) -> Result<(), RunResult> {
        use OpCode::*;
        match op {
            Nop => Ok(()),
            Hlt => Err(RunResult::Halt),
            Jr => self.jump(self.inst_addr, arg1),
            Ja => {
                let a = self.resolve_addr(arg1)?;
                let r = self.mem[a].wrapping_add(1);
                self.jump(self.data_offset - INST_SIZE, r)
            }
            Jnz => self.cond_jump(arg1, arg2, |v| v != 0),
            Jz => self.cond_jump(arg1, arg2, |v| v == 0),
            Jg => self.cond_jump(arg1, arg2, |v| v > 0),
            Jge => self.cond_jump(arg1, arg2, |v| v >= 0),
            Jl => self.cond_jump(arg1, arg2, |v| v < 0),
            Jle => self.cond_jump(arg1, arg2, |v| v <= 0),
            Lia => {
                let top = self.inst_addr.wrapping_add(INST_SIZE - 1);
                let value = top.wrapping_add(arg2).wrapping_sub(self.data_offset);
                let dest = self.resolve_addr(arg1)?;
                self.mem[dest] = value;
                Ok(())
            }
            Ld => {
                let dest = self.resolve_addr(arg1)?;
                let pointer = self.resolve_addr(arg2)?;
                let src = self.resolve_addr(self.mem[pointer])?;
                self.mem[dest] = self.mem[src];
                Ok(())
            }
            St => {
                let pointer = self.resolve_addr(arg1)?;
                let dest = self.resolve_addr(self.mem[pointer])?;
                let src = self.resolve_addr(arg2)?;
                self.mem[dest] = self.mem[src];
                Ok(())
            }
            Stv => {
                let pointer = self.resolve_addr(arg1)?;
                let dest = self.resolve_addr(self.mem[pointer])?;
                self.mem[dest] = arg2;
                Ok(())
            }
            Mov => {
                let dest = self.resolve_addr(arg1)?;
                let src = self.resolve_addr(arg2)?;
                self.mem[dest] = self.mem[src];
                Ok(())
            }
            Add => self.binop(arg1, arg2, i32::wrapping_add),
            Sub => self.binop(arg1, arg2, i32::wrapping_sub),
            Mul => self.binop(arg1, arg2, i32::wrapping_mul),
            Div => {
                let dest = self.resolve_addr(arg1)?;
                let src = self.resolve_addr(arg2)?;
                let divisor = self.mem[src];
                if divisor == 0 {
                    return Err(RunResult::DivByZero);
                }
                self.mem[dest] = self.mem[dest].wrapping_div(divisor);
                Ok(())
            }
            Movv => {
                let dest = self.resolve_addr(arg1)?;
                self.mem[dest] = arg2;
                Ok(())
            }
            Addv => self.binopv(arg1, arg2, i32::wrapping_add),
            Subv => self.binopv(arg1, arg2, i32::wrapping_sub),
            Mulv => self.binopv(arg1, arg2, i32::wrapping_mul),
            Divv => {
                let dest = self.resolve_addr(arg1)?;
                if arg2 == 0 {
                    return Err(RunResult::DivByZero);
                }
                self.mem[dest] = self.mem[dest].wrapping_div(arg2);
                Ok(())
            }
            Dbg => {
                let addr = self.resolve_addr(arg1)?;
                let _ = writeln!(dbg_out, "dbg {} [{}]: {}", addr, arg1, self.mem[addr]);
                Ok(())
            }
            Dbgext => {
                let diff = self.cycles.wrapping_sub(self.last_dbgext_cycles);
                let _ = writeln!(dbg_out, "base cycles = {}, diff = {}", self.cycles, diff);
                self.last_dbgext_cycles = self.cycles;
                Ok(())
            }
        }
    }

    fn binop(&mut self, arg1: i32, arg2: i32, f: fn(i32, i32) -> i32) -> Result<(), RunResult> {
        let dest = self.resolve_addr(arg1)?;
        let src = self.resolve_addr(arg2)?;
        let rhs = self.mem[src];
        self.mem[dest] = f(self.mem[dest], rhs);
        Ok(())
    }

    fn binopv(&mut self, arg1: i32, arg2: i32, f: fn(i32, i32) -> i32) -> Result<(), RunResult> {
        let dest = self.resolve_addr(arg1)?;
        self.mem[dest] = f(self.mem[dest], arg2);
        Ok(())
    }
}
