//! Two-pass assembler (component E): pass 0 discovers labels and
//! constants, pass 1 resolves operands and emits operations. Both passes
//! walk the same pre-tokenized buffer rather than re-lexing it.

use mvm::{OpCode, Operation, INST_SIZE};

use crate::error::AssembleError;
use crate::lexer::{self, tokenize, Token};
use crate::symbols::Symbols;

#[derive(Clone, Copy)]
enum OperandKind {
    Value,
    Jump,
}

/// Operand roles per opcode, in source order. `lia`'s three operands are
/// handled specially in [`resolve_lia`] and never consult this table.
fn operand_kinds(op: OpCode) -> &'static [OperandKind] {
    use OpCode::*;
    use OperandKind::*;
    match op {
        Nop | Hlt | Dbgext => &[],
        Jr => &[Jump],
        Ja | Dbg => &[Value],
        Jnz | Jz | Jg | Jge | Jl | Jle => &[Jump, Value],
        Mov | Movv | Add | Addv | Sub | Subv | Mul | Mulv | Div | Divv | Ld | St | Stv => {
            &[Value, Value]
        }
        Lia => &[],
    }
}

pub fn assemble(text: &str) -> Result<Vec<Operation>, AssembleError> {
    let tokens = tokenize(text);
    let mut symbols = Symbols::new();
    discover(&tokens, &mut symbols)?;
    emit(&tokens, &symbols)
}

fn next_token<'a>(
    tokens: &[Token<'a>],
    i: &mut usize,
    line: u32,
    context: &str,
) -> Result<Token<'a>, AssembleError> {
    match tokens.get(*i) {
        Some(&t) => {
            *i += 1;
            Ok(t)
        }
        None => Err(AssembleError::MissingOperand { line, context: context.to_string() }),
    }
}

fn discover(tokens: &[Token], symbols: &mut Symbols) -> Result<(), AssembleError> {
    let mut inst_offs: i32 = 0;
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        i += 1;
        if let Some(name) = tok.text.strip_suffix(':') {
            if !symbols.define_label(name, inst_offs) {
                return Err(AssembleError::DuplicateLabel {
                    line: tok.line,
                    name: name.to_string(),
                });
            }
            continue;
        }
        match tok.text {
            "enum" => {
                let arg = next_token(tokens, &mut i, tok.line, "enum")?;
                if symbols.consts.contains_key("enum") {
                    return Err(AssembleError::DuplicateDirective {
                        line: tok.line,
                        directive: "enum",
                        name: arg.text.to_string(),
                    });
                }
                symbols.define_enum(arg.text);
            }
            "def" => {
                let name_tok = next_token(tokens, &mut i, tok.line, "def")?;
                let value_tok = next_token(tokens, &mut i, tok.line, "def")?;
                if symbols.consts.contains_key("def") {
                    return Err(AssembleError::DuplicateDirective {
                        line: tok.line,
                        directive: "def",
                        name: name_tok.text.to_string(),
                    });
                }
                let value = lexer::parse_integer(value_tok.text).ok_or_else(|| {
                    AssembleError::MalformedInteger {
                        line: value_tok.line,
                        token: value_tok.text.to_string(),
                    }
                })?;
                symbols.define_def(name_tok.text, value);
            }
            mnemonic => {
                let op = symbols.opcode(mnemonic).ok_or_else(|| AssembleError::UnknownMnemonic {
                    line: tok.line,
                    token: mnemonic.to_string(),
                })?;
                let arity = mvm::opcode::arity(op);
                for _ in 0..arity {
                    next_token(tokens, &mut i, tok.line, mnemonic)?;
                }
                inst_offs += INST_SIZE;
            }
        }
    }
    Ok(())
}

fn resolve_value(tok: Token, symbols: &Symbols) -> Result<i32, AssembleError> {
    if let Some(v) = symbols.lookup_value(tok.text) {
        Ok(v)
    } else if let Some(v) = lexer::parse_integer(tok.text) {
        Ok(v)
    } else {
        Err(AssembleError::UnresolvedOperand { line: tok.line, token: tok.text.to_string() })
    }
}

fn resolve_jump(tok: Token, inst_offs: i32, symbols: &Symbols) -> Result<i32, AssembleError> {
    if let Some(label_offs) = symbols.lookup_label(tok.text) {
        Ok(inst_offs - label_offs)
    } else if let Some(v) = lexer::parse_integer(tok.text) {
        Ok(v)
    } else {
        Err(AssembleError::UnresolvedOperand { line: tok.line, token: tok.text.to_string() })
    }
}

fn resolve_lia(
    tokens: &[Token],
    i: &mut usize,
    line: u32,
    inst_offs: i32,
    symbols: &Symbols,
) -> Result<(i32, i32), AssembleError> {
    let dest_tok = next_token(tokens, i, line, "lia")?;
    let label_tok = next_token(tokens, i, line, "lia")?;
    let offset_tok = next_token(tokens, i, line, "lia")?;
    let dest = resolve_value(dest_tok, symbols)?;
    let label_component = resolve_jump(label_tok, inst_offs, symbols)?;
    let numeric_offset = resolve_value(offset_tok, symbols)?;
    Ok((dest, label_component.wrapping_add(numeric_offset)))
}

fn emit(tokens: &[Token], symbols: &Symbols) -> Result<Vec<Operation>, AssembleError> {
    let mut ops = Vec::new();
    let mut inst_offs: i32 = 0;
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        i += 1;
        if tok.text.ends_with(':') {
            continue;
        }
        match tok.text {
            "enum" => {
                next_token(tokens, &mut i, tok.line, "enum")?;
            }
            "def" => {
                next_token(tokens, &mut i, tok.line, "def")?;
                next_token(tokens, &mut i, tok.line, "def")?;
            }
            mnemonic => {
                let op = symbols.opcode(mnemonic).ok_or_else(|| AssembleError::UnknownMnemonic {
                    line: tok.line,
                    token: mnemonic.to_string(),
                })?;
                let (arg1, arg2) = if op == OpCode::Lia {
                    resolve_lia(tokens, &mut i, tok.line, inst_offs, symbols)?
                } else {
                    let mut vals = [0i32; 2];
                    for (slot, kind) in operand_kinds(op).iter().enumerate() {
                        let t = next_token(tokens, &mut i, tok.line, mnemonic)?;
                        vals[slot] = match kind {
                            OperandKind::Value => resolve_value(t, symbols)?,
                            OperandKind::Jump => resolve_jump(t, inst_offs, symbols)?,
                        };
                    }
                    (vals[0], vals[1])
                };
                ops.push(Operation::new(op, arg1, arg2));
                inst_offs += INST_SIZE;
            }
        }
    }
    Ok(ops)
}

#[cfg(test)]
mod test {
    use super::*;
    use mvm::{Machine, RunResult};

    fn assemble_and_run(text: &str) -> (Machine, RunResult) {
        let ops = assemble(text).expect("assembly should succeed");
        let mut m = Machine::new(&ops);
        let mut sink = std::io::sink();
        let result = m.run(&mut sink);
        (m, result)
    }

    #[test]
    fn add_two_immediates() {
        let (m, result) = assemble_and_run("movv 0 3\nmovv 1 4\nadd 0 1\nhlt");
        assert_eq!(result, RunResult::Halt);
        assert_eq!(m.mem[m.data_offset as usize], 7);
        assert_eq!(m.cycles, 3);
    }

    #[test]
    fn forward_and_backward_labels_resolve() {
        let (m, result) = assemble_and_run(
            "movv 0 5\n@loop:\nsubv 0 1\njg @loop 0\nhlt",
        );
        assert_eq!(result, RunResult::Halt);
        assert_eq!(m.mem[m.data_offset as usize], 0);
    }

    #[test]
    fn dollar_opcode_constants_are_usable_as_integers() {
        let (m, result) = assemble_and_run("movv 0 $hlt\nhlt");
        assert_eq!(result, RunResult::Halt);
        assert_eq!(m.mem[m.data_offset as usize], OpCode::Hlt.code());
    }

    #[test]
    fn enum_assigns_sequential_constants() {
        let ops = assemble("enum red\nenum green\nmovv 0 red\nmovv 1 green\nhlt").unwrap();
        assert_eq!(ops[0], Operation::new(OpCode::Movv, 0, 0));
        assert_eq!(ops[1], Operation::new(OpCode::Movv, 1, 1));
    }

    #[test]
    fn def_sets_an_explicit_constant() {
        let ops = assemble("def forty_two 42\nmovv 0 forty_two\nhlt").unwrap();
        assert_eq!(ops[0], Operation::new(OpCode::Movv, 0, 42));
    }

    #[test]
    fn unknown_mnemonic_is_rejected() {
        let err = assemble("frobnicate 0 1").unwrap_err();
        assert!(matches::matches!(err, AssembleError::UnknownMnemonic { .. }));
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let err = assemble("@a:\nnop\n@a:\nhlt").unwrap_err();
        assert!(matches::matches!(err, AssembleError::DuplicateLabel { .. }));
    }

    #[test]
    fn comments_and_blank_lines_do_not_affect_label_offsets() {
        let ops = assemble("% a comment\nnop\n\n@target:\nhlt\njr @target").unwrap();
        // `jr @target` at index 2 jumping back to index 1 ("@target" == hlt).
        assert_eq!(ops[2].arg1, INST_SIZE); // inst_offs(2) - label_offs(1) == 3
    }

    #[test]
    fn lia_folds_label_and_numeric_offset_into_one_value() {
        let ops = assemble("lia 0 @target 1\n@target:\nhlt").unwrap();
        // from index 0 to index 1: label component is 0 - 1*InstSize = -3, plus the
        // explicit +1 offset.
        assert_eq!(ops[0].arg2, -INST_SIZE + 1);
    }

    #[test]
    fn include_like_directive_names_do_not_defeat_the_preseeded_duplicate_guard() {
        // A user constant literally named "enum" makes the (buggy) duplicate
        // check on a later `enum` trip, as in the reference implementation.
        let err = assemble("def enum 0\nenum a\nhlt").unwrap_err();
        assert!(matches::matches!(err, AssembleError::DuplicateDirective { .. }));
    }
}
