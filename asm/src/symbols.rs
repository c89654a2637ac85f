//! Symbol table (component D): labels, named constants, and the opcode
//! mnemonics, pre-populated at construction time.

use std::collections::HashMap;

use mvm::opcode::{self, OpCode};

pub struct Symbols {
    pub labels: HashMap<String, i32>,
    pub consts: HashMap<String, i32>,
    pub opcodes: HashMap<String, OpCode>,
    pub last_const: i32,
}

impl Symbols {
    /// Seeds `opcodes` with every mnemonic and `consts` with a `$`-prefixed
    /// constant for each opcode's numeric value (e.g. `$dbgext`), matching
    /// the reference initializer.
    pub fn new() -> Symbols {
        let mut consts = HashMap::new();
        let mut opcodes = HashMap::new();
        for &name in opcode::MNEMONICS.iter() {
            let code = opcode::by_name(name).expect("mnemonic table is self-consistent");
            opcodes.insert(name.to_string(), code);
            consts.insert(format!("${}", name), code.code());
        }
        Symbols { labels: HashMap::new(), consts, opcodes, last_const: -1 }
    }

    pub fn opcode(&self, mnemonic: &str) -> Option<OpCode> {
        self.opcodes.get(mnemonic).copied()
    }

    pub fn lookup_value(&self, name: &str) -> Option<i32> {
        self.consts.get(name).copied()
    }

    pub fn lookup_label(&self, name: &str) -> Option<i32> {
        self.labels.get(name).copied()
    }

    /// Returns `false` if `name` was already a label (the caller reports a
    /// duplicate-label error in that case).
    pub fn define_label(&mut self, name: &str, inst_offs: i32) -> bool {
        if self.labels.contains_key(name) {
            false
        } else {
            self.labels.insert(name.to_string(), inst_offs);
            true
        }
    }

    pub fn define_enum(&mut self, name: &str) {
        self.last_const += 1;
        self.consts.insert(name.to_string(), self.last_const);
    }

    pub fn define_def(&mut self, name: &str, value: i32) {
        self.last_const = value;
        self.consts.insert(name.to_string(), self.last_const);
    }
}

impl Default for Symbols {
    fn default() -> Symbols {
        Symbols::new()
    }
}
