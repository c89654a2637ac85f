//! Assembles and runs an mvm program from a source file.

#[macro_use]
extern crate clap;

use std::fs::File;
use std::io::{self, BufWriter, Write as _};

use byteorder::{LittleEndian, WriteBytesExt};
use clap::Arg;

use asm::{SourceLoader, SourceMap};
use mvm::{Machine, RunResult};

struct FsLoader;

impl SourceLoader for FsLoader {
    type Error = io::Error;

    fn load(&mut self, path: &str) -> Result<String, io::Error> {
        std::fs::read_to_string(path)
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the assembly file to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("max_cycles")
                .long("max-cycles")
                .takes_value(true)
                .value_name("CYCLES")
                .help("Overrides the execution cycle limit"),
        )
        .arg(
            Arg::with_name("dump")
                .long("dump")
                .help("Prints a memory dump after execution"),
        )
        .arg(
            Arg::with_name("source_map")
                .short("m")
                .long("source-map")
                .takes_value(true)
                .value_name("SOURCE_MAP")
                .help("Writes the source line map to a file"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let dump = matches.is_present("dump");
    let source_map_path = matches.value_of("source_map");
    let max_cycles = if matches.is_present("max_cycles") {
        Some(value_t!(matches, "max_cycles", u64).unwrap_or_else(|e| e.exit()))
    } else {
        None
    };

    std::process::exit(run(input, max_cycles, dump, source_map_path));
}

fn run(input: &str, max_cycles: Option<u64>, dump: bool, source_map_path: Option<&str>) -> i32 {
    let mut loader = FsLoader;
    let (ops, map) = match asm::assemble_source_with_map(&mut loader, input) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("{}", err);
            return 1;
        }
    };

    if let Some(path) = source_map_path {
        if let Err(err) = write_source_map(&map, path) {
            eprintln!("writing source map \"{}\" failed: {}", path, err);
            return 1;
        }
    }

    let mut machine = Machine::new(&ops);
    if let Some(limit) = max_cycles {
        machine.max_cycles = limit;
    }

    let mut dbg_out = io::stdout();
    let result = machine.run(&mut dbg_out);

    if dump {
        dump_machine(&machine, 128, 32);
    }
    println!("{}", result);

    if result == RunResult::Halt { 0 } else { 1 }
}

fn write_source_map(map: &SourceMap, path: &str) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in map.iter() {
        writer.write_u32::<LittleEndian>(item.merged_line)?;
        writer.write_u32::<LittleEndian>(item.local_line)?;
        let file_bytes = item.file.as_bytes();
        writer.write_u32::<LittleEndian>(file_bytes.len() as u32)?;
        writer.write_all(file_bytes)?;
    }
    Ok(())
}

/// Disassembles the code region and prints the head of the data region,
/// mirroring the reference interpreter's own post-mortem dump.
fn dump_machine(m: &Machine, inst_count: i32, data_count: i32) {
    println!("------------");
    println!("memory dump:");
    let start = std::cmp::max(0, m.data_offset - inst_count * mvm::INST_SIZE);
    let mut i = start;
    while i < m.data_offset {
        let idx = i as usize;
        let opcode_word = m.mem[idx + 2];
        let mnemonic = mvm::opcode::mnemonic(opcode_word).unwrap_or("invalid");
        println!("{} [{}]: {} {} {}", i, i - m.data_offset, m.mem[idx], m.mem[idx + 1], mnemonic);
        i += mvm::INST_SIZE;
    }
    println!("------------");
    let end = std::cmp::min(m.data_offset + data_count, m.mem_size);
    for i in m.data_offset..end {
        println!("{} [{}]: {}", i, i - m.data_offset, m.mem[i as usize]);
    }
}
