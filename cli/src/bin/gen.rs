//! Writes the self-interpreter's generated assembly to a file.

#[macro_use]
extern crate clap;

use std::fs;

use clap::Arg;

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("OUTPUT")
                .help("Sets the file to write the generated assembly to")
                .required(true)
                .index(1),
        )
        .get_matches();

    let output = matches.value_of("OUTPUT").unwrap();
    let text = selfgen::generate();

    if let Err(err) = fs::write(output, text) {
        eprintln!("writing \"{}\" failed: {}", output, err);
        std::process::exit(1);
    }
}
