/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use anyhow::{Context, Result};
use clap::Parser as clap_parser;
use std::fs;
use std::path::PathBuf;
use zdasm::{Options, disassemble, symbols};

#[derive(clap_parser)]
#[clap(version = "0.1.0", author = "Connor Nolan")]
struct Opts {
    /// Annotated hex input file
    #[clap(short, long)]
    input: PathBuf,
    /// Listing output file (stdout when omitted)
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Initial location counter, in hex
    #[clap(long)]
    start: Option<String>,
    /// Section name for the START statement
    #[clap(long)]
    name: Option<String>,
    /// Emit the format/mnemonic statistics sections
    #[clap(long)]
    stat: bool,
    /// Pre-known symbols, a JSON list of name/loc pairs
    #[clap(long)]
    symbols: Option<PathBuf>,
}

fn main() -> Result<()> {
    let opts: Opts = Opts::parse();

    let source = fs::read_to_string(&opts.input)
        .with_context(|| format!("Failed to read input file: {}", opts.input.display()))?;

    let mut options = Options {
        section: opts.name.clone(),
        stats: opts.stat,
        ..Options::default()
    };
    if let Some(start) = &opts.start {
        options.start = u64::from_str_radix(start.trim_start_matches("0x"), 16)
            .with_context(|| format!("Bad start location: {}", start))?;
    }
    if let Some(path) = &opts.symbols {
        options.symbols = symbols::load_symbols(path)?;
    }

    let result = disassemble(&source, &options)?;

    match &opts.output {
        Some(path) => fs::write(path, &result.listing)?,
        None => print!("{}", result.listing),
    }
    eprintln!(
        "Disassembled {}: {} statements, {} TODO, {} undefined labels",
        opts.input.display(),
        result.statements,
        result.todos,
        result.undefined
    );

    Ok(())
}
