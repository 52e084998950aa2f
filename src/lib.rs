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

pub mod ast;
pub mod engine;
pub mod errors;
pub mod parser;
pub mod symbols;
pub mod tables;

use anyhow::{Context, Result};

// Session options the CLI (or a caller) hands to the engine.
#[derive(Debug, Default, Clone)]
pub struct Options {
    pub start: u64,
    pub section: Option<String>,
    pub stats: bool,
    pub symbols: Vec<symbols::Symbol>,
}

// The rendered listing plus the feedback counters the iterative
// workflow lives on.
#[derive(Debug)]
pub struct Disassembly {
    pub listing: String,
    pub statements: usize,
    pub todos: u32,
    pub undefined: usize,
}

pub fn disassemble(source: &str, options: &Options) -> Result<Disassembly> {
    let tables = tables::Tables::load().context("Failed to load the opcode tables")?;

    let tokens = parser::parse_stream(source).context("Failed during annotation parsing")?;

    let mut engine = engine::Engine::new(&tables, options);
    engine.run(&tokens);

    Ok(engine.into_listing())
}
