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

use crate::errors::DisasmError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Wire form of a symbol-table extractor entry: locations travel as hex.
#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawSymbol {
    name: String,
    loc: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub loc: u64,
}

pub fn load_symbols(path: &Path) -> Result<Vec<Symbol>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read symbols file: {}", path.display()))?;
    parse_symbols(&text)
}

pub fn parse_symbols(text: &str) -> Result<Vec<Symbol>> {
    let raw: Vec<RawSymbol> = serde_json::from_str(text).context("Bad symbols JSON")?;
    let mut symbols = Vec::with_capacity(raw.len());
    for entry in raw {
        let loc =
            u64::from_str_radix(&entry.loc, 16).map_err(|_| DisasmError::BadSymbol {
                reason: format!("bad location {} for symbol {}", entry.loc, entry.name),
            })?;
        symbols.push(Symbol {
            name: entry.name,
            loc,
        });
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols() {
        let symbols =
            parse_symbols(r#"[{"name":"ENTRY","loc":"0"},{"name":"SAVEAREA","loc":"1C0"}]"#)
                .unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[1].name, "SAVEAREA");
        assert_eq!(symbols[1].loc, 0x1C0);
    }

    #[test]
    fn test_bad_location_is_rejected() {
        assert!(parse_symbols(r#"[{"name":"A","loc":"ZZ"}]"#).is_err());
    }
}
