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

pub mod ebcdic;
pub mod extended;
pub mod format;

use crate::errors::DisasmError;
use format::{Flavor, Format, Instruction, parse_hint, parse_recipe, parse_template};
use std::collections::HashMap;

const FORMAT_DEFS: &str = include_str!("formats.def");
const OPCODE_DEFS: &str = include_str!("opcodes.def");
const SVC_DEFS: &str = include_str!("svc.def");

// An opcode lives at one of four nibble positions of the 12-nibble
// window: the first byte, the first byte plus the fourth nibble, the
// first and last byte, or the first two bytes.
pub struct Tables {
    pub formats: Vec<Format>,
    pub instructions: Vec<Instruction>,
    by_byte: HashMap<String, usize>,
    by_byte_nib: HashMap<String, usize>,
    by_first_last: HashMap<String, usize>,
    by_two_bytes: HashMap<String, usize>,
    svc: HashMap<u32, String>,
}

impl Tables {
    pub fn load() -> Result<Tables, DisasmError> {
        let formats = load_formats(FORMAT_DEFS)?;
        let mut tables = Tables {
            formats,
            instructions: Vec::new(),
            by_byte: HashMap::new(),
            by_byte_nib: HashMap::new(),
            by_first_last: HashMap::new(),
            by_two_bytes: HashMap::new(),
            svc: load_svc(SVC_DEFS)?,
        };
        tables.load_instructions(OPCODE_DEFS)?;
        Ok(tables)
    }

    pub fn format_of(&self, instr: &Instruction) -> &Format {
        &self.formats[instr.format]
    }

    pub fn svc_desc(&self, code: u32) -> Option<&str> {
        self.svc.get(&code).map(String::as_str)
    }

    // Probe order is load-bearing: first byte, byte plus fourth nibble,
    // first and last byte (E-row only, never E5), first two bytes.
    // First hit wins.
    pub fn lookup(&self, window: &str) -> Option<&Instruction> {
        let aa = &window[0..2];
        if let Some(&idx) = self.by_byte.get(aa) {
            return Some(&self.instructions[idx]);
        }
        let ccc = format!("{}{}", aa, &window[3..4]);
        if let Some(&idx) = self.by_byte_nib.get(&ccc) {
            return Some(&self.instructions[idx]);
        }
        if window.starts_with('E') && aa != "E5" {
            let dddd = format!("{}{}", aa, &window[10..12]);
            if let Some(&idx) = self.by_first_last.get(&dddd) {
                return Some(&self.instructions[idx]);
            }
        }
        if let Some(&idx) = self.by_two_bytes.get(&window[0..4]) {
            return Some(&self.instructions[idx]);
        }
        None
    }

    fn load_instructions(&mut self, defs: &str) -> Result<(), DisasmError> {
        let mut seen_mnemonics: HashMap<String, ()> = HashMap::new();
        for (number, line) in defs.lines().enumerate() {
            let line_no = number + 1;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let columns: Vec<&str> = text.split_whitespace().collect();
            if columns.len() < 5 {
                return Err(DisasmError::TableSyntax {
                    line: line_no,
                    reason: "expected opcode, mnemonic, format, flavor, hint".to_string(),
                });
            }
            let opcode = columns[0].to_string();
            let mnemonic = columns[1].to_string();
            let format_name = columns[2];
            let flavor = Flavor::from_name(columns[3]).ok_or_else(|| DisasmError::TableSyntax {
                line: line_no,
                reason: format!("unknown flavor {}", columns[3]),
            })?;
            let hint = parse_hint(columns[4], line_no)?;
            let desc = columns[5..].join(" ");

            let format = self
                .formats
                .iter()
                .position(|f| f.name == format_name)
                .ok_or_else(|| DisasmError::UnknownFormat {
                    mnemonic: mnemonic.clone(),
                    format: format_name.to_string(),
                })?;

            if seen_mnemonics.insert(mnemonic.clone(), ()).is_some() {
                return Err(DisasmError::DuplicateMnemonic(mnemonic));
            }

            let idx = self.instructions.len();
            let slot = match opcode.len() {
                2 => &mut self.by_byte,
                3 => &mut self.by_byte_nib,
                4 if opcode.starts_with('E') && !opcode.starts_with("E5") => {
                    if self.formats[format].nibbles != 12 {
                        return Err(DisasmError::TableSyntax {
                            line: line_no,
                            reason: format!(
                                "opcode {} needs a six-byte format for the trailing byte",
                                opcode
                            ),
                        });
                    }
                    &mut self.by_first_last
                }
                4 => &mut self.by_two_bytes,
                _ => {
                    return Err(DisasmError::TableSyntax {
                        line: line_no,
                        reason: format!("opcode {} has an unsupported width", opcode),
                    });
                }
            };
            if slot.insert(opcode.clone(), idx).is_some() {
                return Err(DisasmError::DuplicateOpcode(opcode));
            }

            self.instructions.push(Instruction {
                opcode,
                mnemonic,
                format,
                flavor,
                hint,
                desc,
            });
        }
        Ok(())
    }
}

fn load_formats(defs: &str) -> Result<Vec<Format>, DisasmError> {
    let mut formats: Vec<Format> = Vec::new();
    for (number, line) in defs.lines().enumerate() {
        let line_no = number + 1;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let columns: Vec<&str> = text.split_whitespace().collect();
        if columns.len() != 4 {
            return Err(DisasmError::TableSyntax {
                line: line_no,
                reason: "expected name, length, template, recipe".to_string(),
            });
        }
        let name = columns[0].to_string();
        let nibbles: u32 = columns[1].parse().map_err(|_| DisasmError::TableSyntax {
            line: line_no,
            reason: format!("bad format length {}", columns[1]),
        })?;
        let template = parse_template(columns[2], line_no)?;
        let recipe = parse_recipe(columns[3], line_no)?;

        let width: u32 = template.iter().map(|(_, w)| *w as u32).sum();
        if width != nibbles {
            return Err(DisasmError::TemplateLengthMismatch {
                format: name,
                template: width,
                length: nibbles,
            });
        }
        if formats.iter().any(|f| f.name == name) {
            return Err(DisasmError::TableSyntax {
                line: line_no,
                reason: format!("duplicate format {}", name),
            });
        }
        formats.push(Format {
            name,
            nibbles,
            template,
            recipe,
        });
    }
    Ok(formats)
}

fn load_svc(defs: &str) -> Result<HashMap<u32, String>, DisasmError> {
    let mut svc = HashMap::new();
    for (number, line) in defs.lines().enumerate() {
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let columns: Vec<&str> = text.split_whitespace().collect();
        let code: u32 = columns[0].parse().map_err(|_| DisasmError::TableSyntax {
            line: number + 1,
            reason: format!("bad SVC number {}", columns[0]),
        })?;
        svc.insert(code, columns[1..].join(" "));
    }
    Ok(svc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_load() {
        let tables = Tables::load().unwrap();
        assert!(tables.instructions.len() > 300);
        assert!(tables.formats.len() > 40);
    }

    #[test]
    fn test_lookup_first_byte() {
        let tables = Tables::load().unwrap();
        let instr = tables.lookup("18CF00000000").unwrap();
        assert_eq!(instr.mnemonic, "LR");
        assert_eq!(tables.format_of(instr).name, "RR");
    }

    #[test]
    fn test_lookup_byte_plus_nibble() {
        let tables = Tables::load().unwrap();
        let instr = tables.lookup("A71A00020000").unwrap();
        assert_eq!(instr.mnemonic, "AHI");
    }

    #[test]
    fn test_lookup_first_and_last_byte() {
        let tables = Tables::load().unwrap();
        let instr = tables.lookup("E310D0100004").unwrap();
        assert_eq!(instr.mnemonic, "LG");
        assert_eq!(tables.format_of(instr).name, "RXY");
    }

    #[test]
    fn test_e5_row_uses_two_byte_lookup() {
        let tables = Tables::load().unwrap();
        // E5 is excluded from the first-and-last probe; E544 must match
        // MVHHI through the two-byte table, whatever its last byte is.
        let instr = tables.lookup("E544D0100001").unwrap();
        assert_eq!(instr.mnemonic, "MVHHI");
    }

    #[test]
    fn test_lookup_two_bytes() {
        let tables = Tables::load().unwrap();
        let instr = tables.lookup("B90400CF0000").unwrap();
        assert_eq!(instr.mnemonic, "LGR");
    }

    #[test]
    fn test_lookup_unknown() {
        let tables = Tables::load().unwrap();
        assert!(tables.lookup("000000000000").is_none());
    }

    #[test]
    fn test_svc_descriptions() {
        let tables = Tables::load().unwrap();
        assert_eq!(tables.svc_desc(13), Some("ABEND"));
        assert_eq!(tables.svc_desc(35), Some("WTO/WTOR"));
        assert_eq!(tables.svc_desc(255), None);
    }
}
