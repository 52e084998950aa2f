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

// Every named nibble slot an instruction format can carry. OP/OP2 hold
// opcode nibbles, Pad covers reserved slots; neither emits operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Op,
    Op2,
    R1,
    R2,
    R3,
    V1,
    V2,
    V3,
    V4,
    Rxb,
    B1,
    B2,
    B4,
    X2,
    D1,
    D2,
    D4,
    Dl1,
    Dl2,
    Dh1,
    Dh2,
    I1,
    I2,
    I3,
    I4,
    I5,
    I6,
    Ri1,
    Ri2,
    Ri3,
    Ri4,
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    L1,
    L2,
    O1,
    O2,
    Pad,
}

impl Field {
    pub fn from_name(name: &str) -> Option<Field> {
        let field = match name {
            "OP" => Field::Op,
            "OP2" => Field::Op2,
            "R1" => Field::R1,
            "R2" => Field::R2,
            "R3" => Field::R3,
            "V1" => Field::V1,
            "V2" => Field::V2,
            "V3" => Field::V3,
            "V4" => Field::V4,
            "RXB" => Field::Rxb,
            "B1" => Field::B1,
            "B2" => Field::B2,
            "B4" => Field::B4,
            "X2" => Field::X2,
            "D1" => Field::D1,
            "D2" => Field::D2,
            "D4" => Field::D4,
            "DL1" => Field::Dl1,
            "DL2" => Field::Dl2,
            "DH1" => Field::Dh1,
            "DH2" => Field::Dh2,
            "I1" => Field::I1,
            "I2" => Field::I2,
            "I3" => Field::I3,
            "I4" => Field::I4,
            "I5" => Field::I5,
            "I6" => Field::I6,
            "RI1" => Field::Ri1,
            "RI2" => Field::Ri2,
            "RI3" => Field::Ri3,
            "RI4" => Field::Ri4,
            "M1" => Field::M1,
            "M2" => Field::M2,
            "M3" => Field::M3,
            "M4" => Field::M4,
            "M5" => Field::M5,
            "M6" => Field::M6,
            "L1" => Field::L1,
            "L2" => Field::L2,
            "O1" => Field::O1,
            "O2" => Field::O2,
            "_" => Field::Pad,
            _ => return None,
        };
        Some(field)
    }
}

// Values parsed out of one instruction window.
#[derive(Debug, Default, Clone)]
pub struct FieldValues {
    entries: Vec<(Field, u32)>,
}

impl FieldValues {
    pub fn set(&mut self, field: Field, value: u32) {
        for entry in self.entries.iter_mut() {
            if entry.0 == field {
                entry.1 = value;
                return;
            }
        }
        self.entries.push((field, value));
    }

    pub fn get(&self, field: Field) -> u32 {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }
}

// One step of an operand-emission recipe.
#[derive(Debug, Clone, PartialEq)]
pub enum EmitOp {
    Reg(Field),
    VReg(Field),
    UInt(Field),
    SInt { field: Field, nibbles: u8 },
    HexInt(Field),
    Mask(Field),
    OptMask(Field),
    MaskLen(Field),
    BaseDisp { disp: Field, base: Field },
    LongBaseDisp { low: Field, high: Field, base: Field },
    IndexBaseDisp { disp: Field, index: Field, base: Field },
    LongIndexBaseDisp { low: Field, high: Field, index: Field, base: Field },
    LenBaseDisp { disp: Field, len: Field, base: Field },
    RegLenBaseDisp { disp: Field, len: Field, base: Field },
    VecBaseDisp { disp: Field, vec: Field, base: Field },
    Rel { field: Field, nibbles: u8 },
}

// How many bytes an instruction implicitly touches at its memory operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LengthHint {
    None,
    Fixed(u32),
    // L-field plus one, the SS length convention.
    FromLen(Field),
    // popcount of a 4-bit mask (ICM/STCM/CLM).
    MaskLen(Field),
    // (1 + ((R3 - R1) mod 16)) * element size, the load-multiple shape.
    Multiple { first: Field, last: Field, elem: u32 },
}

impl LengthHint {
    pub fn eval(&self, fields: &FieldValues) -> Option<u32> {
        match *self {
            LengthHint::None => None,
            LengthHint::Fixed(n) => Some(n),
            LengthHint::FromLen(f) => Some(fields.get(f) + 1),
            LengthHint::MaskLen(f) => Some(fields.get(f).count_ones()),
            LengthHint::Multiple { first, last, elem } => {
                let span = (fields.get(last).wrapping_sub(fields.get(first))) & 0xF;
                Some((1 + span) * elem)
            }
        }
    }
}

// What an instruction does to the condition code, and which
// post-processing it gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    None,        // .
    Arith,       // A
    Compare,     // C
    TestMask,    // M
    Branch,      // B   (BC/BCR)
    RelBranch,   // R   (BRC/BRCL)
    CompareJump, // CJ
    JumpIndex,   // JX
    OnCond,      // O
    Select,      // S
    Rotate,      // RO
    Rel4,        // plain relative, halfword offset
    Rel8,        // plain relative, long offset
    CondOnly,    // c  (sets the CC in a generic way)
}

impl Flavor {
    pub fn from_name(name: &str) -> Option<Flavor> {
        let flavor = match name {
            "." => Flavor::None,
            "A" => Flavor::Arith,
            "C" => Flavor::Compare,
            "M" => Flavor::TestMask,
            "B" => Flavor::Branch,
            "R" => Flavor::RelBranch,
            "CJ" => Flavor::CompareJump,
            "JX" => Flavor::JumpIndex,
            "O" => Flavor::OnCond,
            "S" => Flavor::Select,
            "RO" => Flavor::Rotate,
            "R4" => Flavor::Rel4,
            "R8" => Flavor::Rel8,
            "c" => Flavor::CondOnly,
            _ => return None,
        };
        Some(flavor)
    }
}

#[derive(Debug, Clone)]
pub struct Format {
    pub name: String,
    pub nibbles: u32,
    pub template: Vec<(Field, u8)>,
    pub recipe: Vec<EmitOp>,
}

impl Format {
    pub fn byte_len(&self) -> usize {
        (self.nibbles / 2) as usize
    }

    pub fn field_width(&self, field: Field) -> Option<u8> {
        self.template
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, w)| *w)
    }

    // Walk the 12-nibble window and pull out every template field.
    pub fn parse_fields(&self, window: &str) -> FieldValues {
        let mut values = FieldValues::default();
        let mut pos = 0usize;
        for &(field, width) in &self.template {
            let end = pos + width as usize;
            let value = u32::from_str_radix(&window[pos..end], 16)
                .expect("window is validated hex");
            if field != Field::Pad {
                values.set(field, value);
            }
            pos = end;
        }
        values
    }
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: String,
    pub mnemonic: String,
    pub format: usize,
    pub flavor: Flavor,
    pub hint: LengthHint,
    pub desc: String,
}

// --- table text parsing ---

pub fn parse_template(text: &str, line: usize) -> Result<Vec<(Field, u8)>, DisasmError> {
    let mut template = Vec::new();
    for part in text.split(',') {
        let (name, width) = part.split_once(':').ok_or_else(|| DisasmError::TableSyntax {
            line,
            reason: format!("bad template field {}", part),
        })?;
        let field = Field::from_name(name).ok_or_else(|| DisasmError::TableSyntax {
            line,
            reason: format!("unknown field {}", name),
        })?;
        let width: u8 = width.parse().map_err(|_| DisasmError::TableSyntax {
            line,
            reason: format!("bad field width {}", part),
        })?;
        template.push((field, width));
    }
    Ok(template)
}

pub fn parse_recipe(text: &str, line: usize) -> Result<Vec<EmitOp>, DisasmError> {
    if text == "-" {
        return Ok(Vec::new());
    }
    let mut recipe = Vec::new();
    for call in split_calls(text) {
        recipe.push(parse_call(&call, line)?);
    }
    Ok(recipe)
}

// Split "r(R1),dxb(D2,X2,B2)" at the commas between calls, not the ones
// inside parentheses.
fn split_calls(text: &str) -> Vec<String> {
    let mut calls = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                calls.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        calls.push(current);
    }
    calls
}

fn parse_call(call: &str, line: usize) -> Result<EmitOp, DisasmError> {
    let bad = |reason: String| DisasmError::TableSyntax { line, reason };
    let open = call
        .find('(')
        .ok_or_else(|| bad(format!("bad recipe call {}", call)))?;
    let name = &call[..open];
    let args_text = call[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| bad(format!("unclosed recipe call {}", call)))?;
    let mut args = Vec::new();
    for arg in args_text.split(',') {
        args.push(
            Field::from_name(arg).ok_or_else(|| bad(format!("unknown field {}", arg)))?,
        );
    }

    let arity = |n: usize| -> Result<(), DisasmError> {
        if args.len() == n {
            Ok(())
        } else {
            Err(bad(format!("{} takes {} fields, got {}", name, n, args.len())))
        }
    };

    let op = match name {
        "r" => {
            arity(1)?;
            EmitOp::Reg(args[0])
        }
        "v" => {
            arity(1)?;
            EmitOp::VReg(args[0])
        }
        "u" => {
            arity(1)?;
            EmitOp::UInt(args[0])
        }
        "s2" | "s3" | "s4" | "s5" | "s8" => {
            arity(1)?;
            EmitOp::SInt {
                field: args[0],
                nibbles: name[1..].parse().expect("digit suffix"),
            }
        }
        "x" => {
            arity(1)?;
            EmitOp::HexInt(args[0])
        }
        "m" => {
            arity(1)?;
            EmitOp::Mask(args[0])
        }
        "om" => {
            arity(1)?;
            EmitOp::OptMask(args[0])
        }
        "ml" => {
            arity(1)?;
            EmitOp::MaskLen(args[0])
        }
        "db" => {
            arity(2)?;
            EmitOp::BaseDisp {
                disp: args[0],
                base: args[1],
            }
        }
        "ldb" => {
            arity(3)?;
            EmitOp::LongBaseDisp {
                low: args[0],
                high: args[1],
                base: args[2],
            }
        }
        "dxb" => {
            arity(3)?;
            EmitOp::IndexBaseDisp {
                disp: args[0],
                index: args[1],
                base: args[2],
            }
        }
        "ldxb" => {
            arity(4)?;
            EmitOp::LongIndexBaseDisp {
                low: args[0],
                high: args[1],
                index: args[2],
                base: args[3],
            }
        }
        "dlb" => {
            arity(3)?;
            EmitOp::LenBaseDisp {
                disp: args[0],
                len: args[1],
                base: args[2],
            }
        }
        "drlb" => {
            arity(3)?;
            EmitOp::RegLenBaseDisp {
                disp: args[0],
                len: args[1],
                base: args[2],
            }
        }
        "dvb" => {
            arity(3)?;
            EmitOp::VecBaseDisp {
                disp: args[0],
                vec: args[1],
                base: args[2],
            }
        }
        "rel4" => {
            arity(1)?;
            EmitOp::Rel {
                field: args[0],
                nibbles: 4,
            }
        }
        "rel8" => {
            arity(1)?;
            EmitOp::Rel {
                field: args[0],
                nibbles: 8,
            }
        }
        _ => return Err(bad(format!("unknown recipe helper {}", name))),
    };
    Ok(op)
}

pub fn parse_hint(text: &str, line: usize) -> Result<LengthHint, DisasmError> {
    let hint = match text {
        "-" => LengthHint::None,
        "1" => LengthHint::Fixed(1),
        "2" => LengthHint::Fixed(2),
        "4" => LengthHint::Fixed(4),
        "8" => LengthHint::Fixed(8),
        "16" => LengthHint::Fixed(16),
        "l1" => LengthHint::FromLen(Field::L1),
        "l2" => LengthHint::FromLen(Field::L2),
        "ml3" => LengthHint::MaskLen(Field::M3),
        "m4" => LengthHint::Multiple {
            first: Field::R1,
            last: Field::R3,
            elem: 4,
        },
        "m8" => LengthHint::Multiple {
            first: Field::R1,
            last: Field::R3,
            elem: 8,
        },
        _ => {
            return Err(DisasmError::TableSyntax {
                line,
                reason: format!("unknown length hint {}", text),
            });
        }
    };
    Ok(hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template() {
        let template = parse_template("OP:2,R1:1,X2:1,B2:1,D2:3", 1).unwrap();
        assert_eq!(template.len(), 5);
        assert_eq!(template[0], (Field::Op, 2));
        assert_eq!(template[4], (Field::D2, 3));
        let width: u32 = template.iter().map(|(_, w)| *w as u32).sum();
        assert_eq!(width, 8);
    }

    #[test]
    fn test_parse_fields_from_window() {
        let format = Format {
            name: "RX-a".to_string(),
            nibbles: 8,
            template: parse_template("OP:2,R1:1,X2:1,B2:1,D2:3", 1).unwrap(),
            recipe: Vec::new(),
        };
        let fields = format.parse_fields("5810D01000C0");
        assert_eq!(fields.get(Field::R1), 1);
        assert_eq!(fields.get(Field::X2), 0);
        assert_eq!(fields.get(Field::B2), 13);
        assert_eq!(fields.get(Field::D2), 0x010);
    }

    #[test]
    fn test_parse_recipe() {
        let recipe = parse_recipe("r(R1),dxb(D2,X2,B2)", 1).unwrap();
        assert_eq!(
            recipe,
            vec![
                EmitOp::Reg(Field::R1),
                EmitOp::IndexBaseDisp {
                    disp: Field::D2,
                    index: Field::X2,
                    base: Field::B2,
                },
            ]
        );
    }

    #[test]
    fn test_parse_empty_recipe() {
        assert!(parse_recipe("-", 1).unwrap().is_empty());
    }

    #[test]
    fn test_hint_eval() {
        let mut fields = FieldValues::default();
        fields.set(Field::L1, 11);
        fields.set(Field::R1, 14);
        fields.set(Field::R3, 12);
        fields.set(Field::M3, 0b0111);
        assert_eq!(LengthHint::Fixed(4).eval(&fields), Some(4));
        assert_eq!(LengthHint::FromLen(Field::L1).eval(&fields), Some(12));
        assert_eq!(LengthHint::MaskLen(Field::M3).eval(&fields), Some(3));
        // LM R14,R12 wraps through R15: 15 registers of 4 bytes.
        let hint = LengthHint::Multiple {
            first: Field::R1,
            last: Field::R3,
            elem: 4,
        };
        assert_eq!(hint.eval(&fields), Some(60));
        assert_eq!(LengthHint::None.eval(&fields), None);
    }

    #[test]
    fn test_bad_recipe_is_rejected() {
        assert!(parse_recipe("frob(R1)", 3).is_err());
        assert!(parse_recipe("r(R9)", 3).is_err());
    }
}
