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

use crate::engine::{BaseBinding, Engine, hex_string, sign_extend};
use crate::engine::listing::Statement;
use crate::tables::ebcdic;
use crate::tables::extended;
use crate::tables::format::{EmitOp, Field, FieldValues, Flavor, Format, Instruction};

impl Engine<'_> {
    pub(crate) fn decode_code_slice(&mut self, bytes: &[u8]) {
        let tables = self.tables;
        let mut pos = 0usize;
        while pos < bytes.len() {
            let window = window12(&bytes[pos..]);
            let Some(instr) = tables.lookup(&window) else {
                // Not an opcode we know: keep the two bytes as data and
                // leave a marker for the user to re-annotate.
                let take = 2.min(bytes.len() - pos);
                let chunk = &bytes[pos..pos + take];
                let mut stmt = Statement::data(
                    self.loc,
                    format!("XL{}'{}'", take, hex_string(chunk)),
                    hex_string(chunk),
                    take as u32,
                );
                stmt.comment = "<-- TODO (not code)".to_string();
                self.listing.emit(stmt, &mut self.registry);
                self.todo_count += 1;
                self.loc += take as u64;
                pos += take;
                continue;
            };

            let format = tables.format_of(instr);
            let take = format.byte_len().min(bytes.len() - pos);
            let chunk = &bytes[pos..pos + take];

            let mut fields = format.parse_fields(&window);
            if format.field_width(Field::Rxb).is_some() {
                apply_rxb(format, &mut fields);
                self.vector_used = true;
            }

            let hint = instr.hint.eval(&fields);
            let mut mnemonic = instr.mnemonic.clone();
            let mut operands = self.eval_recipe(instr, format, &fields, hint);
            self.post_process(instr, &fields, &mut mnemonic, &mut operands);

            let mut comment = instr.desc.clone();
            if instr.mnemonic == "SVC"
                && let Some(desc) = tables.svc_desc(fields.get(Field::I1))
            {
                comment = desc.to_string();
            }

            let mut stmt = Statement::code(
                self.loc,
                &mnemonic,
                operands.join(","),
                &comment,
                hex_string(chunk),
            );
            stmt.format = format.name.clone();
            stmt.hint = hint;
            self.listing.emit(stmt, &mut self.registry);
            if let Some(stats) = self.stats.as_mut() {
                stats.record(&format.name, &mnemonic);
            }
            self.update_cc_class(instr.flavor);

            self.loc += take as u64;
            pos += take;
        }
    }

    fn eval_recipe(
        &mut self,
        instr: &Instruction,
        format: &Format,
        fields: &FieldValues,
        hint: Option<u32>,
    ) -> Vec<String> {
        // Branch targets through a base register keep their numeric form;
        // the reference is still recorded so the label materializes.
        let symbolic = !matches!(instr.flavor, Flavor::Branch | Flavor::JumpIndex);
        let mut operands = Vec::new();
        for op in &format.recipe {
            let rendered = match *op {
                EmitOp::Reg(f) => Some(format!("R{}", fields.get(f))),
                EmitOp::VReg(f) => Some(format!("V{}", fields.get(f))),
                EmitOp::UInt(f) => {
                    Some(render_uint(fields.get(f), format.field_width(f).unwrap_or(2)))
                }
                EmitOp::SInt { field, nibbles } => {
                    Some(sign_extend(fields.get(field), nibbles as u32 * 4).to_string())
                }
                EmitOp::HexInt(field) => {
                    let width = format.field_width(field).unwrap_or(2) as usize;
                    Some(format!("X'{:0width$X}'", fields.get(field)))
                }
                EmitOp::Mask(f) => Some(format!("B'{:04b}'", fields.get(f))),
                EmitOp::OptMask(f) => {
                    let value = fields.get(f);
                    (value != 0).then(|| format!("B'{:04b}'", value))
                }
                EmitOp::MaskLen(f) => Some(fields.get(f).count_ones().to_string()),
                EmitOp::BaseDisp { disp, base } => Some(self.base_disp(
                    fields.get(disp) as i64,
                    fields.get(base) as usize,
                    hint,
                    symbolic,
                    None,
                )),
                EmitOp::LongBaseDisp { low, high, base } => {
                    let disp = long_disp(fields.get(low), fields.get(high));
                    Some(self.base_disp(disp, fields.get(base) as usize, hint, symbolic, None))
                }
                EmitOp::IndexBaseDisp { disp, index, base } => Some(self.index_base_disp(
                    fields.get(disp) as i64,
                    fields.get(index),
                    fields.get(base) as usize,
                    hint,
                    symbolic,
                )),
                EmitOp::LongIndexBaseDisp {
                    low,
                    high,
                    index,
                    base,
                } => {
                    let disp = long_disp(fields.get(low), fields.get(high));
                    Some(self.index_base_disp(
                        disp,
                        fields.get(index),
                        fields.get(base) as usize,
                        hint,
                        symbolic,
                    ))
                }
                EmitOp::LenBaseDisp { disp, len, base } => Some(self.base_disp(
                    fields.get(disp) as i64,
                    fields.get(base) as usize,
                    Some(fields.get(len) + 1),
                    symbolic,
                    Some(fields.get(len) + 1),
                )),
                EmitOp::RegLenBaseDisp { disp, len, base } => {
                    let d = fields.get(disp);
                    let b = fields.get(base) as usize;
                    // run-time length: always numeric, but the target is
                    // still worth a reference when the base is bound
                    self.try_resolve(d as i64, b, Some(0), false);
                    Some(if b == 0 {
                        format!("{}(R{})", d, fields.get(len))
                    } else {
                        format!("{}(R{},R{})", d, fields.get(len), b)
                    })
                }
                EmitOp::VecBaseDisp { disp, vec, base } => {
                    let d = fields.get(disp);
                    let b = fields.get(base);
                    Some(format!("{}(V{},R{})", d, fields.get(vec), b))
                }
                EmitOp::Rel { field, nibbles } => {
                    let offset = sign_extend(fields.get(field), nibbles as u32 * 4) * 2;
                    let target = (self.loc as i64 + offset).max(0) as u64;
                    Some(self.registry.refer(target, self.loc, hint.unwrap_or(0)))
                }
            };
            if let Some(text) = rendered {
                operands.push(text);
            }
        }
        operands
    }

    // Record the reference when the base register is bound, and hand
    // back the label when the operand may use the symbolic form. Base
    // zero means no base at all.
    fn try_resolve(
        &mut self,
        disp: i64,
        base: usize,
        hint: Option<u32>,
        symbolic: bool,
    ) -> Option<String> {
        if base == 0 {
            return None;
        }
        match self.bases[base] {
            BaseBinding::Csect(origin) => {
                let target = origin as i64 + disp;
                if target < 0 {
                    return None;
                }
                let label = self.registry.refer(target as u64, self.loc, hint.unwrap_or(0));
                symbolic.then_some(label)
            }
            BaseBinding::Dsect { idx, offset } => {
                if disp < 0 {
                    return None;
                }
                let label = self
                    .dsects
                    .touch(idx, offset + disp as u64, hint.unwrap_or(0));
                symbolic.then_some(label)
            }
            BaseBinding::None => None,
        }
    }

    fn base_disp(
        &mut self,
        disp: i64,
        base: usize,
        hint: Option<u32>,
        symbolic: bool,
        explicit_len: Option<u32>,
    ) -> String {
        if let Some(label) = self.try_resolve(disp, base, hint, symbolic) {
            return match explicit_len {
                Some(len) => format!("{}({})", label, len),
                None => label,
            };
        }
        match explicit_len {
            Some(len) if base == 0 => format!("{}({})", disp, len),
            Some(len) => format!("{}({},R{})", disp, len, base),
            None if base == 0 => disp.to_string(),
            None => format!("{}(R{})", disp, base),
        }
    }

    fn index_base_disp(
        &mut self,
        disp: i64,
        index: u32,
        base: usize,
        hint: Option<u32>,
        symbolic: bool,
    ) -> String {
        if index == 0 {
            if let Some(label) = self.try_resolve(disp, base, hint, symbolic) {
                return label;
            }
            if base == 0 {
                return disp.to_string();
            }
            return format!("{}(,R{})", disp, base);
        }
        match (index, base) {
            (x, 0) => format!("{}(R{})", disp, x),
            (x, b) => format!("{}(R{},R{})", disp, x, b),
        }
    }

    fn post_process(
        &mut self,
        instr: &Instruction,
        fields: &FieldValues,
        mnemonic: &mut String,
        operands: &mut Vec<String>,
    ) {
        match instr.flavor {
            Flavor::Branch => {
                let mask = fields.get(Field::M1);
                if let Some(ext) = extended::branch_ext(self.cc_class, mask) {
                    *mnemonic = if instr.mnemonic == "BCR" {
                        format!("{}R", ext)
                    } else {
                        ext.to_string()
                    };
                    operands.remove(0);
                }
            }
            Flavor::RelBranch => {
                let mask = fields.get(Field::M1);
                let ext = if instr.mnemonic == "BRCL" {
                    extended::rel_long_branch_ext(self.cc_class, mask)
                } else {
                    extended::rel_branch_ext(self.cc_class, mask)
                };
                if let Some(ext) = ext {
                    *mnemonic = ext.to_string();
                    operands.remove(0);
                }
            }
            Flavor::Select => {
                if let Some(suffix) = extended::cond_suffix(fields.get(Field::M4)) {
                    mnemonic.push_str(suffix);
                    operands.pop();
                }
            }
            Flavor::OnCond => {
                if let Some(suffix) = extended::cond_suffix(fields.get(Field::M3)) {
                    mnemonic.push_str(suffix);
                    operands.pop();
                }
            }
            Flavor::CompareJump => {
                if let Some(suffix) = extended::cj_suffix(fields.get(Field::M3)) {
                    mnemonic.push_str(suffix);
                    operands.remove(2);
                }
            }
            Flavor::Rotate => {
                let i4 = fields.get(Field::I4);
                if i4 >= 128 {
                    mnemonic.push('Z');
                    operands[3] = render_uint(i4 - 128, 2);
                }
            }
            _ => {}
        }
    }

    fn update_cc_class(&mut self, flavor: Flavor) {
        match flavor {
            Flavor::Arith => self.cc_class = extended::CcClass::Arith,
            Flavor::Compare => self.cc_class = extended::CcClass::Compare,
            Flavor::TestMask => self.cc_class = extended::CcClass::Mask,
            Flavor::CondOnly => self.cc_class = extended::CcClass::None,
            _ => {}
        }
    }
}

fn window12(bytes: &[u8]) -> String {
    let mut window = hex_string(&bytes[..bytes.len().min(6)]);
    while window.len() < 12 {
        window.push('0');
    }
    window
}

fn apply_rxb(format: &Format, fields: &mut FieldValues) {
    let rxb = fields.get(Field::Rxb);
    let extensions = [
        (Field::V1, 3),
        (Field::V2, 2),
        (Field::V3, 1),
        (Field::V4, 0),
    ];
    for (field, bit) in extensions {
        if format.field_width(field).is_some() {
            let high = (rxb >> bit) & 1;
            fields.set(field, fields.get(field) + 16 * high);
        }
    }
}

fn long_disp(low: u32, high: u32) -> i64 {
    sign_extend((high << 12) | low, 20)
}

// Small values print as decimal, the hard blank and printable bytes as
// character literals, the rest as hex.
fn render_uint(value: u32, width_nibbles: u8) -> String {
    if value < 64 {
        return value.to_string();
    }
    if value == 64 {
        return "C' '".to_string();
    }
    if value <= 255 && ebcdic::is_printable(value as u8) {
        return format!("C'{}'", ebcdic::render_text(&[value as u8]));
    }
    let width = width_nibbles as usize;
    format!("X'{:0width$X}'", value)
}
