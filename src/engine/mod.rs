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

mod code;
mod data;
pub mod dsect;
pub mod listing;
pub mod registry;
pub mod stats;

use crate::ast::{Action, Tag, Token, UsingTarget};
use crate::engine::dsect::DsectRegistry;
use crate::engine::listing::{Listing, Statement, StmtKind};
use crate::engine::registry::LabelRegistry;
use crate::engine::stats::Stats;
use crate::tables::Tables;
use crate::tables::extended::CcClass;
use crate::{Disassembly, Options};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Code,
    Data,
}

// What a general register is currently good for as a base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BaseBinding {
    None,
    Csect(u64),
    Dsect { idx: usize, offset: u64 },
}

// One disassembly session. Owns every registry from the first byte to
// finalization; the rendered listing is the only output.
pub struct Engine<'a> {
    tables: &'a Tables,
    pub(crate) mode: Mode,
    pub(crate) dtype: Option<crate::ast::DataType>,
    pub(crate) loc: u64,
    start: u64,
    section: String,
    section_named: bool,
    pub(crate) registry: LabelRegistry,
    pub(crate) dsects: DsectRegistry,
    pub(crate) bases: [BaseBinding; 16],
    pub(crate) listing: Listing,
    pub(crate) cc_class: CcClass,
    pub(crate) todo_count: u32,
    pub(crate) stats: Option<Stats>,
    pub(crate) vector_used: bool,
    org_targets: HashSet<u64>,
    undefined_count: usize,
}

impl<'a> Engine<'a> {
    pub fn new(tables: &'a Tables, options: &Options) -> Engine<'a> {
        let section = options.section.clone().unwrap_or_else(|| "@".to_string());
        let mut engine = Engine {
            tables,
            mode: Mode::Code,
            dtype: None,
            loc: options.start,
            start: options.start,
            section: section.clone(),
            section_named: options.section.is_some(),
            registry: LabelRegistry::default(),
            dsects: DsectRegistry::default(),
            bases: [BaseBinding::None; 16],
            listing: Listing::default(),
            cc_class: CcClass::None,
            todo_count: 0,
            stats: options.stats.then(Stats::default),
            vector_used: false,
            org_targets: HashSet::new(),
            undefined_count: 0,
        };
        // a user-supplied section name is a real symbol at the origin,
        // defined by the START statement itself; the default @ is not
        if options.section.is_some() {
            let _ = engine.registry.define(&section, options.start);
            engine.listing.suppress_label(&section);
        }
        for symbol in &options.symbols {
            if let Err(reason) = engine.registry.define(&symbol.name, symbol.loc) {
                engine.diagnostic("DIS0001", &reason);
            }
        }
        engine
    }

    // One pass over the token stream, then finalization.
    pub fn run(&mut self, tokens: &[Token]) {
        let mut hexbuf = String::new();
        for token in tokens {
            match token {
                Token::Hex(run) => hexbuf.push_str(run),
                Token::Action(action) => {
                    self.flush_hex(&mut hexbuf);
                    self.apply_action(*action);
                }
                Token::Tags(tags) => {
                    self.flush_hex(&mut hexbuf);
                    for tag in tags {
                        self.apply_tag(tag);
                    }
                }
                Token::Junk(text) => {
                    self.flush_hex(&mut hexbuf);
                    self.diag_invalid(text);
                }
            }
        }
        self.flush_hex(&mut hexbuf);
        self.finalize();
    }

    fn flush_hex(&mut self, hexbuf: &mut String) {
        if hexbuf.is_empty() {
            return;
        }
        if hexbuf.len() % 2 != 0 {
            self.diag_odd_hex(hexbuf);
            self.loc += (hexbuf.len() as u64 + 1) / 2;
            hexbuf.clear();
            return;
        }
        let bytes: Vec<u8> = (0..hexbuf.len() / 2)
            .map(|i| u8::from_str_radix(&hexbuf[i * 2..i * 2 + 2], 16).expect("validated hex"))
            .collect();
        match self.mode {
            Mode::Code => self.decode_code_slice(&bytes),
            Mode::Data => self.decode_data_slice(&bytes),
        }
        hexbuf.clear();
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Code => {
                self.mode = Mode::Code;
                self.dtype = None;
            }
            Action::Data => self.mode = Mode::Data,
            Action::DataReset => {
                self.mode = Mode::Data;
                self.dtype = None;
            }
            Action::NoLabel => return,
        }
        // every slice boundary gets a label unless one already exists
        let name = self
            .registry
            .label_at(self.loc)
            .map(str::to_string)
            .unwrap_or_else(|| LabelRegistry::auto_name(self.loc));
        let _ = self.registry.define(&name, self.loc);
    }

    fn apply_tag(&mut self, tag: &Tag) {
        match tag {
            Tag::SetType(dtype) => {
                self.dtype = *dtype;
                self.mode = Mode::Data;
            }
            Tag::Section(text) => {
                let lines = banner_lines(text);
                self.listing.attach_block(self.loc, lines);
            }
            Tag::Comment(text) => {
                let lines = dashed_lines(text);
                self.listing.attach_block(self.loc, lines);
            }
            Tag::Org(target) => {
                if self.org_targets.insert(*target) {
                    let operand = if *target >= self.start {
                        format!("{}+X'{:X}'", self.section, target - self.start)
                    } else {
                        format!("{}-X'{:X}'", self.section, self.start - target)
                    };
                    self.listing.attach_directive(self.loc, "ORG", &operand);
                }
                self.loc = *target;
            }
            Tag::Using { regs, target } => self.apply_using(regs, target),
            Tag::Drop { regs } => {
                for &reg in regs {
                    self.bases[reg as usize] = BaseBinding::None;
                }
                self.listing
                    .attach_directive(self.loc, "DROP", &reg_list(regs));
            }
            Tag::DsectBind { regs, name, desc } => {
                let idx = self.dsects.declare(name, desc.clone());
                for (i, &reg) in regs.iter().enumerate() {
                    self.bases[reg as usize] = BaseBinding::Dsect {
                        idx,
                        offset: 4096 * i as u64,
                    };
                }
                self.listing.attach_directive(
                    self.loc,
                    "USING",
                    &format!("{},{}", name, reg_list(regs)),
                );
            }
            Tag::Label(name) => {
                if self.loc == self.start && !self.section_named {
                    // first name at the origin becomes the section name
                    let _ = self.registry.define(name, self.loc);
                    self.section = name.clone();
                    self.section_named = true;
                    self.listing.suppress_label(name);
                } else if let Err(reason) = self.registry.define(name, self.loc) {
                    self.diagnostic("DIS0001", &reason);
                }
            }
            Tag::LabelAt { name, loc } => {
                if let Err(reason) = self.registry.define(name, *loc) {
                    self.diagnostic("DIS0001", &reason);
                }
            }
        }
    }

    fn apply_using(&mut self, regs: &[u8], target: &UsingTarget) {
        let (base_loc, target_text) = match target {
            UsingTarget::Here => {
                self.registry.refer(self.loc, self.loc, 0);
                (Some(self.loc), "*".to_string())
            }
            UsingTarget::Location(loc) => {
                let name = self.registry.refer(*loc, self.loc, 0);
                (Some(*loc), name)
            }
            UsingTarget::Label(name) => match self.registry.location_of(name) {
                Some(loc) => (Some(loc), name.clone()),
                None => (None, name.clone()),
            },
        };
        for (i, &reg) in regs.iter().enumerate() {
            self.bases[reg as usize] = match base_loc {
                Some(origin) => BaseBinding::Csect(origin + 4096 * i as u64),
                None => BaseBinding::None,
            };
        }
        self.listing.attach_directive(
            self.loc,
            "USING",
            &format!("{},{}", target_text, reg_list(regs)),
        );
    }

    fn finalize(&mut self) {
        self.listing.flush_pending();

        // a referred or boundary-labeled final position becomes DS 0X
        if !self.listing.has_statement_at(self.loc) && self.registry.label_at(self.loc).is_some()
        {
            let mut stmt = Statement::data(self.loc, "0X".to_string(), String::new(), 0);
            stmt.op = "DS".to_string();
            stmt.data_len = None;
            stmt.kind = StmtKind::Data;
            self.listing.emit(stmt, &mut self.registry);
        }

        self.listing.patch_back_refs(&self.registry);
        self.listing.widen(&self.registry);

        // register equates
        for reg in 0..16 {
            self.listing
                .push_directive(&format!("R{}", reg), "EQU", &reg.to_string());
        }
        if self.vector_used {
            for reg in 0..32 {
                self.listing
                    .push_directive(&format!("V{}", reg), "EQU", &reg.to_string());
            }
        }

        // DSECT bodies
        for dsect in self.dsects.all() {
            if dsect.is_empty() {
                continue;
            }
            if let Some(desc) = &dsect.desc {
                self.listing
                    .push_comment_line(format!("*  {} - {}", dsect.name, desc));
            }
            self.listing.push_directive(&dsect.name, "DSECT", "");
            for (label, operand) in dsect.body() {
                self.listing.push_directive(&label, "DS", &operand);
            }
        }

        // undefined label report
        let undefined = self.registry.undefined();
        self.undefined_count = undefined.len();
        if !undefined.is_empty() {
            self.listing.push_comment_line("*".to_string());
            self.listing
                .push_comment_line("*  Undefined labels".to_string());
            for (name, loc, len, from) in undefined {
                let by = self.listing.statement_text_at(from).unwrap_or_default();
                self.listing.push_comment_line(format!(
                    "*  {:<8} {:08X} {:>4}  {:08X}  {}",
                    name, loc, len, from, by
                ));
            }
        }

        if let Some(stats) = self.stats.take() {
            for line in stats.report() {
                self.listing.push_comment_line(line);
            }
        }

        self.listing.push_directive("", "END", "");
    }

    pub fn into_listing(self) -> Disassembly {
        let mut out = String::new();
        let operand = if self.start == 0 {
            String::new()
        } else {
            format!("X'{:X}'", self.start)
        };
        out.push_str(
            format!("{:<8} {:<5} {}", self.section, "START", operand).trim_end(),
        );
        out.push('\n');
        out.push_str(&self.listing.render());
        Disassembly {
            statements: self.listing.statement_count(),
            todos: self.todo_count,
            undefined: self.undefined_count,
            listing: out,
        }
    }

    pub(crate) fn diagnostic(&mut self, code: &str, text: &str) {
        self.listing
            .attach_block(self.loc, vec![format!("*** {} {}", code, text)]);
    }

    fn diag_odd_hex(&mut self, run: &str) {
        let mut lines = vec![format!(
            "*** DIS0007 odd number of hex digits ({}), bytes skipped",
            run.len()
        )];
        for chunk in run.as_bytes().chunks(32) {
            lines.push(format!("*   {}", String::from_utf8_lossy(chunk)));
        }
        self.listing.attach_block(self.loc, lines);
    }

    fn diag_invalid(&mut self, text: &str) {
        let lines = vec![
            "*** DIS0006 unrecognized input skipped".to_string(),
            format!("*   {}", text),
        ];
        self.listing.attach_block(self.loc, lines);
    }
}

fn reg_list(regs: &[u8]) -> String {
    regs.iter()
        .map(|r| format!("R{}", r))
        .collect::<Vec<String>>()
        .join(",")
}

fn banner_lines(text: &str) -> Vec<String> {
    let stars = "*".repeat(71);
    let blank = format!("*{:<69}*", "");
    vec![
        stars.clone(),
        blank.clone(),
        format!("*  {:<67}*", text),
        blank,
        stars,
    ]
}

fn dashed_lines(text: &str) -> Vec<String> {
    let dashes = format!("*{}*", "-".repeat(69));
    vec![dashes.clone(), format!("*  {}", text), dashes]
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02X}", b));
    }
    out
}

pub(crate) fn sign_extend(value: u32, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value as u64) << shift) as i64 >> shift
}

pub(crate) fn sign_extend_bytes(bytes: &[u8]) -> i64 {
    let mut value = 0u64;
    for &b in bytes {
        value = (value << 8) | b as u64;
    }
    sign_extend(value as u32, bytes.len() as u32 * 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xFFFF, 16), -1);
        assert_eq!(sign_extend(0x7FFF, 16), 32767);
        assert_eq!(sign_extend(0x008, 12), 8);
        assert_eq!(sign_extend(0xFF8, 12), -8);
    }

    #[test]
    fn test_sign_extend_bytes() {
        assert_eq!(sign_extend_bytes(&[0x00, 0x22]), 0x22);
        assert_eq!(sign_extend_bytes(&[0xFF, 0xFE]), -2);
        assert_eq!(sign_extend_bytes(&[0x00, 0x00, 0x00, 0x01]), 1);
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(hex_string(&[0x18, 0xCF]), "18CF");
    }

    #[test]
    fn test_banner_shape() {
        let lines = banner_lines("INIT");
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].len(), 71);
        assert_eq!(lines[2].len(), 71);
        assert!(lines[2].contains("INIT"));
    }
}
