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

use crate::engine::registry::LabelRegistry;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtKind {
    Code,
    Data,
    Directive,
    CommentLine,
}

// One numbered output record. Code and data statements carry the source
// overlay (location, raw hex, format, hinted length) past column 71.
#[derive(Debug, Clone)]
pub struct Statement {
    pub label: String,
    pub op: String,
    pub operands: String,
    pub comment: String,
    pub loc: u64,
    pub hex: String,
    pub format: String,
    pub hint: Option<u32>,
    pub data_len: Option<u32>,
    pub kind: StmtKind,
}

impl Statement {
    pub fn code(loc: u64, op: &str, operands: String, comment: &str, hex: String) -> Statement {
        Statement {
            label: String::new(),
            op: op.to_string(),
            operands,
            comment: comment.to_string(),
            loc,
            hex,
            format: String::new(),
            hint: None,
            data_len: None,
            kind: StmtKind::Code,
        }
    }

    pub fn data(loc: u64, operands: String, hex: String, data_len: u32) -> Statement {
        Statement {
            label: String::new(),
            op: "DC".to_string(),
            operands,
            comment: String::new(),
            loc,
            hex,
            format: String::new(),
            hint: None,
            data_len: Some(data_len),
            kind: StmtKind::Data,
        }
    }
}

#[derive(Debug)]
enum Attachment {
    Directive { op: String, operands: String },
    Block(Vec<String>),
}

// The statement buffer. Directives attach to a location ahead of time
// and flush, in insertion order, right before the next statement; a
// (location, text) pair only ever attaches once.
#[derive(Debug, Default)]
pub struct Listing {
    statements: Vec<Statement>,
    stmt_at: HashMap<u64, usize>,
    pending: Vec<(u64, Attachment)>,
    attached: HashSet<(u64, String)>,
    suppressed: Option<String>,
}

impl Listing {
    // The section name lives on the START statement; a statement at that
    // location must not define it a second time.
    pub fn suppress_label(&mut self, name: &str) {
        self.suppressed = Some(name.to_string());
    }

    pub fn attach_directive(&mut self, loc: u64, op: &str, operands: &str) {
        let key = (loc, format!("{} {}", op, operands));
        if !self.attached.insert(key) {
            return;
        }
        self.pending.push((
            loc,
            Attachment::Directive {
                op: op.to_string(),
                operands: operands.to_string(),
            },
        ));
    }

    pub fn attach_block(&mut self, loc: u64, lines: Vec<String>) {
        let key = (loc, lines.join("\n"));
        if !self.attached.insert(key) {
            return;
        }
        self.pending.push((loc, Attachment::Block(lines)));
    }

    // Append a decoded statement, flushing whatever is attached first.
    pub fn emit(&mut self, mut stmt: Statement, registry: &mut LabelRegistry) {
        self.flush_pending();
        if stmt.label.is_empty()
            && let Some(name) = registry.label_at(stmt.loc)
            && self.suppressed.as_deref() != Some(name)
        {
            stmt.label = name.to_string();
        }
        registry.mark_defined(stmt.loc);
        let idx = self.statements.len();
        self.stmt_at.entry(stmt.loc).or_insert(idx);
        self.statements.push(stmt);
    }

    pub fn push_directive(&mut self, label: &str, op: &str, operands: &str) {
        self.statements.push(Statement {
            label: label.to_string(),
            op: op.to_string(),
            operands: operands.to_string(),
            comment: String::new(),
            loc: 0,
            hex: String::new(),
            format: String::new(),
            hint: None,
            data_len: None,
            kind: StmtKind::Directive,
        });
    }

    pub fn push_comment_line(&mut self, text: String) {
        self.statements.push(Statement {
            label: String::new(),
            op: String::new(),
            operands: text,
            comment: String::new(),
            loc: 0,
            hex: String::new(),
            format: String::new(),
            hint: None,
            data_len: None,
            kind: StmtKind::CommentLine,
        });
    }

    pub fn flush_pending(&mut self) {
        for (loc, attachment) in self.pending.drain(..) {
            match attachment {
                Attachment::Directive { op, operands } => {
                    self.statements.push(Statement {
                        label: String::new(),
                        op,
                        operands,
                        comment: String::new(),
                        loc,
                        hex: String::new(),
                        format: String::new(),
                        hint: None,
                        data_len: None,
                        kind: StmtKind::Directive,
                    });
                }
                Attachment::Block(lines) => {
                    for line in lines {
                        self.statements.push(Statement {
                            label: String::new(),
                            op: String::new(),
                            operands: line,
                            comment: String::new(),
                            loc,
                            hex: String::new(),
                            format: String::new(),
                            hint: None,
                            data_len: None,
                            kind: StmtKind::CommentLine,
                        });
                    }
                }
            }
        }
    }

    pub fn has_statement_at(&self, loc: u64) -> bool {
        self.stmt_at.contains_key(&loc)
    }

    pub fn statement_text_at(&self, loc: u64) -> Option<String> {
        self.stmt_at.get(&loc).map(|&idx| {
            let stmt = &self.statements[idx];
            format!("{} {}", stmt.op, stmt.operands)
        })
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    // Back-referenced locations get their label patched into the
    // statement that was already emitted there.
    pub fn patch_back_refs(&mut self, registry: &LabelRegistry) {
        for &target in registry.back_refs() {
            let Some(&idx) = self.stmt_at.get(&target) else {
                continue;
            };
            if self.statements[idx].label.is_empty()
                && let Some(name) = registry.label_at(target)
            {
                self.statements[idx].label = name.to_string();
            }
        }
    }

    // A data constant whose location was referenced with a wider operand
    // than it defines gets a zero-duplication cover field in front; the
    // label migrates to the cover.
    pub fn widen(&mut self, registry: &LabelRegistry) {
        let mut widened = Vec::with_capacity(self.statements.len());
        for mut stmt in self.statements.drain(..) {
            let used = registry.used_length(stmt.loc);
            let needs_cover = stmt.kind == StmtKind::Data
                && stmt.data_len.is_some_and(|len| used > len);
            if needs_cover {
                widened.push(Statement {
                    label: std::mem::take(&mut stmt.label),
                    op: "DC".to_string(),
                    operands: format!("0XL{}", used),
                    comment: String::new(),
                    loc: stmt.loc,
                    hex: String::new(),
                    format: String::new(),
                    hint: None,
                    data_len: None,
                    kind: StmtKind::Data,
                });
            }
            widened.push(stmt);
        }
        self.statements = widened;
        self.stmt_at.clear();
        for (idx, stmt) in self.statements.iter().enumerate() {
            if !stmt.hex.is_empty() {
                self.stmt_at.entry(stmt.loc).or_insert(idx);
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for stmt in &self.statements {
            if (stmt.kind == StmtKind::Code || stmt.kind == StmtKind::Data)
                && stmt.label == LabelRegistry::auto_name(stmt.loc)
            {
                out.push('\n');
            }
            out.push_str(&render_statement(stmt));
            out.push('\n');
        }
        out
    }
}

fn render_statement(stmt: &Statement) -> String {
    if stmt.kind == StmtKind::CommentLine {
        return stmt.operands.clone();
    }
    let body = format!(
        "{:<8} {:<5} {:<22} {}",
        stmt.label, stmt.op, stmt.operands, stmt.comment
    );
    let mut line = body.trim_end().to_string();
    if !stmt.hex.is_empty() {
        while line.len() < 71 {
            line.push(' ');
        }
        line.push_str(&format!(" {:08X} {:<12} {:<6}", stmt.loc, stmt.hex, stmt.format));
        if let Some(hint) = stmt.hint {
            line.push_str(&format!(" {}", hint));
        }
        line = line.trim_end().to_string();
    }
    line
}
