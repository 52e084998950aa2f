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

use std::collections::HashMap;

// A dummy section accreted from observed base+displacement references.
// Fields carry the widest operand length seen against them.
#[derive(Debug, Default)]
pub struct Dsect {
    pub name: String,
    pub desc: Option<String>,
    fields: HashMap<u64, u32>,
}

impl Dsect {
    pub fn field_label(name: &str, disp: u64) -> String {
        format!("{}_{:X}", name, disp)
    }

    // Record a reference at `disp` with operand length `len` and hand
    // back the field label. Lengths only ever grow.
    pub fn touch(&mut self, disp: u64, len: u32) -> String {
        let slot = self.fields.entry(disp).or_insert(0);
        if len > *slot {
            *slot = len;
        }
        Self::field_label(&self.name, disp)
    }

    // The DSECT body: fields in displacement order, gaps filled with
    // anonymous DS, overlapping fields forced to zero duplication so the
    // location counter never runs past a later field.
    pub fn body(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(u64, u32)> = self.fields.iter().map(|(d, l)| (*d, *l)).collect();
        fields.sort();

        let mut lines = Vec::new();
        let mut cursor = 0u64;
        for (index, &(disp, len)) in fields.iter().enumerate() {
            if disp > cursor {
                lines.push((String::new(), format!("XL{}", disp - cursor)));
            }
            let label = Self::field_label(&self.name, disp);
            let next = fields.get(index + 1).map(|(d, _)| *d);
            let overlaps = next.is_some_and(|n| n < disp + len as u64);
            let operand = if len == 0 {
                "0X".to_string()
            } else if overlaps {
                format!("0XL{}", len)
            } else {
                format!("XL{}", len)
            };
            lines.push((label, operand));
            cursor = if overlaps || len == 0 {
                disp
            } else {
                disp + len as u64
            };
        }
        lines
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct DsectRegistry {
    dsects: Vec<Dsect>,
    by_name: HashMap<String, usize>,
}

impl DsectRegistry {
    // Create the DSECT on first sight and return its slot.
    pub fn declare(&mut self, name: &str, desc: Option<String>) -> usize {
        if let Some(&idx) = self.by_name.get(name) {
            if desc.is_some() {
                self.dsects[idx].desc = desc;
            }
            return idx;
        }
        let idx = self.dsects.len();
        self.dsects.push(Dsect {
            name: name.to_string(),
            desc,
            fields: HashMap::new(),
        });
        self.by_name.insert(name.to_string(), idx);
        idx
    }

    pub fn touch(&mut self, idx: usize, disp: u64, len: u32) -> String {
        self.dsects[idx].touch(disp, len)
    }

    pub fn all(&self) -> &[Dsect] {
        &self.dsects
    }
}
