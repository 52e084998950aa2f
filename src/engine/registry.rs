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

use std::collections::{HashMap, HashSet};

// One materialized address reference: who referred, to where, and how
// many bytes the referring operand touches.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub from: u64,
    pub to: u64,
    pub len: u32,
}

// Two-way label/location map. Labels are created either by definition
// (tags, emitted statements) or by reference (operands and A-constants
// that target a location nobody has named yet).
#[derive(Debug, Default)]
pub struct LabelRegistry {
    by_name: HashMap<String, u64>,
    by_loc: HashMap<u64, String>,
    defined: HashSet<String>,
    refs: Vec<Reference>,
    back_refs: Vec<u64>,
    used_len: HashMap<u64, u32>,
}

impl LabelRegistry {
    pub fn auto_name(loc: u64) -> String {
        format!("L{:X}", loc)
    }

    // Explicit definition. A label never moves to a different location;
    // a clashing redefinition is reported back to the caller.
    pub fn define(&mut self, name: &str, loc: u64) -> Result<(), String> {
        if let Some(&existing) = self.by_name.get(name) {
            if existing != loc {
                return Err(format!(
                    "label {} already defined at {:X}",
                    name, existing
                ));
            }
            self.defined.insert(name.to_string());
            return Ok(());
        }
        self.by_name.insert(name.to_string(), loc);
        // A user name takes the location over from an auto-generated one.
        self.by_loc.insert(loc, name.to_string());
        self.defined.insert(name.to_string());
        Ok(())
    }

    // Implicit reference from `from` to `to`. Materializes an auto label
    // when the target is unnamed and remembers backward targets so the
    // finalization pass can patch their label columns.
    pub fn refer(&mut self, to: u64, from: u64, len: u32) -> String {
        let name = match self.by_loc.get(&to) {
            Some(name) => name.clone(),
            None => {
                let name = Self::auto_name(to);
                self.by_name.insert(name.clone(), to);
                self.by_loc.insert(to, name.clone());
                name
            }
        };
        self.refs.push(Reference { from, to, len });
        self.record_used_length(to, len);
        if to < from {
            self.back_refs.push(to);
        }
        name
    }

    pub fn label_at(&self, loc: u64) -> Option<&str> {
        self.by_loc.get(&loc).map(String::as_str)
    }

    pub fn location_of(&self, name: &str) -> Option<u64> {
        self.by_name.get(name).copied()
    }

    pub fn mark_defined(&mut self, loc: u64) {
        if let Some(name) = self.by_loc.get(&loc) {
            self.defined.insert(name.clone());
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(name)
    }

    pub fn record_used_length(&mut self, loc: u64, len: u32) {
        let slot = self.used_len.entry(loc).or_insert(0);
        if len > *slot {
            *slot = len;
        }
    }

    pub fn used_length(&self, loc: u64) -> u32 {
        self.used_len.get(&loc).copied().unwrap_or(0)
    }

    pub fn back_refs(&self) -> &[u64] {
        &self.back_refs
    }

    // Referenced-but-never-defined labels for the closing report, with
    // the first reference that created each.
    pub fn undefined(&self) -> Vec<(String, u64, u32, u64)> {
        let mut seen = HashSet::new();
        let mut report = Vec::new();
        for reference in &self.refs {
            let Some(name) = self.by_loc.get(&reference.to) else {
                continue;
            };
            if self.defined.contains(name) || !seen.insert(name.clone()) {
                continue;
            }
            report.push((
                name.clone(),
                reference.to,
                self.used_length(reference.to),
                reference.from,
            ));
        }
        report.sort_by_key(|(_, loc, _, _)| *loc);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_lookup() {
        let mut registry = LabelRegistry::default();
        registry.define("ENTRY", 0x10).unwrap();
        assert_eq!(registry.label_at(0x10), Some("ENTRY"));
        assert_eq!(registry.location_of("ENTRY"), Some(0x10));
        assert!(registry.is_defined("ENTRY"));
    }

    #[test]
    fn test_redefinition_to_other_location_fails() {
        let mut registry = LabelRegistry::default();
        registry.define("ENTRY", 0x10).unwrap();
        assert!(registry.define("ENTRY", 0x20).is_err());
        assert!(registry.define("ENTRY", 0x10).is_ok());
    }

    #[test]
    fn test_refer_materializes_auto_label() {
        let mut registry = LabelRegistry::default();
        let name = registry.refer(0x3C, 0x10, 4);
        assert_eq!(name, "L3C");
        assert_eq!(registry.label_at(0x3C), Some("L3C"));
        assert!(!registry.is_defined("L3C"));
    }

    #[test]
    fn test_backward_reference_is_tracked() {
        let mut registry = LabelRegistry::default();
        registry.refer(0x10, 0x40, 0);
        registry.refer(0x80, 0x40, 0);
        assert_eq!(registry.back_refs(), &[0x10]);
    }

    #[test]
    fn test_used_length_is_monotonic() {
        let mut registry = LabelRegistry::default();
        registry.refer(0x20, 0x00, 2);
        registry.refer(0x20, 0x08, 4);
        registry.refer(0x20, 0x0C, 2);
        assert_eq!(registry.used_length(0x20), 4);
    }

    #[test]
    fn test_undefined_report() {
        let mut registry = LabelRegistry::default();
        registry.define("KNOWN", 0x10).unwrap();
        registry.refer(0x10, 0x00, 4);
        registry.refer(0x40, 0x04, 2);
        let undefined = registry.undefined();
        assert_eq!(undefined.len(), 1);
        assert_eq!(undefined[0], ("L40".to_string(), 0x40, 2, 0x04));
    }
}
