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

// Instruction frequency counters for the optional statistics sections.
#[derive(Debug, Default)]
pub struct Stats {
    formats: HashMap<String, u32>,
    mnemonics: HashMap<String, (String, u32)>,
}

impl Stats {
    pub fn record(&mut self, format: &str, mnemonic: &str) {
        *self.formats.entry(format.to_string()).or_insert(0) += 1;
        self.mnemonics
            .entry(mnemonic.to_string())
            .or_insert_with(|| (format.to_string(), 0))
            .1 += 1;
    }

    // Two sorted tables: format frequency, then mnemonic frequency
    // grouped under each format. Highest counts first.
    pub fn report(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.formats.is_empty() {
            return lines;
        }

        let mut formats: Vec<(&String, &u32)> = self.formats.iter().collect();
        formats.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

        lines.push("*".to_string());
        lines.push("*  Instruction format frequency".to_string());
        for (name, count) in &formats {
            lines.push(format!("*     {:<8} {:>5}", name, count));
        }

        lines.push("*".to_string());
        lines.push("*  Mnemonic frequency by format".to_string());
        for (format_name, _) in &formats {
            let mut group: Vec<(&String, u32)> = self
                .mnemonics
                .iter()
                .filter(|(_, (f, _))| f == *format_name)
                .map(|(m, (_, c))| (m, *c))
                .collect();
            group.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
            let mut row = format!("*     {:<8}", format_name);
            for (mnemonic, count) in group {
                if row.len() > 56 {
                    lines.push(row);
                    row = format!("*     {:<8}", "");
                }
                row.push_str(&format!(" {} {},", mnemonic, count));
            }
            lines.push(row.trim_end_matches(',').to_string());
        }
        lines
    }
}
