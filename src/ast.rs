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

// Steering characters that appear between hex runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    Code,      // ','  enter CODE mode, reset data type
    Data,      // '.'  enter DATA mode, keep data type
    DataReset, // '/'  enter DATA mode, reset data type
    NoLabel,   // '|'  keep mode, suppress the boundary auto-label
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataType {
    Addr,   // A
    Bit,    // B
    Char,   // C
    Full,   // F
    Half,   // H
    Packed, // P
    SCon,   // S
    Hex,    // X
}

impl DataType {
    pub fn from_letter(c: char) -> Option<DataType> {
        match c {
            'A' => Some(DataType::Addr),
            'B' => Some(DataType::Bit),
            'C' => Some(DataType::Char),
            'F' => Some(DataType::Full),
            'H' => Some(DataType::Half),
            'P' => Some(DataType::Packed),
            'S' => Some(DataType::SCon),
            'X' => Some(DataType::Hex),
            _ => None,
        }
    }
}

// Where a USING tag points its registers.
#[derive(Debug, Clone, PartialEq)]
pub enum UsingTarget {
    Here,           // Rn            -> USING *,Rn
    Location(u64),  // Rn=hex        -> USING <label at hex>,Rn
    Label(String),  // Rn=label      -> USING label,Rn
}

// One tag out of a parenthesized tag list.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    SetType(Option<DataType>),
    Section(String),
    Comment(String),
    Org(u64),
    Using { regs: Vec<u8>, target: UsingTarget },
    Drop { regs: Vec<u8> },
    DsectBind { regs: Vec<u8>, name: String, desc: Option<String> },
    Label(String),
    LabelAt { name: String, loc: u64 },
}

// The token stream the driver consumes. Consecutive Hex tokens are
// concatenated into a single slice; Junk carries unparseable text for
// the in-band DIS0006 diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Hex(String),
    Action(Action),
    Tags(Vec<Tag>),
    Junk(String),
}
