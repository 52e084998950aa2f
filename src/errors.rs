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

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DisasmError {
    #[error("Syntax Error: {0}")]
    PestError(#[from] pest::error::Error<crate::parser::Rule>),

    #[error("DIS0002 format {format}: template is {template} nibbles but length says {length}")]
    TemplateLengthMismatch {
        format: String,
        template: u32,
        length: u32,
    },

    #[error("DIS0003 duplicate mnemonic {0}")]
    DuplicateMnemonic(String),

    #[error("DIS0004 duplicate opcode {0}")]
    DuplicateOpcode(String),

    #[error("DIS0005 instruction {mnemonic} names unknown format {format}")]
    UnknownFormat { mnemonic: String, format: String },

    #[error("Table Error on line {line}: {reason}")]
    TableSyntax { line: usize, reason: String },

    #[error("Annotation Error: {reason}")]
    BadAnnotation { reason: String },

    #[error("Symbol Error: {reason}")]
    BadSymbol { reason: String },
}
