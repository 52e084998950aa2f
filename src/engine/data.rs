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

use crate::ast::DataType;
use crate::engine::{BaseBinding, Engine, hex_string, sign_extend_bytes};
use crate::engine::listing::Statement;
use crate::tables::ebcdic;

const CHAR_LINE: usize = 50;
const HEX_LINE: usize = 12;

impl Engine<'_> {
    pub(crate) fn decode_data_slice(&mut self, bytes: &[u8]) {
        match self.dtype {
            Some(DataType::Addr) => self.data_addr(bytes),
            Some(DataType::Bit) => self.data_bit(bytes),
            Some(DataType::Char) => self.data_char(bytes),
            Some(DataType::Full) => self.data_int(bytes, 4, 'F'),
            Some(DataType::Half) => self.data_int(bytes, 2, 'H'),
            Some(DataType::Packed) => self.data_packed(bytes),
            Some(DataType::SCon) => self.data_scon(bytes),
            Some(DataType::Hex) => self.data_hex(bytes),
            None => self.data_auto(bytes),
        }
    }

    fn emit_data(&mut self, operands: String, chunk: &[u8], data_len: u32) {
        let stmt = Statement::data(self.loc, operands, hex_string(chunk), data_len);
        self.listing.emit(stmt, &mut self.registry);
        self.loc += chunk.len() as u64;
    }

    // Address constants materialize their target labels. Runts shorter
    // than three bytes stay numeric.
    fn data_addr(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if bytes.len() >= 4 {
                let chunk = &bytes[..4];
                let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let label = self.registry.refer(value as u64, self.loc, 0);
                let operand = if self.loc % 4 == 0 {
                    format!("A({})", label)
                } else {
                    format!("AL4({})", label)
                };
                self.emit_data(operand, chunk, 4);
                bytes = &bytes[4..];
            } else if bytes.len() == 3 {
                let value = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);
                let label = self.registry.refer(value as u64, self.loc, 0);
                self.emit_data(format!("AL3({})", label), bytes, 3);
                bytes = &bytes[3..];
            } else {
                let value = bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
                let len = bytes.len();
                self.emit_data(format!("AL{}({})", len, value), bytes, len as u32);
                bytes = &bytes[len..];
            }
        }
    }

    fn data_bit(&mut self, bytes: &[u8]) {
        for i in 0..bytes.len() {
            let chunk = &bytes[i..i + 1];
            self.emit_data(format!("B'{:08b}'", chunk[0]), chunk, 1);
        }
    }

    // Character data in lines of at most fifty bytes; trailing blanks
    // compress into an explicit length.
    fn data_char(&mut self, bytes: &[u8]) {
        let mut pos = 0;
        while pos < bytes.len() {
            let take = (bytes.len() - pos).min(CHAR_LINE);
            let chunk = &bytes[pos..pos + take];
            let trailing = chunk.iter().rev().take_while(|&&b| b == 0x40).count();
            let operand = if trailing > 0 && take > trailing {
                format!(
                    "CL{}'{}'",
                    take,
                    ebcdic::render_text(&chunk[..take - trailing])
                )
            } else if trailing == take {
                format!("CL{}' '", take)
            } else {
                format!("C'{}'", ebcdic::render_text(chunk))
            };
            self.emit_data(operand, chunk, take as u32);
            pos += take;
        }
    }

    fn data_int(&mut self, bytes: &[u8], width: usize, letter: char) {
        let mut pos = 0;
        while pos < bytes.len() {
            let take = (bytes.len() - pos).min(width);
            let chunk = &bytes[pos..pos + take];
            let value = sign_extend_bytes(chunk);
            let operand = if take == width && self.loc % width as u64 == 0 {
                format!("{}'{}'", letter, value)
            } else {
                format!("{}L{}'{}'", letter, take, value)
            };
            self.emit_data(operand, chunk, take as u32);
            pos += take;
        }
    }

    // Packed decimal: hunt for the sign nibble within eight bytes, check
    // every digit nibble on the way. Anything else decodes as binary.
    fn data_packed(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            match scan_packed(bytes) {
                Some(len) => {
                    let chunk = &bytes[..len];
                    let operand = render_packed(chunk);
                    self.emit_data(operand, chunk, len as u32);
                    bytes = &bytes[len..];
                }
                None => {
                    self.diagnostic("DIS0001", "not packed decimal, decoded as binary");
                    self.data_friendly(bytes);
                    return;
                }
            }
        }
    }

    // S-type constants, two bytes each. A run whose entries each point
    // at their own location collapses to nS(*).
    fn data_scon(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if bytes.len() < 2 {
                self.data_hex(bytes);
                return;
            }
            let mut run = 0usize;
            let mut run_loc = self.loc;
            while bytes.len() >= (run + 1) * 2 {
                let pair = &bytes[run * 2..run * 2 + 2];
                if !self.scon_points_here(pair, run_loc) {
                    break;
                }
                run += 1;
                run_loc += 2;
            }
            if run > 0 {
                let chunk = &bytes[..run * 2];
                let operand = if run == 1 {
                    "S(*)".to_string()
                } else {
                    format!("{}S(*)", run)
                };
                self.emit_data(operand, chunk, 2);
                bytes = &bytes[run * 2..];
                continue;
            }
            let pair = &bytes[..2];
            let base = (pair[0] >> 4) as usize;
            let disp = ((pair[0] as u32 & 0xF) << 8) | pair[1] as u32;
            self.emit_data(format!("S(X'{:03X}'(R{}))", disp, base), pair, 2);
            bytes = &bytes[2..];
        }
    }

    fn scon_points_here(&self, pair: &[u8], own_loc: u64) -> bool {
        let base = (pair[0] >> 4) as usize;
        let disp = ((pair[0] as u64 & 0xF) << 8) | pair[1] as u64;
        matches!(self.bases[base], BaseBinding::Csect(origin) if origin + disp == own_loc)
    }

    fn data_hex(&mut self, bytes: &[u8]) {
        let mut pos = 0;
        while pos < bytes.len() {
            let take = (bytes.len() - pos).min(HEX_LINE);
            let chunk = &bytes[pos..pos + take];
            self.emit_data(
                format!("XL{}'{}'", take, hex_string(chunk)),
                chunk,
                take as u32,
            );
            pos += take;
        }
    }

    // No type tag: split into printable and binary runs. Printable runs
    // shorter than three bytes are not worth a character constant.
    fn data_auto(&mut self, bytes: &[u8]) {
        let mut runs: Vec<(bool, usize, usize)> = Vec::new();
        for (i, &b) in bytes.iter().enumerate() {
            let printable = ebcdic::is_printable(b);
            match runs.last_mut() {
                Some((kind, _, end)) if *kind == printable => *end = i + 1,
                _ => runs.push((printable, i, i + 1)),
            }
        }
        // demote short text runs to binary, then merge
        let mut merged: Vec<(bool, usize, usize)> = Vec::new();
        for (printable, start, end) in runs {
            let text = printable && end - start >= 3;
            match merged.last_mut() {
                Some((kind, _, e)) if *kind == text => *e = end,
                _ => merged.push((text, start, end)),
            }
        }
        for (text, start, end) in merged {
            if text {
                self.data_char(&bytes[start..end]);
            } else {
                self.data_friendly(&bytes[start..end]);
            }
        }
    }

    // The friendly rendering of binary data: small aligned words and
    // halfwords as decimal, split words whose halves look independent,
    // raw hex for the rest.
    pub(crate) fn data_friendly(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if bytes.len() >= 4 {
                let chunk = &bytes[..4];
                let value = sign_extend_bytes(chunk);
                if value.abs() <= 4096 {
                    let operand = if self.loc % 4 == 0 {
                        format!("F'{}'", value)
                    } else {
                        format!("FL4'{}'", value)
                    };
                    self.emit_data(operand, chunk, 4);
                } else if (chunk[0] == 0 && chunk[1] == 0)
                    || (chunk[2] == 0 && chunk[3] == 0)
                    || (chunk[0] == 0 && chunk[2] == 0)
                {
                    self.emit_half(&chunk[..2]);
                    self.emit_half(&chunk[2..4]);
                } else {
                    self.emit_data(format!("XL4'{}'", hex_string(chunk)), chunk, 4);
                }
                bytes = &bytes[4..];
            } else if bytes.len() >= 2 {
                let chunk = &bytes[..2];
                let value = sign_extend_bytes(chunk);
                if value.abs() <= 4096 {
                    self.emit_half(chunk);
                } else {
                    self.emit_data(format!("XL2'{}'", hex_string(chunk)), chunk, 2);
                }
                bytes = &bytes[2..];
            } else {
                let chunk = &bytes[..1];
                self.emit_data(format!("AL1({})", chunk[0]), chunk, 1);
                bytes = &bytes[1..];
            }
        }
    }

    fn emit_half(&mut self, chunk: &[u8]) {
        let value = sign_extend_bytes(chunk);
        let operand = if self.loc % 2 == 0 {
            format!("H'{}'", value)
        } else {
            format!("HL2'{}'", value)
        };
        self.emit_data(operand, chunk, 2);
    }
}

fn scan_packed(bytes: &[u8]) -> Option<usize> {
    for (i, &b) in bytes.iter().take(8).enumerate() {
        let low = b & 0xF;
        if low >= 0xA {
            // every nibble before the sign must be a digit
            for &digit_byte in &bytes[..i] {
                if digit_byte >> 4 > 9 || digit_byte & 0xF > 9 {
                    return None;
                }
            }
            if b >> 4 > 9 {
                return None;
            }
            return Some(i + 1);
        }
    }
    None
}

fn render_packed(chunk: &[u8]) -> String {
    let sign_nibble = chunk[chunk.len() - 1] & 0xF;
    let sign = if sign_nibble == 0xB || sign_nibble == 0xD {
        "-"
    } else {
        ""
    };
    let mut digits = String::new();
    for (i, &b) in chunk.iter().enumerate() {
        digits.push(char::from_digit((b >> 4) as u32, 10).unwrap_or('0'));
        if i + 1 < chunk.len() {
            digits.push(char::from_digit((b & 0xF) as u32, 10).unwrap_or('0'));
        }
    }
    let trimmed = digits.trim_start_matches('0');
    let digits = if trimmed.is_empty() { "0" } else { trimmed };
    format!("PL{}'{}{}'", chunk.len(), sign, digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_packed() {
        assert_eq!(scan_packed(&[0x19, 0x36, 0x5C]), Some(3));
        assert_eq!(scan_packed(&[0x0C]), Some(1));
        // bad digit nibble ahead of the sign
        assert_eq!(scan_packed(&[0xA9, 0x5C]), None);
        // no sign within eight bytes
        assert_eq!(scan_packed(&[0x11; 9]), None);
    }

    #[test]
    fn test_render_packed() {
        assert_eq!(render_packed(&[0x19, 0x36, 0x5C]), "PL3'19365'");
        assert_eq!(render_packed(&[0x12, 0x3D]), "PL2'-123'");
        assert_eq!(render_packed(&[0x0C]), "PL1'0'");
    }
}
