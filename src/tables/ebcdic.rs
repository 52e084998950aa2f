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

// EBCDIC code page 037, restricted to characters that survive a 7-bit
// listing. Anything outside this set counts as binary for auto-detection.
pub fn ebcdic_char(byte: u8) -> Option<char> {
    let c = match byte {
        0x40 => ' ',
        0x4B => '.',
        0x4C => '<',
        0x4D => '(',
        0x4E => '+',
        0x4F => '|',
        0x50 => '&',
        0x5A => '!',
        0x5B => '$',
        0x5C => '*',
        0x5D => ')',
        0x5E => ';',
        0x60 => '-',
        0x61 => '/',
        0x6B => ',',
        0x6C => '%',
        0x6D => '_',
        0x6E => '>',
        0x6F => '?',
        0x79 => '`',
        0x7A => ':',
        0x7B => '#',
        0x7C => '@',
        0x7D => '\'',
        0x7E => '=',
        0x7F => '"',
        0x81..=0x89 => (b'a' + (byte - 0x81)) as char,
        0x91..=0x99 => (b'j' + (byte - 0x91)) as char,
        0xA1 => '~',
        0xA2..=0xA9 => (b's' + (byte - 0xA2)) as char,
        0xC0 => '{',
        0xC1..=0xC9 => (b'A' + (byte - 0xC1)) as char,
        0xD0 => '}',
        0xD1..=0xD9 => (b'J' + (byte - 0xD1)) as char,
        0xE0 => '\\',
        0xE2..=0xE9 => (b'S' + (byte - 0xE2)) as char,
        0xF0..=0xF9 => (b'0' + (byte - 0xF0)) as char,
        _ => return None,
    };
    Some(c)
}

pub fn is_printable(byte: u8) -> bool {
    ebcdic_char(byte).is_some()
}

// Text body for a C-type constant. Quotes and ampersands double per
// HLASM rules; unmapped bytes degrade to a period.
pub fn render_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match ebcdic_char(b) {
            Some('\'') => out.push_str("''"),
            Some('&') => out.push_str("&&"),
            Some(c) => out.push(c),
            None => out.push('.'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_and_digits() {
        assert_eq!(ebcdic_char(0xC1), Some('A'));
        assert_eq!(ebcdic_char(0xC9), Some('I'));
        assert_eq!(ebcdic_char(0xD1), Some('J'));
        assert_eq!(ebcdic_char(0xE2), Some('S'));
        assert_eq!(ebcdic_char(0x81), Some('a'));
        assert_eq!(ebcdic_char(0xF0), Some('0'));
        assert_eq!(ebcdic_char(0xF9), Some('9'));
    }

    #[test]
    fn test_binary_bytes() {
        assert!(!is_printable(0x00));
        assert!(!is_printable(0x41));
        assert!(!is_printable(0xFF));
        assert!(is_printable(0x40));
    }

    #[test]
    fn test_render_doubles_quote_and_ampersand() {
        assert_eq!(render_text(&[0xC1, 0x7D, 0x50, 0xC2]), "A''&&B");
    }
}
