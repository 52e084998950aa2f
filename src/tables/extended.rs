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

// Which kind of instruction last set the condition code. Drives the
// choice of extended branch mnemonic: BE after a compare, BZ after
// arithmetic, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcClass {
    None,
    Arith,
    Compare,
    Mask,
}

// Extended mnemonic for BC. The register form (BCR) appends R.
pub fn branch_ext(class: CcClass, mask: u32) -> Option<&'static str> {
    match mask {
        15 => return Some("B"),
        0 => return Some("NOP"),
        _ => {}
    }
    let name = match (class, mask) {
        (CcClass::Compare, 2) => "BH",
        (CcClass::Compare, 4) => "BL",
        (CcClass::Compare, 8) => "BE",
        (CcClass::Compare, 13) => "BNH",
        (CcClass::Compare, 11) => "BNL",
        (CcClass::Compare, 7) => "BNE",
        (CcClass::Arith, 1) => "BO",
        (CcClass::Arith, 2) => "BP",
        (CcClass::Arith, 4) => "BM",
        (CcClass::Arith, 8) => "BZ",
        (CcClass::Arith, 14) => "BNO",
        (CcClass::Arith, 13) => "BNP",
        (CcClass::Arith, 11) => "BNM",
        (CcClass::Arith, 7) => "BNZ",
        (CcClass::Mask, 1) => "BO",
        (CcClass::Mask, 4) => "BM",
        (CcClass::Mask, 8) => "BZ",
        (CcClass::Mask, 14) => "BNO",
        (CcClass::Mask, 11) => "BNM",
        (CcClass::Mask, 7) => "BNZ",
        _ => return None,
    };
    Some(name)
}

// Extended mnemonic for BRC.
pub fn rel_branch_ext(class: CcClass, mask: u32) -> Option<&'static str> {
    match mask {
        15 => return Some("J"),
        0 => return Some("JNOP"),
        _ => {}
    }
    let name = match (class, mask) {
        (CcClass::Compare, 2) => "JH",
        (CcClass::Compare, 4) => "JL",
        (CcClass::Compare, 8) => "JE",
        (CcClass::Compare, 13) => "JNH",
        (CcClass::Compare, 11) => "JNL",
        (CcClass::Compare, 7) => "JNE",
        (CcClass::Arith, 1) => "JO",
        (CcClass::Arith, 2) => "JP",
        (CcClass::Arith, 4) => "JM",
        (CcClass::Arith, 8) => "JZ",
        (CcClass::Arith, 14) => "JNO",
        (CcClass::Arith, 13) => "JNP",
        (CcClass::Arith, 11) => "JNM",
        (CcClass::Arith, 7) => "JNZ",
        (CcClass::Mask, 1) => "JO",
        (CcClass::Mask, 4) => "JM",
        (CcClass::Mask, 8) => "JZ",
        (CcClass::Mask, 14) => "JNO",
        (CcClass::Mask, 11) => "JNM",
        (CcClass::Mask, 7) => "JNZ",
        _ => return None,
    };
    Some(name)
}

// Extended mnemonic for BRCL, the long-relative J set.
pub fn rel_long_branch_ext(class: CcClass, mask: u32) -> Option<&'static str> {
    match mask {
        15 => return Some("JLU"),
        0 => return Some("JLNOP"),
        _ => {}
    }
    let name = match (class, mask) {
        (CcClass::Compare, 2) => "JLH",
        (CcClass::Compare, 4) => "JLL",
        (CcClass::Compare, 8) => "JLE",
        (CcClass::Compare, 13) => "JLNH",
        (CcClass::Compare, 11) => "JLNL",
        (CcClass::Compare, 7) => "JLNE",
        (CcClass::Arith, 1) => "JLO",
        (CcClass::Arith, 2) => "JLP",
        (CcClass::Arith, 4) => "JLM",
        (CcClass::Arith, 8) => "JLZ",
        (CcClass::Arith, 14) => "JLNO",
        (CcClass::Arith, 13) => "JLNP",
        (CcClass::Arith, 11) => "JLNM",
        (CcClass::Arith, 7) => "JLNZ",
        (CcClass::Mask, 1) => "JLO",
        (CcClass::Mask, 4) => "JLM",
        (CcClass::Mask, 8) => "JLZ",
        (CcClass::Mask, 14) => "JLNO",
        (CcClass::Mask, 11) => "JLNM",
        (CcClass::Mask, 7) => "JLNZ",
        _ => return None,
    };
    Some(name)
}

// Condition suffix for load/store-on-condition and select.
pub fn cond_suffix(mask: u32) -> Option<&'static str> {
    let suffix = match mask {
        1 => "O",
        2 => "H",
        4 => "L",
        7 => "NE",
        8 => "E",
        11 => "NL",
        13 => "NH",
        14 => "NO",
        _ => return None,
    };
    Some(suffix)
}

// Condition suffix for compare-and-jump. The mask bits mean
// equal/low/high on the comparison outcome.
pub fn cj_suffix(mask: u32) -> Option<&'static str> {
    let suffix = match mask {
        2 => "H",
        4 => "L",
        8 => "E",
        6 => "NE",
        10 => "NL",
        12 => "NH",
        _ => return None,
    };
    Some(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconditional_and_nop() {
        assert_eq!(branch_ext(CcClass::None, 15), Some("B"));
        assert_eq!(branch_ext(CcClass::None, 0), Some("NOP"));
        assert_eq!(rel_branch_ext(CcClass::Compare, 15), Some("J"));
        assert_eq!(rel_long_branch_ext(CcClass::Arith, 0), Some("JLNOP"));
    }

    #[test]
    fn test_class_sensitive_aliases() {
        assert_eq!(branch_ext(CcClass::Compare, 8), Some("BE"));
        assert_eq!(branch_ext(CcClass::Arith, 8), Some("BZ"));
        assert_eq!(branch_ext(CcClass::Mask, 1), Some("BO"));
        assert_eq!(branch_ext(CcClass::None, 8), None);
    }

    #[test]
    fn test_suffixes() {
        assert_eq!(cond_suffix(8), Some("E"));
        assert_eq!(cond_suffix(7), Some("NE"));
        assert_eq!(cond_suffix(3), None);
        assert_eq!(cj_suffix(6), Some("NE"));
        assert_eq!(cj_suffix(12), Some("NH"));
        assert_eq!(cj_suffix(5), None);
    }
}
