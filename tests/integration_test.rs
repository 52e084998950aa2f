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

use zdasm::symbols::Symbol;
use zdasm::{Options, disassemble};

fn run(source: &str) -> String {
    disassemble(source, &Options::default()).unwrap().listing
}

// Collapse runs of blanks so column padding stays out of the assertions.
fn norm(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

fn assert_line(listing: &str, needle: &str) {
    let lines = norm(listing);
    assert!(
        lines.iter().any(|l| l.contains(needle)),
        "expected {:?} in:\n{}",
        needle,
        listing
    );
}

fn assert_no_line(listing: &str, needle: &str) {
    let lines = norm(listing);
    assert!(
        !lines.iter().any(|l| l.contains(needle)),
        "did not expect {:?} in:\n{}",
        needle,
        listing
    );
}

#[test]
fn test_simple_register_load() {
    let listing = run("18CF");
    assert_line(&listing, "@ START");
    assert_line(&listing, "LR R12,R15 Load (32) 00000000 18CF RR");
    assert_line(&listing, "END");
}

#[test]
fn test_two_halfwords() {
    let listing = run("(H)00220023");
    assert_line(&listing, "DC H'34' 00000000 0022");
    assert_line(&listing, "DC H'35' 00000002 0023");
}

#[test]
fn test_using_csect_and_branch() {
    let listing = run("(R12)18CF47F0C010");
    assert_line(&listing, "USING *,R12");
    assert_line(&listing, "L0 LR R12,R15");
    assert_line(&listing, "B 16(,R12)");
    // the branch target materializes and lands in the undefined report
    assert_line(&listing, "* Undefined labels");
    assert_line(&listing, "* L10 00000010");
}

#[test]
fn test_dsect_inference() {
    let listing = run("(R13=>WA)5810D010 5010D044 (R13=)");
    assert_line(&listing, "USING WA,R13");
    assert_line(&listing, "L R1,WA_10");
    assert_line(&listing, "ST R1,WA_44");
    assert_line(&listing, "DROP R13");
    assert_line(&listing, "WA DSECT");
    assert_line(&listing, "DS XL16");
    assert_line(&listing, "WA_10 DS XL4");
    assert_line(&listing, "DS XL48");
    assert_line(&listing, "WA_44 DS XL4");
}

#[test]
fn test_packed_decimal() {
    let result = disassemble("(P)19365C,18CF", &Options::default()).unwrap();
    assert_line(&result.listing, "DC PL3'19365' 00000000 19365C");
    // the location counter moved exactly three bytes
    assert_line(&result.listing, "L3 LR R12,R15 Load (32) 00000003 18CF");
}

#[test]
fn test_scon_run_collapses() {
    let listing = run("(R12,S)C000C002C004C100");
    assert_line(&listing, "L0 DC 3S(*)");
    assert_line(&listing, "DC S(X'100'(R12))");
}

#[test]
fn test_auto_detect_text_and_binary() {
    let listing = run("/C1C2C300000001");
    assert_line(&listing, "L0 DC C'ABC'");
    // off the word boundary, so the friendly fullword keeps its length
    assert_line(&listing, "DC FL4'1'");
}

#[test]
fn test_empty_input() {
    let listing = run("");
    assert_line(&listing, "@ START");
    assert_line(&listing, "R0 EQU 0");
    assert_line(&listing, "R15 EQU 15");
    assert_line(&listing, "END");
}

#[test]
fn test_trailing_action_emits_ds() {
    let listing = run("18CF,");
    assert_line(&listing, "L2 DS 0X");
}

#[test]
fn test_bar_suppresses_boundary_label() {
    let listing = run("18CF|18CF");
    assert_no_line(&listing, "L2");
}

#[test]
fn test_section_name_tag() {
    let listing = run("(MAIN)18CF");
    assert_line(&listing, "MAIN START");
    // the statement at the origin must not redefine the section symbol
    assert_line(&listing, "LR R12,R15");
    assert_no_line(&listing, "MAIN LR");
}

#[test]
fn test_using_is_idempotent() {
    let listing = run("(R12)(R12)18CF");
    let count = norm(&listing)
        .iter()
        .filter(|l| l.starts_with("USING *,R12"))
        .count();
    assert_eq!(count, 1, "{}", listing);
}

#[test]
fn test_independent_tags_commute() {
    let a = run("(R12,R13=>WA)5810D010");
    let b = run("(R13=>WA,R12)5810D010");
    let mut a = norm(&a);
    let mut b = norm(&b);
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn test_length_monotonicity_widens_data() {
    let listing = run("(R12)4810C0085810C008(H)0022");
    assert_line(&listing, "LH R1,L8");
    assert_line(&listing, "L R1,L8");
    // the halfword was referenced four bytes wide: a cover field takes
    // the label and the constant loses it
    assert_line(&listing, "L8 DC 0XL4");
    assert_line(&listing, "DC H'34' 00000008 0022");
    assert_no_line(&listing, "L8 DC H'34'");
}

#[test]
fn test_extended_mnemonic_after_compare() {
    let listing = run("(R12)5910C0104780C020");
    assert_line(&listing, "C R1,L10");
    assert_line(&listing, "BE 32(,R12)");
}

#[test]
fn test_relative_branch_after_compare() {
    let listing = run("1912A7840008");
    assert_line(&listing, "CR R1,R2");
    assert_line(&listing, "JE L12");
    assert_line(&listing, "* L12 00000012");
}

#[test]
fn test_svc_comment() {
    let listing = run("0A0D");
    assert_line(&listing, "SVC 13 ABEND 00000000 0A0D I");
}

#[test]
fn test_load_multiple_hint() {
    let listing = run("98ECD00C");
    assert_line(&listing, "LM R14,R12,12(R13) Load Multiple (32) 00000000 98ECD00C RS-a 60");
}

#[test]
fn test_ss_length_operand() {
    let listing = run("(R12)D203C010C014");
    assert_line(&listing, "MVC L10(4),L14");
}

#[test]
fn test_unknown_opcode_becomes_todo() {
    let result = disassemble("0000", &Options::default()).unwrap();
    assert_eq!(result.todos, 1);
    assert_line(&result.listing, "DC XL2'0000' <-- TODO (not code)");
}

#[test]
fn test_odd_hex_is_reported() {
    let result = disassemble("18C", &Options::default()).unwrap();
    assert_line(&result.listing, "*** DIS0007");
}

#[test]
fn test_invalid_input_is_reported() {
    let result = disassemble("18CF QQQQ", &Options::default()).unwrap();
    assert_line(&result.listing, "*** DIS0006");
    assert_line(&result.listing, "LR R12,R15");
}

#[test]
fn test_org_rewind() {
    let listing = run("18CF(@10)(@10),18CF");
    let lines = norm(&listing);
    let orgs = lines.iter().filter(|l| l.starts_with("ORG @+X'10'")).count();
    assert_eq!(orgs, 1, "{}", listing);
    assert_line(&listing, "L10 LR R12,R15");
}

#[test]
fn test_packed_fallback_is_diagnosed() {
    let listing = run("(P)C1C2");
    assert_line(&listing, "*** DIS0001");
    assert_line(&listing, "DC XL2'C1C2'");
}

#[test]
fn test_backward_reference_gets_patched() {
    let listing = run("(R12)18CF18CF47F0C002");
    assert_line(&listing, "L2 LR R12,R15");
}

#[test]
fn test_vector_load_emits_vector_equates() {
    let listing = run("E71000000006");
    assert_line(&listing, "VL V1,0 Vector Load 00000000 E71000000006 VRX 16");
    assert_line(&listing, "V0 EQU 0");
    assert_line(&listing, "V31 EQU 31");
}

#[test]
fn test_known_symbols_resolve_references() {
    let options = Options {
        symbols: vec![Symbol {
            name: "SAVE".to_string(),
            loc: 0x10,
        }],
        ..Options::default()
    };
    let result = disassemble("(R12)5810C010", &options).unwrap();
    assert_line(&result.listing, "L R1,SAVE");
    assert_eq!(result.undefined, 0);
}

#[test]
fn test_statistics_sections() {
    let options = Options {
        stats: true,
        ..Options::default()
    };
    let result = disassemble("18CF18CF5810C010", &options).unwrap();
    assert_line(&result.listing, "* Instruction format frequency");
    assert_line(&result.listing, "* RR 2");
    assert_line(&result.listing, "* Mnemonic frequency by format");
    assert_line(&result.listing, "* RR LR 2");
}

#[test]
fn test_start_location_option() {
    let options = Options {
        start: 0x200,
        ..Options::default()
    };
    let result = disassemble("18CF", &options).unwrap();
    assert_line(&result.listing, "@ START X'200'");
    assert_line(&result.listing, "LR R12,R15 Load (32) 00000200 18CF RR");
}

#[test]
fn test_symbols_file_round_trip() {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"[{{"name":"ENTRY","loc":"0"}},{{"name":"WORK","loc":"2C"}}]"#).unwrap();
    let symbols = zdasm::symbols::load_symbols(file.path()).unwrap();
    assert_eq!(symbols.len(), 2);
    assert_eq!(symbols[1].loc, 0x2C);
}

#[test]
fn test_section_banner_and_comment() {
    let listing = run("(\"INITIALIZATION\",'clear the flags')9200C010");
    assert!(listing.contains("*  INITIALIZATION"));
    assert!(listing.contains("*  clear the flags"));
}

#[test]
fn test_address_constants_materialize_labels() {
    let listing = run("(A)0000001000000014");
    assert_line(&listing, "DC A(L10)");
    assert_line(&listing, "DC A(L14)");
    assert_line(&listing, "* Undefined labels");
}

#[test]
fn test_bit_and_hex_constants() {
    let listing = run("(B)81(X)0102030405060708090A0B0C0D");
    assert_line(&listing, "DC B'10000001'");
    assert_line(&listing, "DC XL12'0102030405060708090A0B0C'");
    assert_line(&listing, "DC XL1'0D'");
}

#[test]
fn test_char_trailing_blank_compression() {
    let listing = run("(C)C1C2404040");
    assert_line(&listing, "DC CL5'AB'");
}

#[test]
fn test_long_displacement_is_signed() {
    let listing = run("E310D010FF04");
    assert_line(&listing, "LG R1,-4080(,R13)");
}

#[test]
fn test_compare_and_jump_extended() {
    let listing = run("EC1200088076");
    assert_line(&listing, "CRJE R1,R2,L10");
}

#[test]
fn test_rotate_zero_flag() {
    let listing = run("EC12203F0055EC1220BF0055");
    assert_line(&listing, "RISBG R1,R2,32,63,0");
    assert_line(&listing, "RISBGZ R1,R2,32,63,0");
}

#[test]
fn test_load_on_condition_extended() {
    let listing = run("EB18C01000F2");
    assert_line(&listing, "LOCE R1,16(R12)");
}
