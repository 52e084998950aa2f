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

mod tag_builder;

use crate::ast::{Action, Token};
use crate::errors::DisasmError;
use anyhow::Result;
use pest::Parser;
use pest_derive::Parser;

// Derive the parser from our grammar file.
#[derive(Parser)]
#[grammar = "./grammar.pest"]
pub struct StreamParser;

// Tokenize the whole annotated hex stream. Tag groups that parse but make
// no sense (register out of range, overflowing hex) degrade to Junk tokens
// so the engine can report them in-band and keep going.
pub fn parse_stream(source: &str) -> Result<Vec<Token>> {
    let hardened = harden(source);
    let stream = StreamParser::parse(Rule::stream, &hardened)
        .map_err(DisasmError::from)?
        .next()
        .expect("stream rule always produces one pair");

    let mut tokens = Vec::new();
    for pair in stream.into_inner() {
        if pair.as_rule() != Rule::token {
            continue; // EOI
        }
        let inner = pair
            .into_inner()
            .next()
            .expect("token rule always wraps one alternative");
        match inner.as_rule() {
            Rule::hex_run => tokens.push(Token::Hex(inner.as_str().to_uppercase())),
            Rule::action => tokens.push(Token::Action(build_action(inner.as_str()))),
            Rule::tag_group => {
                let text = inner.as_str().to_string();
                match tag_builder::build_tags(inner) {
                    Ok(tags) => tokens.push(Token::Tags(tags)),
                    Err(_) => tokens.push(Token::Junk(text)),
                }
            }
            Rule::junk | Rule::stray => tokens.push(Token::Junk(inner.as_str().to_string())),
            _ => {}
        }
    }

    Ok(tokens)
}

fn build_action(text: &str) -> Action {
    match text {
        "," => Action::Code,
        "." => Action::Data,
        "/" => Action::DataReset,
        "|" => Action::NoLabel,
        _ => unreachable!("action rule only matches , . / |"),
    }
}

// Vendor report lines pad significant content with runs of blanks; three
// or more consecutive spaces outside quoted tag text end the line.
fn harden(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 1);
    for line in source.lines() {
        let mut quote: Option<char> = None;
        let mut spaces = 0usize;
        let mut cut = line.len();
        for (i, c) in line.char_indices() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                    spaces = 0;
                }
                None => {
                    if c == '\'' || c == '"' {
                        quote = Some(c);
                        spaces = 0;
                    } else if c == ' ' {
                        spaces += 1;
                        if spaces == 3 {
                            cut = i - 2;
                            break;
                        }
                    } else {
                        spaces = 0;
                    }
                }
            }
        }
        out.push_str(&line[..cut]);
        out.push('\n');
    }
    out
}

// ------------- unit tests -------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DataType, Tag, UsingTarget};

    #[test]
    fn test_parse_hex_and_action() {
        let tokens = parse_stream("18CF,5810").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Hex("18CF".to_string()),
                Token::Action(Action::Code),
                Token::Hex("5810".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_lowercase_hex() {
        let tokens = parse_stream("18cf").unwrap();
        assert_eq!(tokens, vec![Token::Hex("18CF".to_string())]);
    }

    #[test]
    fn test_parse_using_tag() {
        let tokens = parse_stream("(R12)").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Tags(vec![Tag::Using {
                regs: vec![12],
                target: UsingTarget::Here,
            }])]
        );
    }

    #[test]
    fn test_parse_using_pair() {
        let tokens = parse_stream("(R12+R13)").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Tags(vec![Tag::Using {
                regs: vec![12, 13],
                target: UsingTarget::Here,
            }])]
        );
    }

    #[test]
    fn test_parse_drop_tag() {
        let tokens = parse_stream("(R13=)").unwrap();
        assert_eq!(tokens, vec![Token::Tags(vec![Tag::Drop { regs: vec![13] }])]);
    }

    #[test]
    fn test_parse_dsect_bind() {
        let tokens = parse_stream("(R13=>WA'work area')").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Tags(vec![Tag::DsectBind {
                regs: vec![13],
                name: "WA".to_string(),
                desc: Some("work area".to_string()),
            }])]
        );
    }

    #[test]
    fn test_parse_using_label_and_location() {
        let tokens = parse_stream("(R12=BASE,R11=1000)").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Tags(vec![
                Tag::Using {
                    regs: vec![12],
                    target: UsingTarget::Label("BASE".to_string()),
                },
                Tag::Using {
                    regs: vec![11],
                    target: UsingTarget::Location(0x1000),
                },
            ])]
        );
    }

    #[test]
    fn test_parse_data_type_and_reset() {
        let tokens = parse_stream("(H,)").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Tags(vec![
                Tag::SetType(Some(DataType::Half)),
                Tag::SetType(None),
            ])]
        );
    }

    #[test]
    fn test_parse_org_tag() {
        let tokens = parse_stream("(@3C)").unwrap();
        assert_eq!(tokens, vec![Token::Tags(vec![Tag::Org(0x3C)])]);
    }

    #[test]
    fn test_parse_label_tags() {
        let tokens = parse_stream("(ENTRY,FIELDS=1C0)").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Tags(vec![
                Tag::Label("ENTRY".to_string()),
                Tag::LabelAt {
                    name: "FIELDS".to_string(),
                    loc: 0x1C0,
                },
            ])]
        );
    }

    #[test]
    fn test_parse_section_comment() {
        let tokens = parse_stream("(\"INIT  ROUTINE\",'sets up the stack')").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Tags(vec![
                Tag::Section("INIT  ROUTINE".to_string()),
                Tag::Comment("sets up the stack".to_string()),
            ])]
        );
    }

    #[test]
    fn test_invalid_hex_is_junk() {
        let tokens = parse_stream("18CF QQQQ").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Hex("18CF".to_string()),
                Token::Junk("QQQQ".to_string()),
            ]
        );
    }

    #[test]
    fn test_register_out_of_range_is_junk() {
        let tokens = parse_stream("(R16)").unwrap();
        assert_eq!(tokens, vec![Token::Junk("(R16)".to_string())]);
    }

    #[test]
    fn test_harden_cuts_triple_blank() {
        assert_eq!(harden("18CF   ignored junk"), "18CF\n");
        assert_eq!(harden("('a   b')18CF"), "('a   b')18CF\n");
    }

    #[test]
    fn test_bar_action() {
        let tokens = parse_stream("18CF|18CF").unwrap();
        assert_eq!(tokens[1], Token::Action(Action::NoLabel));
    }
}
