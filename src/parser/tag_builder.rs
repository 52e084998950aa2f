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

use crate::ast::{DataType, Tag, UsingTarget};
use crate::errors::DisasmError;
use crate::parser::Rule;
use pest::iterators::Pair;

// Turn a parsed tag_group pair into Tag values, in order.
pub fn build_tags(group: Pair<Rule>) -> Result<Vec<Tag>, DisasmError> {
    let mut tags = Vec::new();
    if let Some(list) = group.into_inner().next() {
        for tag in list.into_inner() {
            tags.push(build_tag(tag)?);
        }
    }
    Ok(tags)
}

fn build_tag(tag: Pair<Rule>) -> Result<Tag, DisasmError> {
    let inner = tag
        .into_inner()
        .next()
        .expect("tag rule always wraps one alternative");
    match inner.as_rule() {
        Rule::empty_tag => Ok(Tag::SetType(None)),
        Rule::dtype_tag => {
            let letter = inner.as_str().chars().next().expect("dtype is one letter");
            Ok(Tag::SetType(DataType::from_letter(letter)))
        }
        Rule::section_tag => Ok(Tag::Section(quoted_text(inner))),
        Rule::comment_tag => Ok(Tag::Comment(quoted_text(inner))),
        Rule::org_tag => {
            let hex = inner
                .into_inner()
                .next()
                .expect("org tag carries a hex number");
            Ok(Tag::Org(parse_hex(hex.as_str())?))
        }
        Rule::label_def_tag => {
            let mut parts = inner.into_inner();
            let name = parts.next().expect("label name").as_str().to_string();
            let loc = parse_hex(parts.next().expect("hex offset").as_str())?;
            Ok(Tag::LabelAt { name, loc })
        }
        Rule::label_tag => {
            let name = inner
                .into_inner()
                .next()
                .expect("label tag carries a name");
            Ok(Tag::Label(name.as_str().to_string()))
        }
        Rule::reg_tag => build_reg_tag(inner),
        other => unreachable!("unknown tag rule: {:?}", other),
    }
}

fn build_reg_tag(pair: Pair<Rule>) -> Result<Tag, DisasmError> {
    let mut parts = pair.into_inner();
    let list = parts.next().expect("reg tag starts with a register list");

    let mut regs = Vec::new();
    for reg in list.into_inner() {
        let number: u8 = reg.as_str()[1..]
            .parse()
            .map_err(|_| DisasmError::BadAnnotation {
                reason: format!("bad register {}", reg.as_str()),
            })?;
        if number > 15 {
            return Err(DisasmError::BadAnnotation {
                reason: format!("register {} out of range", reg.as_str()),
            });
        }
        regs.push(number);
    }

    let Some(bind) = parts.next() else {
        return Ok(Tag::Using {
            regs,
            target: UsingTarget::Here,
        });
    };
    let bind = bind
        .into_inner()
        .next()
        .expect("reg_bind wraps one alternative");
    match bind.as_rule() {
        Rule::using_bind => match bind.into_inner().next() {
            None => Ok(Tag::Drop { regs }),
            Some(target) => {
                let text = target.as_str();
                // An all-hex target is a location, anything else a label.
                if text.chars().all(|c| c.is_ascii_hexdigit()) {
                    Ok(Tag::Using {
                        regs,
                        target: UsingTarget::Location(parse_hex(text)?),
                    })
                } else {
                    Ok(Tag::Using {
                        regs,
                        target: UsingTarget::Label(text.to_string()),
                    })
                }
            }
        },
        Rule::dsect_bind => {
            let mut inner = bind.into_inner();
            let name = inner.next().expect("dsect name").as_str().to_string();
            let desc = inner.next().map(quoted_text);
            Ok(Tag::DsectBind { regs, name, desc })
        }
        other => unreachable!("unknown reg_bind rule: {:?}", other),
    }
}

fn quoted_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|text| text.as_str().to_string())
        .unwrap_or_default()
}

fn parse_hex(text: &str) -> Result<u64, DisasmError> {
    u64::from_str_radix(text, 16).map_err(|_| DisasmError::BadAnnotation {
        reason: format!("bad hex value {}", text),
    })
}
