/*
   MyBerkeley campus account provisioning
   Copyright (C) The Regents of the University of California 2026

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
//! Typed payloads for the profile import servlet.
//!
//! A profile is a set of named sections, each holding `elements` keyed by
//! property name with the value wrapped as `{"value": ...}`.

use provision_common::account::AccountProps;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SECTION_BASIC: &str = "basic";
pub const SECTION_INSTITUTIONAL: &str = "institutional";
pub const SECTION_EMAIL: &str = "email";

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProfileElement {
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProfileSection {
    pub elements: BTreeMap<String, ProfileElement>,
}

impl ProfileSection {
    pub fn new() -> Self {
        ProfileSection::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.elements.insert(
            key.to_string(),
            ProfileElement {
                value: unescape_html(value),
            },
        );
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ProfileImport {
    pub sections: BTreeMap<String, ProfileSection>,
}

impl ProfileImport {
    pub fn from_props(props: &AccountProps) -> Self {
        let mut sections = BTreeMap::new();
        sections.insert(
            SECTION_BASIC.to_string(),
            ProfileSection::new()
                .with("firstName", &props.first_name)
                .with("lastName", &props.last_name),
        );
        sections.insert(
            SECTION_INSTITUTIONAL.to_string(),
            ProfileSection::new()
                .with("college", &props.college)
                .with("major", &props.major)
                .with("role", &props.role),
        );
        sections.insert(
            SECTION_EMAIL.to_string(),
            ProfileSection::new().with("email", &props.email),
        );
        ProfileImport { sections }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Campus data occasionally carries HTML entities instead of UTF-8 text.
pub fn unescape_html(val: &str) -> String {
    if !val.contains('&') {
        return val.to_string();
    }
    let mut out = String::with_capacity(val.len());
    let mut rest = val;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').and_then(|end| {
            let entity = &tail[1..end];
            decode_entity(entity).map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
