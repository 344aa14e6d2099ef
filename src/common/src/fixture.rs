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
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One entry of a static provisioning fixture.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FixtureUser {
    pub groups: Vec<String>,
    pub contexts: Vec<String>,
    pub demographics: Option<Vec<String>>,
}

/// `{"users": {<uid>: {groups, contexts, demographics}}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub users: BTreeMap<String, FixtureUser>,
}

impl Fixture {
    pub fn from_json(data: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(data).context("Invalid fixture file")?;
        for (uid, user) in &fixture.users {
            if !user.contexts.is_empty() {
                debug!("Ignoring contexts {:?} for fixture user {}", user.contexts, uid);
            }
        }
        Ok(fixture)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed reading fixture {}", path.display()))?;
        Fixture::from_json(&data)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdvisorEntry {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
}

/// Curated advisor accounts, `{"users": {<uid>: {firstName, lastName, email}}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvisorsFixture {
    #[serde(default)]
    pub users: BTreeMap<String, AdvisorEntry>,
}

impl AdvisorsFixture {
    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("Invalid advisors file")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed reading advisors file {}", path.display()))?;
        AdvisorsFixture::from_json(&data)
    }
}

/// User ids listed one per line. Blank lines are ignored and anything that
/// is not a numeric uid is skipped with a warning.
pub fn parse_user_ids(data: &str) -> Vec<String> {
    let mut ids: Vec<String> = vec![];
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.chars().all(|c| c.is_ascii_digit()) {
            warn!("Skipping non-numeric user id {:?}", line);
            continue;
        }
        if !ids.iter().any(|id| id == line) {
            ids.push(line.to_string());
        }
    }
    ids
}

pub fn read_user_ids<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed reading user id file {}", path.display()))?;
    Ok(parse_user_ids(&data))
}
