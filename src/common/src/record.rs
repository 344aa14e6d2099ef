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
use crate::constants::{AFFILIATION_REGISTERED_STUDENT, MAJOR_SLOTS};

/// One (college, major) pair from the student major view. The view stores
/// these as repeated suffixed columns (`college_abbr`, `college_abbr2`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MajorSlot {
    pub college_abbr: Option<String>,
    pub major_name: Option<String>,
    pub major_title: Option<String>,
}

impl MajorSlot {
    pub fn new(college_abbr: &str, major_name: &str) -> Self {
        MajorSlot {
            college_abbr: Some(college_abbr.to_string()),
            major_name: Some(major_name.to_string()),
            major_title: None,
        }
    }

    pub fn college(&self) -> Option<&str> {
        strip_to_none(self.college_abbr.as_deref())
    }

    pub fn major(&self) -> Option<&str> {
        strip_to_none(self.major_name.as_deref())
    }

    pub fn title(&self) -> Option<&str> {
        strip_to_none(self.major_title.as_deref())
    }
}

/// A person row as returned by the campus data views. Every attribute other
/// than the uid may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    pub ldap_uid: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: Option<String>,
    pub affiliations: Option<String>,
    pub ug_grad_flag: Option<String>,
    pub majors: Vec<MajorSlot>,
    pub level_desc: Option<String>,
    pub new_trfr_flag: Option<String>,
}

impl SourceRecord {
    pub fn new(ldap_uid: &str) -> Self {
        SourceRecord {
            ldap_uid: ldap_uid.to_string(),
            ..Default::default()
        }
    }

    /// Affiliation tags, split from the comma separated view column.
    pub fn affiliations(&self) -> Vec<&str> {
        match &self.affiliations {
            Some(val) => val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec![],
        }
    }

    pub fn has_affiliation(&self, tag: &str) -> bool {
        self.affiliations().contains(&tag)
    }

    pub fn is_registered_student(&self) -> bool {
        self.has_affiliation(AFFILIATION_REGISTERED_STUDENT)
    }

    pub fn ug_grad_flag(&self) -> Option<&str> {
        strip_to_none(self.ug_grad_flag.as_deref())
    }

    /// At most the four major slots the views can carry.
    pub fn major_slots(&self) -> impl Iterator<Item = &MajorSlot> {
        self.majors.iter().take(MAJOR_SLOTS)
    }
}

pub fn strip_to_none(val: Option<&str>) -> Option<&str> {
    val.map(str::trim).filter(|s| !s.is_empty())
}
