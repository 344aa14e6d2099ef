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
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    Undergrad,
    Grad,
    Advisor,
    Unknown,
}

impl Standing {
    pub fn from_flag(flag: Option<&str>) -> Standing {
        match flag.map(str::trim) {
            Some("U") => Standing::Undergrad,
            Some("G") => Standing::Grad,
            _ => Standing::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Standing::Undergrad => "undergrad",
            Standing::Grad => "grad",
            Standing::Advisor => "advisor",
            Standing::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The target property schema of a provisioned account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProps {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub college: String,
    pub major: String,
    // Always empty. The profile page template cannot handle a missing value.
    pub department: String,
    pub standing: Standing,
    pub current: bool,
    pub demographics: Vec<String>,
}

impl Default for AccountProps {
    fn default() -> Self {
        AccountProps {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            role: String::new(),
            college: String::new(),
            major: String::new(),
            department: String::new(),
            standing: Standing::Unknown,
            current: false,
            demographics: vec![],
        }
    }
}

impl AccountProps {
    /// Basic profile properties as the user manager servlets expect them.
    pub fn basic_profile_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("email", self.email.clone()),
            ("firstName", self.first_name.clone()),
            ("lastName", self.last_name.clone()),
            ("role", self.role.clone()),
            ("department", self.department.clone()),
            ("college", self.college.clone()),
            ("major", self.major.clone()),
            ("standing", self.standing.to_string()),
        ]
    }
}
