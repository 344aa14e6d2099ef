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

//! Translation of campus person records into the account property schema.
//!
//! Everything here is pure: a record plus a [`MapperContext`] always maps to
//! the same [`AccountProps`], and missing source fields degrade to empty
//! values instead of failing.

use std::collections::BTreeMap;

use crate::account::{AccountProps, Standing};
use crate::config::{Environment, ProvisionConfig};
use crate::constants::{
    AFFILIATION_ACADEMIC_EMPLOYEE, AFFILIATION_STAFF_EMPLOYEE, AFFILIATION_VISITING,
    DEFAULT_ADVISOR_COLLEGE, DEFAULT_COLLEGE_DEMOGRAPHIC, DEFAULT_COLLEGE_PROFILE,
    DEFAULT_EMAIL_DOMAIN, ROLE_GRAD, ROLE_GUEST, ROLE_INSTRUCTOR, ROLE_STAFF, ROLE_STUDENT,
    ROLE_UNDERGRAD,
};
use crate::record::{strip_to_none, SourceRecord};

/// Environment dependent settings and translation tables used by the mapper.
#[derive(Debug, Clone)]
pub struct MapperContext {
    pub environment: Environment,
    pub email_domain: String,
    pub college_profile: BTreeMap<String, String>,
    pub college_demographic: BTreeMap<String, String>,
    pub advisor_college: String,
}

impl MapperContext {
    pub fn new(environment: Environment) -> Self {
        MapperContext {
            environment,
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            college_profile: DEFAULT_COLLEGE_PROFILE
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            college_demographic: DEFAULT_COLLEGE_DEMOGRAPHIC
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            advisor_college: DEFAULT_ADVISOR_COLLEGE.to_string(),
        }
    }

    pub fn from_config(cfg: &ProvisionConfig) -> Self {
        MapperContext {
            environment: cfg.get_environment(),
            email_domain: cfg.get_email_domain(),
            college_profile: cfg.get_college_profile_map(),
            college_demographic: cfg.get_college_demographic_map(),
            advisor_college: cfg.get_advisor_college(),
        }
    }

    /// The college segment used in demographic paths.
    pub fn demographic_college(&self, abbr: &str) -> String {
        let abbr = abbr.trim();
        let college = match self.college_demographic.get(abbr) {
            Some(val) => val.as_str(),
            None => abbr,
        };
        college.replace('&', "AND")
    }
}

pub fn map_record(rec: &SourceRecord, ctx: &MapperContext) -> AccountProps {
    let standing = determine_standing(rec);
    let current = rec.is_registered_student();
    let demographics = if current {
        determine_demographics(rec, standing, ctx)
    } else {
        vec![]
    };
    AccountProps {
        first_name: trimmed(rec.first_name.as_deref()),
        last_name: trimmed(rec.last_name.as_deref()),
        email: make_email(rec, ctx),
        role: determine_role(rec).to_string(),
        college: determine_college(rec, ctx),
        major: determine_major(rec),
        department: String::new(),
        standing,
        current,
        demographics,
    }
}

/// Profile of a manually curated advisor account.
pub fn advisor_props(first_name: &str, last_name: &str, email: &str, ctx: &MapperContext) -> AccountProps {
    AccountProps {
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        email: email.trim().to_string(),
        role: ROLE_STAFF.to_string(),
        college: ctx.advisor_college.clone(),
        major: "N/A".to_string(),
        department: String::new(),
        standing: Standing::Advisor,
        current: true,
        demographics: vec![],
    }
}

fn trimmed(val: Option<&str>) -> String {
    strip_to_none(val).unwrap_or_default().to_string()
}

pub fn make_email(rec: &SourceRecord, ctx: &MapperContext) -> String {
    match ctx.environment {
        Environment::Production => trimmed(rec.email_address.as_deref()),
        Environment::Development => {
            let squash = |val: Option<&str>| -> String {
                val.unwrap_or_default()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_lowercase()
            };
            format!(
                "{}.{}@{}",
                squash(rec.first_name.as_deref()),
                squash(rec.last_name.as_deref()),
                ctx.email_domain
            )
        }
    }
}

pub fn determine_standing(rec: &SourceRecord) -> Standing {
    let standing = Standing::from_flag(rec.ug_grad_flag());
    if standing == Standing::Unknown {
        match rec.ug_grad_flag() {
            Some(flag) => warn!(
                "{} has unrecognized ug_grad_flag {}; standing unknown",
                rec.ldap_uid, flag
            ),
            None if rec.is_registered_student() => warn!(
                "Registered student {} has no ug_grad_flag; standing unknown",
                rec.ldap_uid
            ),
            None => {}
        }
    }
    standing
}

pub fn determine_role(rec: &SourceRecord) -> &'static str {
    match rec.ug_grad_flag() {
        Some("U") => return ROLE_UNDERGRAD,
        Some("G") => return ROLE_GRAD,
        _ => {}
    }
    if rec.is_registered_student() {
        ROLE_STUDENT
    } else if rec.has_affiliation(AFFILIATION_ACADEMIC_EMPLOYEE) {
        ROLE_INSTRUCTOR
    } else if rec.has_affiliation(AFFILIATION_STAFF_EMPLOYEE) {
        ROLE_STAFF
    } else if rec.has_affiliation(AFFILIATION_VISITING) {
        ROLE_INSTRUCTOR
    } else {
        ROLE_GUEST
    }
}

pub fn determine_college(rec: &SourceRecord, ctx: &MapperContext) -> String {
    match rec.majors.first().and_then(|slot| slot.college()) {
        Some(abbr) => match ctx.college_profile.get(abbr) {
            Some(name) => name.clone(),
            None => abbr.to_string(),
        },
        None => String::new(),
    }
}

/// Human readable major, one entry per non-empty slot.
pub fn determine_major(rec: &SourceRecord) -> String {
    let mut major = String::new();
    let mut written = 0;
    for slot in rec.major_slots() {
        let Some(name) = slot.major() else {
            continue;
        };
        match written {
            0 => {}
            1 => major.push_str(" : "),
            _ => major.push_str(" ; "),
        }
        major.push_str(slot.title().unwrap_or(name));
        written += 1;
    }
    major
}

pub fn determine_demographics(
    rec: &SourceRecord,
    standing: Standing,
    ctx: &MapperContext,
) -> Vec<String> {
    let standing_segment = match standing {
        Standing::Undergrad | Standing::Grad => format!("/standings/{}", standing),
        _ => {
            info!(
                "{} has unrecognized standing; no demographics",
                rec.ldap_uid
            );
            return vec![];
        }
    };
    let mut paths = vec![];
    for slot in rec.major_slots() {
        let Some(major) = slot.major() else {
            continue;
        };
        let Some(abbr) = slot.college() else {
            warn!(
                "{} has major {} without a college; no demographics for it",
                rec.ldap_uid, major
            );
            continue;
        };
        let college = ctx.demographic_college(abbr);
        let major = major.replace('&', "AND");
        paths.push(format!("/colleges/{}{}", college, standing_segment));
        paths.push(format!(
            "/colleges/{}{}/majors/{}",
            college, standing_segment, major
        ));
    }
    if let Some(level) = strip_to_none(rec.level_desc.as_deref()) {
        paths.push(format!("/student/educ_level/{}", level));
    }
    if let Some(flag) = strip_to_none(rec.new_trfr_flag.as_deref()) {
        paths.push(format!("/student/new_trfr_flag/{}", flag));
    }
    let paths = dedup_paths(paths);
    debug!("For student {}, demographics = {:?}", rec.ldap_uid, paths);
    paths
}

/// Drops repeated paths, keeping the first occurrence of each.
pub fn dedup_paths(paths: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
