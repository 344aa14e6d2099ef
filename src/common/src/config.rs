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
use configparser::ini::Ini;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USER, DEFAULT_ADVISORS_GROUP, DEFAULT_ADVISOR_COLLEGE,
    DEFAULT_AUTH_MODE, DEFAULT_COLLEGES, DEFAULT_COLLEGE_DEMOGRAPHIC, DEFAULT_COLLEGE_PROFILE,
    DEFAULT_CONFIG_PATH, DEFAULT_CONN_TIMEOUT, DEFAULT_DB_PATH, DEFAULT_DYNAMIC_LISTS,
    DEFAULT_EMAIL_DOMAIN, DEFAULT_ENVIRONMENT, DEFAULT_INDEX_WAIT, DEFAULT_REFRESH_ACLS,
    DEFAULT_REMAINING_SOURCE, DEFAULT_REPORT_GROUP, DEFAULT_SERVER_URL, DEFAULT_STUDENTS_GROUP,
};

/// Run environment. Anything other than production gets synthesized email
/// addresses so that test servers never mail real people.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn parse(val: &str) -> Environment {
        match val.trim().to_lowercase().as_str() {
            "prod" | "production" => Environment::Production,
            "dev" | "development" | "qa" | "test" => Environment::Development,
            _ => {
                warn!("Unrecognized run environment '{}', assuming dev", val);
                Environment::Development
            }
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "dev"),
            Environment::Production => write!(f, "prod"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Log in once through the form login servlet and carry the session cookie.
    Form,
    /// Send basic credentials with every request.
    Basic,
}

/// Where the set of previously provisioned accounts is read from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RemainingSource {
    IntegratedUserIds,
    StudentsGroup,
}

fn match_bool(val: Option<String>, default: bool) -> bool {
    match val {
        Some(val) => match val.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            "1" => true,
            "0" => false,
            _ => {
                error!("Unrecognized boolean value '{}'", val);
                default
            }
        },
        None => default,
    }
}

fn match_u64(name: &str, val: Option<String>, default: u64) -> u64 {
    match val {
        Some(val) => match val.parse::<u64>() {
            Ok(n) => n,
            Err(_) => {
                error!("Failed parsing {} from config: {}", name, val);
                default
            }
        },
        None => default,
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Clone)]
pub struct ProvisionConfig {
    config: Ini,
}

impl ProvisionConfig {
    pub fn new(config_path: Option<&str>) -> Result<ProvisionConfig, String> {
        // College abbreviations are upper case keys, so keep case.
        let mut sconfig = Ini::new_cs();
        let filename = config_path.unwrap_or(DEFAULT_CONFIG_PATH).to_string();
        let cfg_path = PathBuf::from(filename.clone());
        if cfg_path.exists() {
            if let Err(e) = sconfig.load(filename.clone()) {
                return Err(format!(
                    "failed to read config from {} - cannot start up: {} Quitting.",
                    filename, e
                ));
            }
        } else if config_path.is_some() {
            return Err(format!("config file {} does not exist", filename));
        } else {
            debug!("{} not found, using defaults", filename);
        }
        Ok(ProvisionConfig {
            config: sconfig,
        })
    }

    pub fn get(&self, section: &str, option: &str) -> Option<String> {
        self.config.get(section, option)
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.config.set(section, key, Some(value.to_string()));
    }

    /// Base URL of the application server, always with a trailing slash.
    pub fn get_server_url(&self) -> String {
        let mut url = self
            .config
            .get("server", "url")
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        if !url.ends_with('/') {
            url.push('/');
        }
        url
    }

    pub fn get_admin_user(&self) -> String {
        match self.config.get("server", "admin_user") {
            Some(val) => val,
            None => DEFAULT_ADMIN_USER.to_string(),
        }
    }

    pub fn get_admin_password(&self) -> String {
        match self.config.get("server", "admin_password") {
            Some(val) => val,
            None => DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }

    pub fn get_auth_mode(&self) -> AuthMode {
        match self.config.get("server", "auth_mode") {
            Some(val) => match val.to_lowercase().as_str() {
                "form" | "cookie" => AuthMode::Form,
                "basic" => AuthMode::Basic,
                _ => {
                    warn!("Invalid auth_mode configured, using default ...");
                    DEFAULT_AUTH_MODE
                }
            },
            None => DEFAULT_AUTH_MODE,
        }
    }

    pub fn get_connection_timeout(&self) -> u64 {
        match_u64(
            "connection_timeout",
            self.config.get("server", "connection_timeout"),
            DEFAULT_CONN_TIMEOUT,
        )
    }

    pub fn get_environment(&self) -> Environment {
        match self.config.get("global", "environment") {
            Some(val) => Environment::parse(&val),
            None => DEFAULT_ENVIRONMENT,
        }
    }

    pub fn get_debug(&self) -> bool {
        match_bool(self.config.get("global", "debug"), false)
    }

    pub fn get_db_path(&self) -> String {
        match self.config.get("database", "path") {
            Some(val) => val,
            None => DEFAULT_DB_PATH.to_string(),
        }
    }

    pub fn get_user_password_key(&self) -> Option<String> {
        self.config
            .get("global", "user_password_key")
            .filter(|k| !k.is_empty())
    }

    pub fn get_email_domain(&self) -> String {
        match self.config.get("global", "email_domain") {
            Some(val) => val,
            None => DEFAULT_EMAIL_DOMAIN.to_string(),
        }
    }

    pub fn get_colleges(&self) -> Vec<String> {
        match self.config.get("reconcile", "colleges") {
            Some(val) => split_list(&val),
            None => DEFAULT_COLLEGES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn get_advisors_group(&self) -> String {
        match self.config.get("groups", "advisors") {
            Some(val) => val,
            None => DEFAULT_ADVISORS_GROUP.to_string(),
        }
    }

    pub fn get_students_group(&self) -> String {
        match self.config.get("groups", "students") {
            Some(val) => val,
            None => DEFAULT_STUDENTS_GROUP.to_string(),
        }
    }

    pub fn get_report_group(&self) -> String {
        match self.config.get("groups", "report") {
            Some(val) => val,
            None => DEFAULT_REPORT_GROUP.to_string(),
        }
    }

    pub fn get_advisor_college(&self) -> String {
        match self.config.get("global", "advisor_college") {
            Some(val) => val,
            None => DEFAULT_ADVISOR_COLLEGE.to_string(),
        }
    }

    pub fn get_remaining_source(&self) -> RemainingSource {
        match self.config.get("reconcile", "remaining_source") {
            Some(val) => match val.to_lowercase().as_str() {
                "userids" | "integrated" => RemainingSource::IntegratedUserIds,
                "group" | "students_group" => RemainingSource::StudentsGroup,
                _ => {
                    warn!("Invalid remaining_source configured, using default ...");
                    DEFAULT_REMAINING_SOURCE
                }
            },
            None => DEFAULT_REMAINING_SOURCE,
        }
    }

    pub fn get_refresh_acls(&self) -> bool {
        match_bool(
            self.config.get("reconcile", "refresh_acls"),
            DEFAULT_REFRESH_ACLS,
        )
    }

    /// Seconds to wait for the search index before counting students.
    pub fn get_index_wait(&self) -> u64 {
        match_u64(
            "index_wait",
            self.config.get("report", "index_wait"),
            DEFAULT_INDEX_WAIT,
        )
    }

    fn get_section_map(&self, section: &str, defaults: &[(&str, &str)]) -> BTreeMap<String, String> {
        match self.config.get_map_ref().get(section) {
            Some(entries) => entries
                .iter()
                .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
                .collect(),
            None => defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// College abbreviation to profile display name.
    pub fn get_college_profile_map(&self) -> BTreeMap<String, String> {
        self.get_section_map("college_profile", DEFAULT_COLLEGE_PROFILE)
    }

    /// College abbreviation to the college segment used in demographic paths.
    pub fn get_college_demographic_map(&self) -> BTreeMap<String, String> {
        self.get_section_map("college_demographic", DEFAULT_COLLEGE_DEMOGRAPHIC)
    }

    /// College abbreviation to the dynamic list context counted in reports.
    pub fn get_dynamic_lists(&self) -> BTreeMap<String, String> {
        self.get_section_map("dynamic_lists", DEFAULT_DYNAMIC_LISTS)
    }
}
