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
use async_trait::async_trait;
use provision_common::constants::GROUP_PREFIX;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::DirectoryError;
use crate::profile::ProfileImport;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Privilege {
    Read,
    Write,
    All,
}

impl Privilege {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privilege::Read => "jcr:read",
            Privilege::Write => "jcr:write",
            Privilege::All => "jcr:all",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Granted => "granted",
            Access::Denied => "denied",
        }
    }
}

/// A single access control entry for one principal on one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclRule {
    pub principal: String,
    pub privilege: Privilege,
    pub access: Access,
}

impl AclRule {
    pub fn grant(principal: &str, privilege: Privilege) -> Self {
        AclRule {
            principal: principal.to_string(),
            privilege,
            access: Access::Granted,
        }
    }

    pub fn deny(principal: &str, privilege: Privilege) -> Self {
        AclRule {
            principal: principal.to_string(),
            privilege,
            access: Access::Denied,
        }
    }
}

impl fmt::Display for AclRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.principal,
            self.privilege.as_str(),
            self.access.as_str()
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    /// Group ids are distinguished from user ids by their reserved prefix.
    pub fn of(id: &str) -> Self {
        if id.starts_with(GROUP_PREFIX) {
            PrincipalKind::Group
        } else {
            PrincipalKind::User
        }
    }

    fn segment(&self) -> &'static str {
        match self {
            PrincipalKind::User => "user",
            PrincipalKind::Group => "group",
        }
    }
}

pub fn principal_path(id: &str, kind: PrincipalKind) -> String {
    format!("/system/userManager/{}/{}", kind.segment(), id)
}

pub fn home_path(id: &str) -> String {
    format!("~{}", id)
}

/// The server's partition of accounts carrying campus data.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct IntegratedUserIds {
    pub participants: Vec<String>,
    pub nonparticipants: Vec<String>,
    pub dropped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSearchHit {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserSearchHit {
    pub fn from_value(hit: &Value) -> Option<Self> {
        let user_id = hit.get("rep:userId")?.as_str()?.to_string();
        let basic = |field: &str| -> String {
            hit.pointer(&format!("/basic/elements/{}/value", field))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Some(UserSearchHit {
            user_id,
            first_name: basic("firstName"),
            last_name: basic("lastName"),
            email: basic("email"),
        })
    }
}

/// An internal message delivered to every member of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to_group: String,
    pub subject: String,
    pub body: String,
}

/// The REST surface of the content system as used by provisioning. Every
/// call is a single request; nothing is retried.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Establish a session. Must succeed before any other call.
    async fn login(&self) -> Result<(), DirectoryError>;

    async fn exists(&self, id: &str) -> Result<bool, DirectoryError>;

    /// The user's stored properties, or `None` if there is no such user.
    async fn get_props(&self, id: &str) -> Result<Option<Value>, DirectoryError>;

    async fn create_user(
        &self,
        id: &str,
        password: &str,
        props: &[(&str, String)],
    ) -> Result<(), DirectoryError>;

    async fn update_user(&self, id: &str, props: &[(&str, String)]) -> Result<(), DirectoryError>;

    async fn delete_user(&self, id: &str) -> Result<(), DirectoryError>;

    async fn create_group(&self, name: &str) -> Result<(), DirectoryError>;

    async fn group_add_member(
        &self,
        group: &str,
        member: &str,
        kind: PrincipalKind,
    ) -> Result<(), DirectoryError>;

    async fn group_remove_member(
        &self,
        group: &str,
        member: &str,
        kind: PrincipalKind,
    ) -> Result<(), DirectoryError>;

    async fn group_members(&self, group: &str) -> Result<Vec<String>, DirectoryError>;

    /// Apply one access control entry to `path`.
    async fn post_acl(&self, path: &str, rule: &AclRule) -> Result<(), DirectoryError>;

    async fn import_profile(&self, id: &str, profile: &ProfileImport) -> Result<(), DirectoryError>;

    /// Replace a profile section with an empty one.
    async fn clear_profile_section(&self, id: &str, section: &str) -> Result<(), DirectoryError>;

    /// Replace the user's demographic paths.
    async fn set_demographics(&self, id: &str, paths: &[String]) -> Result<(), DirectoryError>;

    async fn clear_demographics(&self, id: &str) -> Result<(), DirectoryError>;

    async fn integrated_user_ids(&self) -> Result<IntegratedUserIds, DirectoryError>;

    /// Number of users matching `criteria` within a dynamic list context.
    async fn demographic_count(&self, context: &str, criteria: &str)
        -> Result<u64, DirectoryError>;

    async fn search(&self, query: &str) -> Result<Vec<UserSearchHit>, DirectoryError>;

    /// Whether a home (user or group) exists at `~<id>`.
    async fn home_exists(&self, id: &str) -> Result<bool, DirectoryError>;

    async fn send_message(&self, message: &Message) -> Result<(), DirectoryError>;
}
