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
//! In-memory [`Directory`] used by the engine tests.

use async_trait::async_trait;
use directory_client::{
    AclRule, Directory, DirectoryError, IntegratedUserIds, Message, PrincipalKind,
    ProfileImport, UserSearchHit,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateGroup(String),
    CreateUser(String),
    UpdateUser(String),
    DeleteUser(String),
    AddMember { group: String, member: String, kind: PrincipalKind },
    RemoveMember { group: String, member: String },
    Acl { path: String, rule: AclRule },
    ImportProfile(String),
    ClearSection { id: String, section: String },
    SetDemographics { id: String, paths: Vec<String> },
    ClearDemographics(String),
    Message(Message),
}

#[derive(Debug, Clone, Default)]
pub struct FakeUser {
    pub props: BTreeMap<String, String>,
    pub profile: Option<ProfileImport>,
    pub demographics: Vec<String>,
    pub participant: bool,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<String, FakeUser>,
    groups: BTreeMap<String, Vec<String>>,
    homes: HashSet<String>,
    counts: BTreeMap<String, u64>,
    search: Vec<UserSearchHit>,
    calls: Vec<Call>,
    failing_users: HashSet<String>,
    failing_acl: HashSet<String>,
}

/// Integrated ids are derived the way the server derives them: every user
/// carrying demographics, split on the participant flag.
pub struct FakeDirectory {
    inner: Mutex<Inner>,
}

fn status(code: u16, body: &str) -> DirectoryError {
    DirectoryError::Status {
        code,
        body: body.to_string(),
    }
}

impl FakeDirectory {
    pub fn new() -> Self {
        FakeDirectory {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }

    pub fn add_user(&self, id: &str, user: FakeUser) {
        self.with(|i| {
            i.homes.insert(id.to_string());
            i.users.insert(id.to_string(), user);
        });
    }

    pub fn user(&self, id: &str) -> Option<FakeUser> {
        self.with(|i| i.users.get(id).cloned())
    }

    pub fn fail_user(&self, id: &str) {
        self.with(|i| i.failing_users.insert(id.to_string()));
    }

    pub fn fail_acl_for(&self, principal: &str) {
        self.with(|i| i.failing_acl.insert(principal.to_string()));
    }

    pub fn clear_acl_failures(&self) {
        self.with(|i| i.failing_acl.clear());
    }

    pub fn add_home(&self, id: &str) {
        self.with(|i| i.homes.insert(id.to_string()));
    }

    pub fn set_count(&self, context: &str, count: u64) {
        self.with(|i| i.counts.insert(context.to_string(), count));
    }

    pub fn set_search(&self, hits: Vec<UserSearchHit>) {
        self.with(|i| i.search = hits);
    }

    pub fn group_exists(&self, name: &str) -> bool {
        self.with(|i| i.groups.contains_key(name))
    }

    pub fn members(&self, group: &str) -> Vec<String> {
        self.with(|i| i.groups.get(group).cloned().unwrap_or_default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|i| i.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with(|i| i.calls.clear());
    }

    fn check_user(inner: &Inner, id: &str) -> Result<(), DirectoryError> {
        if inner.failing_users.contains(id) {
            Err(status(500, "injected failure"))
        } else {
            Ok(())
        }
    }

    fn user_mut<'a>(inner: &'a mut Inner, id: &str) -> Result<&'a mut FakeUser, DirectoryError> {
        Self::check_user(inner, id)?;
        inner
            .users
            .get_mut(id)
            .ok_or_else(|| status(404, "no such user"))
    }
}

fn apply_props(user: &mut FakeUser, props: &[(&str, String)]) {
    for (k, v) in props {
        user.props.insert(k.to_string(), v.clone());
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn login(&self) -> Result<(), DirectoryError> {
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool, DirectoryError> {
        self.with(|i| {
            Self::check_user(i, id)?;
            Ok(i.users.contains_key(id))
        })
    }

    async fn get_props(&self, id: &str) -> Result<Option<Value>, DirectoryError> {
        self.with(|i| {
            Self::check_user(i, id)?;
            Ok(i.users.get(id).map(|u| json!(u.props)))
        })
    }

    async fn create_user(
        &self,
        id: &str,
        _password: &str,
        props: &[(&str, String)],
    ) -> Result<(), DirectoryError> {
        self.with(|i| {
            Self::check_user(i, id)?;
            if i.users.contains_key(id) {
                return Err(status(500, "user exists"));
            }
            let mut user = FakeUser::default();
            apply_props(&mut user, props);
            i.users.insert(id.to_string(), user);
            i.homes.insert(id.to_string());
            i.calls.push(Call::CreateUser(id.to_string()));
            Ok(())
        })
    }

    async fn update_user(&self, id: &str, props: &[(&str, String)]) -> Result<(), DirectoryError> {
        self.with(|i| {
            apply_props(Self::user_mut(i, id)?, props);
            i.calls.push(Call::UpdateUser(id.to_string()));
            Ok(())
        })
    }

    async fn delete_user(&self, id: &str) -> Result<(), DirectoryError> {
        self.with(|i| {
            Self::check_user(i, id)?;
            i.users
                .remove(id)
                .ok_or_else(|| status(404, "no such user"))?;
            i.calls.push(Call::DeleteUser(id.to_string()));
            Ok(())
        })
    }

    async fn create_group(&self, name: &str) -> Result<(), DirectoryError> {
        self.with(|i| {
            if i.groups.contains_key(name) {
                return Err(status(500, "group exists"));
            }
            i.groups.insert(name.to_string(), vec![]);
            i.calls.push(Call::CreateGroup(name.to_string()));
            Ok(())
        })
    }

    async fn group_add_member(
        &self,
        group: &str,
        member: &str,
        kind: PrincipalKind,
    ) -> Result<(), DirectoryError> {
        self.with(|i| {
            Self::check_user(i, member)?;
            let members = i
                .groups
                .get_mut(group)
                .ok_or_else(|| status(404, "no such group"))?;
            if !members.iter().any(|m| m == member) {
                members.push(member.to_string());
            }
            i.calls.push(Call::AddMember {
                group: group.to_string(),
                member: member.to_string(),
                kind,
            });
            Ok(())
        })
    }

    async fn group_remove_member(
        &self,
        group: &str,
        member: &str,
        _kind: PrincipalKind,
    ) -> Result<(), DirectoryError> {
        self.with(|i| {
            Self::check_user(i, member)?;
            if let Some(members) = i.groups.get_mut(group) {
                members.retain(|m| m != member);
            }
            i.calls.push(Call::RemoveMember {
                group: group.to_string(),
                member: member.to_string(),
            });
            Ok(())
        })
    }

    async fn group_members(&self, group: &str) -> Result<Vec<String>, DirectoryError> {
        self.with(|i| {
            i.groups
                .get(group)
                .cloned()
                .ok_or_else(|| status(404, "no such group"))
        })
    }

    async fn post_acl(&self, path: &str, rule: &AclRule) -> Result<(), DirectoryError> {
        self.with(|i| {
            i.calls.push(Call::Acl {
                path: path.to_string(),
                rule: rule.clone(),
            });
            if i.failing_acl.contains(&rule.principal) {
                Err(status(500, "acl failure"))
            } else {
                Ok(())
            }
        })
    }

    async fn import_profile(&self, id: &str, profile: &ProfileImport) -> Result<(), DirectoryError> {
        self.with(|i| {
            Self::user_mut(i, id)?.profile = Some(profile.clone());
            i.calls.push(Call::ImportProfile(id.to_string()));
            Ok(())
        })
    }

    async fn clear_profile_section(&self, id: &str, section: &str) -> Result<(), DirectoryError> {
        self.with(|i| {
            if let Some(profile) = Self::user_mut(i, id)?.profile.as_mut() {
                profile.sections.remove(section);
            }
            i.calls.push(Call::ClearSection {
                id: id.to_string(),
                section: section.to_string(),
            });
            Ok(())
        })
    }

    async fn set_demographics(&self, id: &str, paths: &[String]) -> Result<(), DirectoryError> {
        self.with(|i| {
            Self::user_mut(i, id)?.demographics = paths.to_vec();
            i.calls.push(Call::SetDemographics {
                id: id.to_string(),
                paths: paths.to_vec(),
            });
            Ok(())
        })
    }

    async fn clear_demographics(&self, id: &str) -> Result<(), DirectoryError> {
        self.with(|i| {
            Self::user_mut(i, id)?.demographics.clear();
            i.calls.push(Call::ClearDemographics(id.to_string()));
            Ok(())
        })
    }

    async fn integrated_user_ids(&self) -> Result<IntegratedUserIds, DirectoryError> {
        self.with(|i| {
            let mut ids = IntegratedUserIds::default();
            for (id, user) in &i.users {
                if user.participant {
                    ids.participants.push(id.clone());
                } else if !user.demographics.is_empty() {
                    ids.nonparticipants.push(id.clone());
                }
            }
            Ok(ids)
        })
    }

    async fn demographic_count(
        &self,
        context: &str,
        _criteria: &str,
    ) -> Result<u64, DirectoryError> {
        self.with(|i| {
            i.counts
                .get(context)
                .copied()
                .ok_or_else(|| status(404, "no such list"))
        })
    }

    async fn search(&self, _query: &str) -> Result<Vec<UserSearchHit>, DirectoryError> {
        self.with(|i| Ok(i.search.clone()))
    }

    async fn home_exists(&self, id: &str) -> Result<bool, DirectoryError> {
        self.with(|i| Ok(i.homes.contains(id)))
    }

    async fn send_message(&self, message: &Message) -> Result<(), DirectoryError> {
        self.with(|i| {
            i.calls.push(Call::Message(message.clone()));
            Ok(())
        })
    }
}
