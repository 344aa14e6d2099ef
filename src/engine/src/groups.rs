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
use directory_client::{
    home_path, AclRule, Directory, DirectoryError, PrincipalKind, Privilege,
};
use provision_common::account::Standing;

const EVERYONE: &str = "everyone";
const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHandle {
    pub name: String,
}

/// Create `name`, or assume it already exists if creation fails.
pub async fn get_or_create_group<D: Directory + ?Sized>(dir: &D, name: &str) -> GroupHandle {
    match dir.create_group(name).await {
        Ok(()) => info!("Created group {}", name),
        Err(e) => debug!("Did not create group {}, assuming it exists: {}", name, e),
    }
    GroupHandle {
        name: name.to_string(),
    }
}

/// The two canonical groups every account is placed in.
#[derive(Debug, Clone)]
pub struct Groups {
    pub advisors: GroupHandle,
    pub students: GroupHandle,
}

impl Groups {
    pub async fn ensure<D: Directory + ?Sized>(dir: &D, advisors: &str, students: &str) -> Self {
        Groups {
            advisors: get_or_create_group(dir, advisors).await,
            students: get_or_create_group(dir, students).await,
        }
    }

    pub fn kind_of(&self, id: &str) -> PrincipalKind {
        if id == self.advisors.name || id == self.students.name {
            PrincipalKind::Group
        } else {
            PrincipalKind::of(id)
        }
    }

    /// The group an account of `standing` belongs to.
    pub fn home_group(&self, standing: Standing) -> &GroupHandle {
        match standing {
            Standing::Advisor => &self.advisors,
            _ => &self.students,
        }
    }

    /// Access rules for an account home, denies first.
    pub fn account_acl(&self, account: &str, standing: Standing) -> Vec<AclRule> {
        let mut rules = vec![
            AclRule::deny(EVERYONE, Privilege::All),
            AclRule::deny(ANONYMOUS, Privilege::All),
            AclRule::grant(&self.advisors.name, Privilege::Read),
            AclRule::grant(account, Privilege::All),
        ];
        if standing == Standing::Advisor {
            rules.push(AclRule::grant(&self.students.name, Privilege::Read));
            rules.push(AclRule::grant(&self.advisors.name, Privilege::All));
        }
        rules
    }

    /// Apply every rule of the template in order. A failed rule is logged
    /// and the remaining ones are still attempted. Returns the number of
    /// failed rules.
    pub async fn apply_account_acl<D: Directory + ?Sized>(
        &self,
        dir: &D,
        account: &str,
        standing: Standing,
    ) -> usize {
        let home = home_path(account);
        let mut failed = 0;
        for rule in self.account_acl(account, standing) {
            if let Err(e) = dir.post_acl(&home, &rule).await {
                error!("Failed setting ACL {} on {}: {}", rule, home, e);
                failed += 1;
            }
        }
        failed
    }

    pub async fn add_member<D: Directory + ?Sized>(
        &self,
        dir: &D,
        group: &GroupHandle,
        id: &str,
    ) -> Result<(), DirectoryError> {
        dir.group_add_member(&group.name, id, self.kind_of(id)).await
    }

    pub async fn remove_member<D: Directory + ?Sized>(
        &self,
        dir: &D,
        group: &GroupHandle,
        id: &str,
    ) -> Result<(), DirectoryError> {
        dir.group_remove_member(&group.name, id, self.kind_of(id))
            .await
    }
}
