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
//! The reconciliation pass: compute the delta between campus data and the
//! accounts already on the server, then apply it one account at a time.

use anyhow::{anyhow, Result};
use directory_client::profile::{SECTION_EMAIL, SECTION_INSTITUTIONAL};
use directory_client::{home_path, Directory, DirectoryError, PrincipalKind, ProfileImport};
use provision_common::account::AccountProps;
use provision_common::config::{ProvisionConfig, RemainingSource};
use provision_common::fixture::{AdvisorsFixture, Fixture};
use provision_common::mapper::{advisor_props, dedup_paths, map_record, MapperContext};
use provision_common::password::make_password;
use provision_common::source::PersonSource;
use std::collections::{HashMap, HashSet};

use crate::groups::{GroupHandle, Groups};
use crate::state::{Outcome, ReconciliationState};

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub colleges: Vec<String>,
    pub remaining_source: RemainingSource,
    pub refresh_acls: bool,
    pub password_key: Option<String>,
    pub advisors_group: String,
    pub students_group: String,
}

impl ReconcileOptions {
    pub fn from_config(cfg: &ProvisionConfig) -> Self {
        ReconcileOptions {
            colleges: cfg.get_colleges(),
            remaining_source: cfg.get_remaining_source(),
            refresh_acls: cfg.get_refresh_acls(),
            password_key: cfg.get_user_password_key(),
            advisors_group: cfg.get_advisors_group(),
            students_group: cfg.get_students_group(),
        }
    }
}

/// Optional inputs of a pass beyond the configured colleges.
#[derive(Debug, Default)]
pub struct RunPlan {
    pub advisors: Option<AdvisorsFixture>,
    pub listed_ids: Option<Vec<String>>,
    pub fixture: Option<Fixture>,
}

pub struct Reconciler<'a, D: Directory + ?Sized, S: PersonSource + ?Sized> {
    dir: &'a D,
    source: &'a S,
    mapper: MapperContext,
    options: ReconcileOptions,
    groups: Groups,
    members: HashMap<String, HashSet<String>>,
    state: ReconciliationState,
}

impl<'a, D: Directory + ?Sized, S: PersonSource + ?Sized> Reconciler<'a, D, S> {
    /// Sets up a pass. The canonical groups are created here if missing.
    pub async fn new(
        dir: &'a D,
        source: &'a S,
        mapper: MapperContext,
        options: ReconcileOptions,
    ) -> Reconciler<'a, D, S> {
        let groups = Groups::ensure(dir, &options.advisors_group, &options.students_group).await;
        Reconciler {
            dir,
            source,
            mapper,
            options,
            groups,
            members: HashMap::new(),
            state: ReconciliationState::new(),
        }
    }

    pub fn groups(&self) -> &Groups {
        &self.groups
    }

    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    pub fn into_state(self) -> ReconciliationState {
        self.state
    }

    /// One full pass in the fixed order. Only failing to read the current
    /// server state or the campus data aborts the pass.
    pub async fn run(&mut self, plan: &RunPlan) -> Result<()> {
        if let Some(advisors) = &plan.advisors {
            self.load_advisors(advisors).await;
        }
        self.collect_integrated_accounts().await?;
        self.load_target_accounts().await?;
        if let Some(ids) = &plan.listed_ids {
            self.load_listed_accounts(ids).await;
        }
        if let Some(fixture) = &plan.fixture {
            self.load_fixture_accounts(fixture).await;
        }
        self.refresh_stale_participants().await;
        self.drop_stale_accounts().await;
        Ok(())
    }

    #[instrument(level = "debug", skip_all)]
    pub async fn collect_integrated_accounts(&mut self) -> Result<(), DirectoryError> {
        match self.options.remaining_source {
            RemainingSource::IntegratedUserIds => {
                let ids = self.dir.integrated_user_ids().await?;
                let remaining = ids
                    .nonparticipants
                    .iter()
                    .chain(ids.participants.iter())
                    .cloned()
                    .collect::<Vec<String>>();
                self.state.set_remaining(remaining);
                self.state.set_participants(ids.participants);
            }
            RemainingSource::StudentsGroup => {
                let members = self
                    .dir
                    .group_members(&self.groups.students.name)
                    .await?;
                let users = members
                    .into_iter()
                    .filter(|m| self.groups.kind_of(m) == PrincipalKind::User)
                    .collect::<Vec<String>>();
                self.state.set_remaining(users);
            }
        }
        info!(
            "Found {} integrated accounts, {} participants",
            self.state.remaining().len(),
            self.state.participant_count()
        );
        Ok(())
    }

    pub async fn load_target_accounts(&mut self) -> Result<()> {
        let students = self
            .source
            .select_students_from_colleges(&self.options.colleges)?;
        info!(
            "DB returned {} student records for colleges {:?}",
            students.len(),
            self.options.colleges
        );
        for rec in students {
            let uid = rec.ldap_uid.trim().to_string();
            let props = map_record(&rec, &self.mapper);
            if !props.current {
                info!("Skipping {}, not a registered student", uid);
                continue;
            }
            self.provision_and_record(&uid, &props).await;
        }
        Ok(())
    }

    /// Provision accounts listed by uid, in addition to the college query.
    pub async fn load_listed_accounts(&mut self, ids: &[String]) {
        for uid in ids {
            match self.source.select_person(uid) {
                Ok(Some(rec)) => {
                    let props = map_record(&rec, &self.mapper);
                    if !props.current {
                        info!("Skipping {}, not a registered student", uid);
                        continue;
                    }
                    self.provision_and_record(uid, &props).await;
                }
                Ok(None) => warn!("No campus record for listed user {}", uid),
                Err(e) => {
                    error!("Failed looking up listed user {}: {:?}", uid, e);
                    self.state.record_failure(uid, &e.to_string());
                }
            }
        }
    }

    pub async fn load_advisors(&mut self, advisors: &AdvisorsFixture) {
        for (uid, entry) in &advisors.users {
            let props = advisor_props(&entry.first_name, &entry.last_name, &entry.email, &self.mapper);
            if let Some(outcome) = self.provision_and_record(uid, &props).await {
                info!("Loaded advisor {} ({:?})", uid, outcome);
            }
        }
    }

    /// Provision test and special accounts. Fixture demographics replace the
    /// mapped ones and fixture groups are joined in addition.
    pub async fn load_fixture_accounts(&mut self, fixture: &Fixture) {
        for (uid, user) in &fixture.users {
            let rec = match self.source.select_person(uid) {
                Ok(Some(rec)) => rec,
                Ok(None) => {
                    warn!("No campus record for fixture user {}", uid);
                    continue;
                }
                Err(e) => {
                    error!("Failed looking up fixture user {}: {:?}", uid, e);
                    self.state.record_failure(uid, &e.to_string());
                    continue;
                }
            };
            let mut props = map_record(&rec, &self.mapper);
            if let Some(demographics) = &user.demographics {
                props.demographics = dedup_paths(demographics.clone());
            }
            // Already handled this pass: apply the overrides but count it once.
            let first = self.state.begin(uid);
            match self.provision(uid, &props).await {
                Ok(created) => {
                    let retried = self.state.clear_failure(uid);
                    if first || retried {
                        self.state.record(uid, created);
                    }
                }
                Err(e) => {
                    error!("Failed provisioning fixture user {}: {}", uid, e);
                    self.state.record_failure(uid, &e.to_string());
                    continue;
                }
            }
            for group in &user.groups {
                let handle = GroupHandle {
                    name: group.clone(),
                };
                if let Err(e) = self.ensure_member(&handle, uid).await {
                    error!("Failed adding {} to group {}: {}", uid, group, e);
                }
            }
        }
    }

    /// Participants are never dropped. Any still left over are refreshed
    /// from their campus record instead.
    pub async fn refresh_stale_participants(&mut self) {
        let stale = self
            .state
            .remaining()
            .iter()
            .filter(|id| self.state.is_participant(id))
            .cloned()
            .collect::<Vec<String>>();
        for uid in stale {
            info!("Refreshing old participant {}", uid);
            match self.source.select_person(&uid) {
                Ok(Some(rec)) => {
                    let props = map_record(&rec, &self.mapper);
                    self.provision_and_record(&uid, &props).await;
                }
                Ok(None) => {
                    warn!("No campus record for participant {}, keeping account", uid);
                    self.state.retain_participant(&uid);
                }
                Err(e) => {
                    error!("Failed looking up participant {}: {:?}", uid, e);
                    self.state.record_failure(&uid, &e.to_string());
                }
            }
        }
    }

    pub async fn drop_stale_accounts(&mut self) {
        let stale = self.state.remaining().to_vec();
        for uid in stale {
            self.drop_account(&uid).await;
        }
        info!("Dropped {} accounts", self.state.dropped_accounts.len());
    }

    /// Strip campus data from an account. The account itself is kept.
    async fn drop_account(&mut self, uid: &str) {
        let mut errors = vec![];
        if let Err(e) = self.dir.clear_demographics(uid).await {
            errors.push(format!("demographics: {}", e));
        }
        let students = self.groups.students.clone();
        if let Err(e) = self.groups.remove_member(self.dir, &students, uid).await {
            errors.push(format!("group {}: {}", students.name, e));
        } else if let Some(members) = self.members.get_mut(&students.name) {
            members.remove(uid);
        }
        for section in [SECTION_EMAIL, SECTION_INSTITUTIONAL] {
            if let Err(e) = self.dir.clear_profile_section(uid, section).await {
                errors.push(format!("{} section: {}", section, e));
            }
        }
        if errors.is_empty() {
            info!("Dropped {}", uid);
            self.state.record_dropped(uid);
        } else {
            let reason = errors.join("; ");
            error!("Failed dropping {}: {}", uid, reason);
            self.state.record_failure(uid, &reason);
        }
    }

    /// Rewrite the profiles of everyone in the advisors group.
    pub async fn refresh_advisors(&mut self) -> Result<usize, DirectoryError> {
        let hits = self.dir.search(&self.groups.advisors.name).await?;
        let mut refreshed = 0;
        for hit in hits {
            let props = advisor_props(&hit.first_name, &hit.last_name, &hit.email, &self.mapper);
            let result = match self
                .dir
                .update_user(&hit.user_id, &props.basic_profile_fields())
                .await
            {
                Ok(()) => {
                    self.dir
                        .import_profile(&hit.user_id, &ProfileImport::from_props(&props))
                        .await
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    debug!("Refreshed advisor {}", hit.user_id);
                    refreshed += 1;
                }
                Err(e) => {
                    error!("Failed refreshing advisor {}: {}", hit.user_id, e);
                    self.state.record_failure(&hit.user_id, &e.to_string());
                }
            }
        }
        info!("Refreshed {} advisors", refreshed);
        Ok(refreshed)
    }

    async fn provision_and_record(&mut self, uid: &str, props: &AccountProps) -> Option<Outcome> {
        if !self.state.begin(uid) {
            debug!("{} already provisioned in this pass", uid);
            return None;
        }
        match self.provision(uid, props).await {
            Ok(created) => Some(self.state.record(uid, created)),
            Err(e) => {
                error!("Failed provisioning {}: {}", uid, e);
                self.state.record_failure(uid, &e.to_string());
                None
            }
        }
    }

    /// Bring one account in line with `props`. Returns whether it was
    /// created. Failed ACL rules fail the account once everything else has
    /// been applied.
    async fn provision(&mut self, uid: &str, props: &AccountProps) -> Result<bool> {
        let exists = self.dir.exists(uid).await?;
        let fields = props.basic_profile_fields();
        let mut acl_failures = 0;
        if exists {
            self.dir.update_user(uid, &fields).await?;
            if self.options.refresh_acls {
                acl_failures = self
                    .groups
                    .apply_account_acl(self.dir, uid, props.standing)
                    .await;
            }
        } else {
            let password = make_password(uid, self.options.password_key.as_deref());
            self.dir.create_user(uid, &password, &fields).await?;
            info!("Created user {}", uid);
            acl_failures = self
                .groups
                .apply_account_acl(self.dir, uid, props.standing)
                .await;
        }
        let group = self.groups.home_group(props.standing).clone();
        self.ensure_member(&group, uid).await?;
        self.dir
            .import_profile(uid, &ProfileImport::from_props(props))
            .await?;
        self.dir.set_demographics(uid, &props.demographics).await?;
        if acl_failures > 0 {
            return Err(anyhow!("{} ACL rules failed on {}", acl_failures, home_path(uid)));
        }
        Ok(!exists)
    }

    /// Add `uid` to `group` unless it is already a member.
    async fn ensure_member(&mut self, group: &GroupHandle, uid: &str) -> Result<(), DirectoryError> {
        if !self.members.contains_key(&group.name) {
            let members = match self.dir.group_members(&group.name).await {
                Ok(members) => members.into_iter().collect(),
                Err(e) => {
                    warn!("Could not list members of {}: {}", group.name, e);
                    HashSet::new()
                }
            };
            self.members.insert(group.name.clone(), members);
        }
        if self
            .members
            .get(&group.name)
            .map_or(false, |m| m.contains(uid))
        {
            return Ok(());
        }
        self.groups.add_member(self.dir, group, uid).await?;
        self.members
            .entry(group.name.clone())
            .or_default()
            .insert(uid.to_string());
        Ok(())
    }
}

/// Remove accounts outright. Returns the number deleted.
pub async fn delete_accounts<D: Directory + ?Sized>(dir: &D, ids: &[String]) -> usize {
    let mut deleted = 0;
    for id in ids {
        match dir.delete_user(id).await {
            Ok(()) => {
                info!("Deleted user {}", id);
                deleted += 1;
            }
            Err(e) => error!("Failed deleting user {}: {}", id, e),
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{Call, FakeDirectory, FakeUser};
    use directory_client::UserSearchHit;
    use provision_common::config::Environment;
    use provision_common::constants::DEFAULT_REFRESH_ACLS;
    use provision_common::record::{MajorSlot, SourceRecord};

    struct MemorySource {
        records: Vec<SourceRecord>,
    }

    impl PersonSource for MemorySource {
        fn select_students_from_colleges(
            &self,
            colleges: &[String],
        ) -> Result<Vec<SourceRecord>> {
            Ok(self
                .records
                .iter()
                .filter(|r| r.is_registered_student())
                .filter(|r| {
                    r.majors
                        .iter()
                        .filter_map(|m| m.college())
                        .any(|c| colleges.iter().any(|x| x == c))
                })
                .cloned()
                .collect())
        }

        fn select_person(&self, uid: &str) -> Result<Option<SourceRecord>> {
            Ok(self.records.iter().find(|r| r.ldap_uid == uid).cloned())
        }
    }

    fn student(uid: &str, flag: &str, college: &str, major: &str) -> SourceRecord {
        SourceRecord {
            ldap_uid: uid.to_string(),
            first_name: Some("Test".to_string()),
            last_name: Some(format!("Student{}", uid)),
            email_address: Some(format!("{}@berkeley.edu", uid)),
            affiliations: Some("STUDENT-TYPE-REGISTERED".to_string()),
            ug_grad_flag: Some(flag.to_string()),
            majors: vec![MajorSlot::new(college, major)],
            level_desc: None,
            new_trfr_flag: None,
        }
    }

    fn options() -> ReconcileOptions {
        ReconcileOptions {
            colleges: vec!["ENV DSGN".to_string(), "NAT RES".to_string()],
            remaining_source: RemainingSource::IntegratedUserIds,
            refresh_acls: DEFAULT_REFRESH_ACLS,
            password_key: None,
            advisors_group: "g-ced-advisors".to_string(),
            students_group: "g-ced-students".to_string(),
        }
    }

    async fn run_pass(
        dir: &FakeDirectory,
        source: &MemorySource,
        opts: ReconcileOptions,
        plan: &RunPlan,
    ) -> ReconciliationState {
        let mapper = MapperContext::new(Environment::Development);
        let mut reconciler = Reconciler::new(dir, source, mapper, opts).await;
        reconciler.run(plan).await.unwrap();
        reconciler.into_state()
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let dir = FakeDirectory::new();
        let source = MemorySource {
            records: vec![
                student("300846", "U", "ENV DSGN", "ARCHITECTURE"),
                student("300847", "G", "NAT RES", "FORESTRY"),
            ],
        };

        let first = run_pass(&dir, &source, options(), &RunPlan::default()).await;
        assert_eq!(first.new_users, ids(&["300846", "300847"]));
        assert!(first.dropped_accounts.is_empty());
        assert_eq!(
            dir.user("300846").unwrap().demographics,
            ids(&[
                "/colleges/CED/standings/undergrad",
                "/colleges/CED/standings/undergrad/majors/ARCHITECTURE",
            ])
        );
        assert_eq!(dir.members("g-ced-students"), ids(&["300846", "300847"]));

        dir.clear_calls();
        let second = run_pass(&dir, &source, options(), &RunPlan::default()).await;
        assert!(second.new_users.is_empty());
        assert!(second.renewed_accounts.is_empty());
        assert!(second.dropped_accounts.is_empty());
        assert_eq!(second.synchronized_accounts, ids(&["300846", "300847"]));
        assert!(second.failed_accounts.is_empty());
        assert!(!dir.calls().iter().any(|c| matches!(
            c,
            Call::CreateUser(_) | Call::AddMember { .. } | Call::RemoveMember { .. }
        )));
    }

    #[tokio::test]
    async fn test_failed_acl_fails_account_and_is_repaired() {
        let dir = FakeDirectory::new();
        dir.fail_acl_for("anonymous");
        let source = MemorySource {
            records: vec![student("300846", "U", "ENV DSGN", "ARCHITECTURE")],
        };

        let first = run_pass(&dir, &source, options(), &RunPlan::default()).await;
        assert!(first.new_users.is_empty());
        assert_eq!(first.failed_accounts.len(), 1);
        assert_eq!(first.failed_accounts[0].0, "300846");
        // The rest of the account was still brought in line.
        assert_eq!(dir.members("g-ced-students"), ids(&["300846"]));

        dir.clear_acl_failures();
        dir.clear_calls();
        let second = run_pass(&dir, &source, options(), &RunPlan::default()).await;
        assert!(second.failed_accounts.is_empty());
        assert_eq!(second.synchronized_accounts, ids(&["300846"]));
        let principals: Vec<String> = dir
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Acl { path, rule } if path == "~300846" => Some(rule.principal),
                _ => None,
            })
            .collect();
        assert_eq!(
            principals,
            vec!["everyone", "anonymous", "g-ced-advisors", "300846"]
        );
    }

    #[tokio::test]
    async fn test_fixture_retry_clears_earlier_failure() {
        let dir = FakeDirectory::new();
        dir.fail_acl_for("anonymous");
        let source = MemorySource {
            records: vec![student("300846", "U", "ENV DSGN", "ARCHITECTURE")],
        };
        let fixture = Fixture::from_json(r#"{"users": {"300846": {}}}"#).unwrap();
        let plan = RunPlan {
            fixture: Some(fixture),
            ..Default::default()
        };
        let opts = ReconcileOptions {
            refresh_acls: false,
            ..options()
        };

        let state = run_pass(&dir, &source, opts, &plan).await;
        assert!(state.failed_accounts.is_empty());
        assert_eq!(state.renewed_accounts, ids(&["300846"]));
    }

    #[tokio::test]
    async fn test_new_account_gets_acl_template() {
        let dir = FakeDirectory::new();
        let source = MemorySource {
            records: vec![student("300846", "U", "ENV DSGN", "ARCHITECTURE")],
        };
        run_pass(&dir, &source, options(), &RunPlan::default()).await;
        let rules: Vec<String> = dir
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Acl { path, rule } if path == "~300846" => Some(rule.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(
            rules,
            vec![
                "everyone jcr:all denied",
                "anonymous jcr:all denied",
                "g-ced-advisors jcr:read granted",
                "300846 jcr:all granted",
            ]
        );
        let user = dir.user("300846").unwrap();
        assert_eq!(user.props["standing"], "undergrad");
        assert_eq!(user.props["email"], "test.student300846@berkeley.edu");
        assert_eq!(user.props["department"], "");
    }

    #[tokio::test]
    async fn test_stale_account_is_dropped_not_deleted() {
        let dir = FakeDirectory::new();
        dir.create_group("g-ced-students").await.unwrap();
        let stale = AccountProps {
            email: "gone@berkeley.edu".to_string(),
            college: "College of Environmental Design".to_string(),
            ..Default::default()
        };
        dir.add_user(
            "212999",
            FakeUser {
                profile: Some(ProfileImport::from_props(&stale)),
                demographics: ids(&["/colleges/CED/standings/grad"]),
                ..Default::default()
            },
        );
        dir.group_add_member("g-ced-students", "212999", PrincipalKind::User)
            .await
            .unwrap();
        let source = MemorySource { records: vec![] };

        let state = run_pass(&dir, &source, options(), &RunPlan::default()).await;
        assert_eq!(state.dropped_accounts, ids(&["212999"]));
        let user = dir.user("212999").unwrap();
        assert!(user.demographics.is_empty());
        let sections: Vec<String> = user.profile.unwrap().sections.into_keys().collect();
        assert_eq!(sections, ids(&["basic"]));
        assert!(dir.members("g-ced-students").is_empty());
        assert!(!dir
            .calls()
            .iter()
            .any(|c| matches!(c, Call::DeleteUser(_))));
    }

    #[tokio::test]
    async fn test_participants_are_refreshed_not_dropped() {
        let dir = FakeDirectory::new();
        for uid in ["300850", "300851"] {
            dir.add_user(
                uid,
                FakeUser {
                    participant: true,
                    ..Default::default()
                },
            );
        }
        let source = MemorySource {
            records: vec![student("300850", "U", "L&S", "HISTORY")],
        };

        let state = run_pass(&dir, &source, options(), &RunPlan::default()).await;
        assert!(state.dropped_accounts.is_empty());
        assert_eq!(state.synchronized_accounts, ids(&["300850"]));
        assert!(state.remaining().is_empty());
        assert_eq!(
            dir.user("300850").unwrap().demographics,
            ids(&[
                "/colleges/LANDS/standings/undergrad",
                "/colleges/LANDS/standings/undergrad/majors/HISTORY",
            ])
        );
    }

    #[tokio::test]
    async fn test_account_failure_does_not_stop_pass() {
        let dir = FakeDirectory::new();
        dir.fail_user("300846");
        let source = MemorySource {
            records: vec![
                student("300846", "U", "ENV DSGN", "ARCHITECTURE"),
                student("300847", "G", "NAT RES", "FORESTRY"),
            ],
        };

        let state = run_pass(&dir, &source, options(), &RunPlan::default()).await;
        assert_eq!(state.failed_accounts.len(), 1);
        assert_eq!(state.failed_accounts[0].0, "300846");
        assert_eq!(state.new_users, ids(&["300847"]));
    }

    #[tokio::test]
    async fn test_existing_account_without_campus_data_is_renewed() {
        let dir = FakeDirectory::new();
        dir.add_user("300846", FakeUser::default());
        let source = MemorySource {
            records: vec![
                student("300846", "U", "ENV DSGN", "ARCHITECTURE"),
                student("300846", "U", "ENV DSGN", "ARCHITECTURE"),
            ],
        };

        let state = run_pass(&dir, &source, options(), &RunPlan::default()).await;
        assert_eq!(state.renewed_accounts, ids(&["300846"]));
        assert!(state.new_users.is_empty());
        let updates = dir
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::UpdateUser(_)))
            .count();
        assert_eq!(updates, 1);
    }

    #[tokio::test]
    async fn test_listed_accounts_skip_non_current() {
        let dir = FakeDirectory::new();
        let mut former = student("300900", "U", "L&S", "HISTORY");
        former.affiliations = Some("STUDENT-STATUS-EXPIRED".to_string());
        let source = MemorySource {
            records: vec![former, student("300901", "G", "L&S", "HISTORY")],
        };
        let plan = RunPlan {
            listed_ids: Some(ids(&["300900", "300901", "404404"])),
            ..Default::default()
        };

        let state = run_pass(&dir, &source, options(), &plan).await;
        assert_eq!(state.new_users, ids(&["300901"]));
        assert!(dir.user("300900").is_none());
        assert!(state.failed_accounts.is_empty());
    }

    #[tokio::test]
    async fn test_fixture_overrides_demographics_and_groups() {
        let dir = FakeDirectory::new();
        let source = MemorySource {
            records: vec![student("300846", "U", "ENV DSGN", "ARCHITECTURE")],
        };
        let fixture = Fixture::from_json(
            r#"{"users": {
                "300846": {
                    "groups": ["g-ced-advisors"],
                    "demographics": ["/colleges/CED/standings/grad", "/colleges/CED/standings/grad"]
                },
                "999999": {}
            }}"#,
        )
        .unwrap();
        let plan = RunPlan {
            fixture: Some(fixture),
            ..Default::default()
        };

        let state = run_pass(&dir, &source, options(), &plan).await;
        assert_eq!(state.new_users, ids(&["300846"]));
        assert_eq!(
            dir.user("300846").unwrap().demographics,
            ids(&["/colleges/CED/standings/grad"])
        );
        assert_eq!(dir.members("g-ced-advisors"), ids(&["300846"]));
        assert!(dir.user("999999").is_none());
    }

    #[tokio::test]
    async fn test_advisors_join_advisors_group() {
        let dir = FakeDirectory::new();
        let source = MemorySource { records: vec![] };
        let advisors = AdvisorsFixture::from_json(
            r#"{"users": {"212372": {"firstName": "Ada", "lastName": "Lovelace", "email": "ada@berkeley.edu"}}}"#,
        )
        .unwrap();
        let plan = RunPlan {
            advisors: Some(advisors),
            ..Default::default()
        };

        let state = run_pass(&dir, &source, options(), &plan).await;
        assert_eq!(state.new_users, ids(&["212372"]));
        assert_eq!(dir.members("g-ced-advisors"), ids(&["212372"]));
        assert!(dir.members("g-ced-students").is_empty());
        let user = dir.user("212372").unwrap();
        assert_eq!(user.props["standing"], "advisor");
        assert_eq!(user.props["major"], "N/A");
        let acl_count = dir
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Acl { .. }))
            .count();
        assert_eq!(acl_count, 6);
    }

    #[tokio::test]
    async fn test_students_group_as_remaining_source() {
        let dir = FakeDirectory::new();
        dir.create_group("g-ced-students").await.unwrap();
        dir.add_user("300900", FakeUser::default());
        dir.group_add_member("g-ced-students", "300900", PrincipalKind::User)
            .await
            .unwrap();
        dir.group_add_member("g-ced-students", "g-nested", PrincipalKind::Group)
            .await
            .unwrap();
        let source = MemorySource { records: vec![] };
        let opts = ReconcileOptions {
            remaining_source: RemainingSource::StudentsGroup,
            ..options()
        };

        let state = run_pass(&dir, &source, opts, &RunPlan::default()).await;
        assert_eq!(state.dropped_accounts, ids(&["300900"]));
        assert_eq!(dir.members("g-ced-students"), ids(&["g-nested"]));
    }

    #[tokio::test]
    async fn test_refresh_advisors() {
        let dir = FakeDirectory::new();
        dir.add_user("212372", FakeUser::default());
        dir.set_search(vec![
            UserSearchHit {
                user_id: "212372".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@berkeley.edu".to_string(),
            },
            UserSearchHit {
                user_id: "404404".to_string(),
                first_name: "No".to_string(),
                last_name: "Body".to_string(),
                email: String::new(),
            },
        ]);
        let source = MemorySource { records: vec![] };
        let mapper = MapperContext::new(Environment::Development);
        let mut reconciler = Reconciler::new(&dir, &source, mapper, options()).await;

        assert_eq!(reconciler.refresh_advisors().await.unwrap(), 1);
        assert_eq!(reconciler.state().failed_accounts.len(), 1);
        assert_eq!(dir.user("212372").unwrap().props["college"], "College of Environmental Design");
    }

    #[tokio::test]
    async fn test_delete_accounts() {
        let dir = FakeDirectory::new();
        dir.add_user("300846", FakeUser::default());
        assert_eq!(delete_accounts(&dir, &ids(&["300846", "300847"])).await, 1);
        assert!(dir.user("300846").is_none());
    }
}
