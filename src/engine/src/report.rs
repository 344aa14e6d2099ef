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
use chrono::NaiveDate;
use directory_client::{Directory, Message};
use provision_common::mapper::MapperContext;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::time::Duration;

use crate::state::ReconciliationState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentCount {
    pub college: String,
    /// `None` when the dynamic list could not be queried.
    pub count: Option<u64>,
}

impl StudentCount {
    fn display_count(&self) -> String {
        match self.count {
            Some(n) => n.to_string(),
            None => "Unknown".to_string(),
        }
    }
}

/// What a reconciliation pass did, for the log and the team message.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub synchronized: Vec<String>,
    pub new_users: Vec<String>,
    pub renewed: Vec<String>,
    pub dropped: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub participants: usize,
    pub student_counts: Vec<StudentCount>,
}

pub fn count_criteria(college: &str) -> String {
    format!(
        "{{ANY:['/colleges/{c}/standings/grad','/colleges/{c}/standings/undergrad']}}",
        c = college
    )
}

pub fn subject_line(date: NaiveDate) -> String {
    format!("{} Oracle account updates", date.format("%Y-%m-%d"))
}

impl RunSummary {
    pub fn from_state(state: &ReconciliationState) -> Self {
        RunSummary {
            synchronized: state.synchronized_accounts.clone(),
            new_users: state.new_users.clone(),
            renewed: state.renewed_accounts.clone(),
            dropped: state.dropped_accounts.clone(),
            failed: state.failed_accounts.clone(),
            participants: state.participant_count(),
            student_counts: vec![],
        }
    }

    /// Count students per college through the dynamic lists. The lists are
    /// served from the search index, so give it `index_wait` to catch up.
    pub async fn collect_student_counts<D: Directory + ?Sized>(
        &mut self,
        dir: &D,
        dynamic_lists: &BTreeMap<String, String>,
        mapper: &MapperContext,
        index_wait: Duration,
    ) {
        if dynamic_lists.is_empty() {
            return;
        }
        if !index_wait.is_zero() {
            debug!("Waiting {:?} for indexing", index_wait);
            tokio::time::sleep(index_wait).await;
        }
        for (college, context) in dynamic_lists {
            let college_id = mapper.demographic_college(college);
            let count = match dir
                .demographic_count(context, &count_criteria(&college_id))
                .await
            {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!("Not able to check number of {} students: {}", college_id, e);
                    None
                }
            };
            self.student_counts.push(StudentCount {
                college: college_id,
                count,
            });
        }
    }

    pub fn log(&self) {
        info!(
            "Synchronized {} existing accounts",
            self.synchronized.len()
        );
        info!("Added {} new users: {:?}", self.new_users.len(), self.new_users);
        info!(
            "Renewed {} synchronizations: {:?}",
            self.renewed.len(),
            self.renewed
        );
        info!(
            "Dropped {} synchronizations: {:?}",
            self.dropped.len(),
            self.dropped
        );
        if !self.failed.is_empty() {
            warn!("Failed {} accounts: {:?}", self.failed.len(), self.failed);
        }
        info!("Currently {} participants", self.participants);
        for sc in &self.student_counts {
            info!("{} {} Students", sc.display_count(), sc.college);
        }
    }

    pub fn message_body(&self) -> String {
        let mut body = String::new();
        let _ = writeln!(
            body,
            "* Synchronized {} existing accounts",
            self.synchronized.len()
        );
        let _ = writeln!(body, "* Added {} new users", self.new_users.len());
        let _ = writeln!(body, "* Renewed {} synchronizations", self.renewed.len());
        let _ = writeln!(body, "* Dropped {} synchronizations", self.dropped.len());
        if !self.failed.is_empty() {
            let _ = writeln!(body, "* Failed {} accounts", self.failed.len());
        }
        for sc in &self.student_counts {
            let _ = writeln!(body, "* {} {} Students", sc.display_count(), sc.college);
        }
        let _ = writeln!(body, "* {} participants", self.participants);
        body
    }

    /// Post the summary to `report_group` if that group has a home. Returns
    /// whether a message was sent.
    pub async fn publish<D: Directory + ?Sized>(
        &self,
        dir: &D,
        from: &str,
        report_group: &str,
        date: NaiveDate,
    ) -> bool {
        match dir.home_exists(report_group).await {
            Ok(true) => {}
            Ok(false) => {
                info!("No report group {}, not sending summary", report_group);
                return false;
            }
            Err(e) => {
                warn!("Not able to check report group {}: {}", report_group, e);
                return false;
            }
        }
        let message = Message {
            from: from.to_string(),
            to_group: report_group.to_string(),
            subject: subject_line(date),
            body: self.message_body(),
        };
        match dir.send_message(&message).await {
            Ok(()) => {
                info!("Sent summary to {}", report_group);
                true
            }
            Err(e) => {
                warn!("Not able to send status update: {}", e);
                false
            }
        }
    }
}
