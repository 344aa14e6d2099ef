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
use std::collections::HashSet;

/// How a provisioned account relates to what was already on the server.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Already integrated and refreshed this pass.
    Synchronized,
    /// A new account was created.
    Created,
    /// The account existed but carried no campus data.
    Renewed,
}

/// Bookkeeping for a single reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconciliationState {
    remaining: Vec<String>,
    participants: HashSet<String>,
    processed: HashSet<String>,
    pub new_users: Vec<String>,
    pub renewed_accounts: Vec<String>,
    pub dropped_accounts: Vec<String>,
    pub synchronized_accounts: Vec<String>,
    pub failed_accounts: Vec<(String, String)>,
}

impl ReconciliationState {
    pub fn new() -> Self {
        ReconciliationState::default()
    }

    /// Seed the previously provisioned accounts. Order is kept and
    /// duplicates are dropped.
    pub fn set_remaining<I: IntoIterator<Item = String>>(&mut self, ids: I) {
        let mut seen = HashSet::new();
        self.remaining = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
    }

    pub fn set_participants<I: IntoIterator<Item = String>>(&mut self, ids: I) {
        self.participants = ids.into_iter().collect();
    }

    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_participant(&self, id: &str) -> bool {
        self.participants.contains(id)
    }

    fn take_remaining(&mut self, id: &str) -> bool {
        let before = self.remaining.len();
        self.remaining.retain(|r| r != id);
        before != self.remaining.len()
    }

    /// Claim `id` for this pass. Returns false if it was already handled.
    pub fn begin(&mut self, id: &str) -> bool {
        self.processed.insert(id.to_string())
    }

    /// Record a successful provision and classify it.
    pub fn record(&mut self, id: &str, created: bool) -> Outcome {
        let outcome = if self.take_remaining(id) {
            self.synchronized_accounts.push(id.to_string());
            Outcome::Synchronized
        } else if created {
            self.new_users.push(id.to_string());
            Outcome::Created
        } else {
            self.renewed_accounts.push(id.to_string());
            Outcome::Renewed
        };
        debug!("{} {:?}", id, outcome);
        outcome
    }

    /// A failed account is not dropped later in the same pass.
    pub fn record_failure(&mut self, id: &str, reason: &str) {
        self.take_remaining(id);
        self.failed_accounts
            .push((id.to_string(), reason.to_string()));
    }

    /// Forget an earlier failure of `id` in this pass. Returns whether
    /// there was one.
    pub fn clear_failure(&mut self, id: &str) -> bool {
        let before = self.failed_accounts.len();
        self.failed_accounts.retain(|(failed, _)| failed != id);
        before != self.failed_accounts.len()
    }

    /// A refreshed participant leaves the drop list without being counted
    /// as synchronized.
    pub fn retain_participant(&mut self, id: &str) {
        self.take_remaining(id);
    }

    pub fn record_dropped(&mut self, id: &str) {
        self.take_remaining(id);
        self.dropped_accounts.push(id.to_string());
    }
}
