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
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct ServerOpt {
    #[clap(short, long)]
    debug: bool,
    /// Configuration file. Defaults to /etc/myberkeley/provision.conf
    #[clap(long)]
    config: Option<String>,
    /// Application server url, with trailing slash
    #[clap(short, long)]
    appserver: Option<String>,
    /// Application admin user password
    #[clap(short = 'q', long)]
    adminpwd: Option<String>,
    /// Runtime environment (dev or prod)
    #[clap(short = 'e', long)]
    runenv: Option<String>,
}

#[derive(Debug, Subcommand)]
#[clap(about = "MyBerkeley Campus Account Provisioning")]
pub enum ProvisionOpt {
    /// Synchronize accounts with the campus data: provision every registered
    /// student of the configured colleges, then drop the campus data of
    /// accounts which no longer qualify.
    Reconcile {
        #[clap(flatten)]
        server: ServerOpt,
        /// Campus database extract
        #[clap(long)]
        db: Option<String>,
        /// Key used to derive initial account passwords
        #[clap(short = 'k', long)]
        userpwdkey: Option<String>,
        /// File of additional user ids, one per line
        #[clap(short = 'f', long)]
        fileids: Option<String>,
        /// JSON fixture of extra accounts with groups and demographics
        #[clap(long)]
        fixture: Option<String>,
        /// JSON file of curated advisor accounts to load first
        #[clap(long)]
        advisors: Option<String>,
        /// Do not count students or message the report group
        #[clap(long = "no-report")]
        no_report: bool,
    },
    /// Load curated advisor accounts into the advisors group.
    LoadAdvisors {
        #[clap(flatten)]
        server: ServerOpt,
        #[clap(short = 'k', long)]
        userpwdkey: Option<String>,
        /// JSON file of advisor accounts
        advisors: String,
    },
    /// Rewrite the profiles of every member of the advisors group.
    RefreshAdvisors {
        #[clap(flatten)]
        server: ServerOpt,
    },
    /// Delete accounts outright. Reconcile never deletes accounts.
    DeleteUsers {
        #[clap(flatten)]
        server: ServerOpt,
        #[clap(long)]
        really: bool,
        /// File of user ids, one per line
        #[clap(short = 'f', long)]
        fileids: Option<String>,
        ids: Vec<String>,
    },
    /// Show the version of this tool.
    Version {
        #[clap(short, long)]
        debug: bool,
    },
}

#[derive(Debug, clap::Parser)]
#[clap(about = "MyBerkeley Campus Account Provisioning")]
pub struct ProvisionParser {
    #[clap(subcommand)]
    pub commands: ProvisionOpt,
}
