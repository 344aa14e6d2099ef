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
#![warn(unused_extern_crates)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unreachable)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]

#[macro_use]
extern crate tracing;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use directory_client::{Credentials, Directory, SlingDirectory};
use provision_common::config::ProvisionConfig;
use provision_common::fixture::{read_user_ids, AdvisorsFixture, Fixture};
use provision_common::mapper::MapperContext;
use provision_common::source::{DbPersonSource, EmptySource};
use provision_engine::{delete_accounts, ReconcileOptions, Reconciler, RunPlan, RunSummary};
use tracing_subscriber::EnvFilter;

include!("./opt/tool.rs");

/// `RUST_LOG` when set and valid, info otherwise.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn load_config(server: &ServerOpt) -> Result<ProvisionConfig, String> {
    let mut cfg = ProvisionConfig::new(server.config.as_deref())?;
    if let Some(url) = &server.appserver {
        cfg.set("server", "url", url);
    }
    if let Some(pwd) = &server.adminpwd {
        cfg.set("server", "admin_password", pwd);
    }
    if let Some(env) = &server.runenv {
        cfg.set("global", "environment", env);
    }
    Ok(cfg)
}

async fn connect(cfg: &ProvisionConfig) -> Option<SlingDirectory> {
    let timeout = cfg.get_connection_timeout();
    let creds = Credentials {
        user: cfg.get_admin_user(),
        password: cfg.get_admin_password(),
        mode: cfg.get_auth_mode(),
    };
    let server_url = cfg.get_server_url();
    let dir = match SlingDirectory::new(
        &server_url,
        creds,
        (timeout > 0).then(|| Duration::from_secs(timeout)),
    ) {
        Ok(dir) => dir,
        Err(e) => {
            error!("Invalid application server {}: {}", server_url, e);
            return None;
        }
    };
    if let Err(e) = dir.login().await {
        error!("Failed to log in to {} as {}: {}", server_url, cfg.get_admin_user(), e);
        return None;
    }
    Some(dir)
}

fn build_plan(
    fileids: Option<&str>,
    fixture: Option<&str>,
    advisors: Option<&str>,
) -> anyhow::Result<RunPlan> {
    let mut plan = RunPlan::default();
    if let Some(path) = advisors {
        plan.advisors = Some(AdvisorsFixture::from_file(path)?);
    }
    if let Some(path) = fileids {
        plan.listed_ids = Some(read_user_ids(path)?);
    }
    if let Some(path) = fixture {
        plan.fixture = Some(Fixture::from_file(path)?);
    }
    Ok(plan)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let opt = ProvisionParser::parse();

    let server = match &opt.commands {
        ProvisionOpt::Reconcile { server, .. }
        | ProvisionOpt::LoadAdvisors { server, .. }
        | ProvisionOpt::RefreshAdvisors { server }
        | ProvisionOpt::DeleteUsers { server, .. } => Some(server),
        ProvisionOpt::Version { .. } => None,
    };
    let debug = match &opt.commands {
        ProvisionOpt::Version { debug } => *debug,
        _ => server.map(|s| s.debug).unwrap_or(false),
    };
    let cfg = server.map(load_config);

    let cfg_debug = matches!(&cfg, Some(Ok(cfg)) if cfg.get_debug());
    if debug || cfg_debug {
        std::env::set_var("RUST_LOG", "debug");
    }
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();

    let mut cfg = match cfg {
        Some(Ok(cfg)) => cfg,
        Some(Err(e)) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
        None => {
            println!("myb-provision {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
    };

    match opt.commands {
        ProvisionOpt::Reconcile {
            server: _,
            db,
            userpwdkey,
            fileids,
            fixture,
            advisors,
            no_report,
        } => {
            if let Some(db) = &db {
                cfg.set("database", "path", db);
            }
            if let Some(key) = &userpwdkey {
                cfg.set("global", "user_password_key", key);
            }
            let plan = match build_plan(fileids.as_deref(), fixture.as_deref(), advisors.as_deref())
            {
                Ok(plan) => plan,
                Err(e) => {
                    error!("{:?}", e);
                    return ExitCode::FAILURE;
                }
            };
            let source = match DbPersonSource::open(&cfg.get_db_path()) {
                Ok(source) => source,
                Err(e) => {
                    error!("{:?}", e);
                    return ExitCode::FAILURE;
                }
            };
            let dir = match connect(&cfg).await {
                Some(dir) => dir,
                None => return ExitCode::FAILURE,
            };

            let mapper = MapperContext::from_config(&cfg);
            let mut reconciler = Reconciler::new(
                &dir,
                &source,
                mapper.clone(),
                ReconcileOptions::from_config(&cfg),
            )
            .await;
            if let Err(e) = reconciler.run(&plan).await {
                error!("Reconciliation aborted: {:?}", e);
                return ExitCode::FAILURE;
            }
            let state = reconciler.into_state();

            let mut summary = RunSummary::from_state(&state);
            if !no_report {
                summary
                    .collect_student_counts(
                        &dir,
                        &cfg.get_dynamic_lists(),
                        &mapper,
                        Duration::from_secs(cfg.get_index_wait()),
                    )
                    .await;
            }
            summary.log();
            if !no_report {
                summary
                    .publish(
                        &dir,
                        &cfg.get_admin_user(),
                        &cfg.get_report_group(),
                        chrono::Local::now().date_naive(),
                    )
                    .await;
            }
            ExitCode::SUCCESS
        }
        ProvisionOpt::LoadAdvisors {
            server: _,
            userpwdkey,
            advisors,
        } => {
            if let Some(key) = &userpwdkey {
                cfg.set("global", "user_password_key", key);
            }
            let advisors = match AdvisorsFixture::from_file(&advisors) {
                Ok(advisors) => advisors,
                Err(e) => {
                    error!("{:?}", e);
                    return ExitCode::FAILURE;
                }
            };
            let dir = match connect(&cfg).await {
                Some(dir) => dir,
                None => return ExitCode::FAILURE,
            };
            let mut reconciler = Reconciler::new(
                &dir,
                &EmptySource,
                MapperContext::from_config(&cfg),
                ReconcileOptions::from_config(&cfg),
            )
            .await;
            reconciler.load_advisors(&advisors).await;
            let state = reconciler.into_state();
            info!(
                "Loaded advisors: {} new, {} updated, {} failed",
                state.new_users.len(),
                state.synchronized_accounts.len(),
                state.failed_accounts.len()
            );
            if state.failed_accounts.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        ProvisionOpt::RefreshAdvisors { server: _ } => {
            let dir = match connect(&cfg).await {
                Some(dir) => dir,
                None => return ExitCode::FAILURE,
            };
            let mut reconciler = Reconciler::new(
                &dir,
                &EmptySource,
                MapperContext::from_config(&cfg),
                ReconcileOptions::from_config(&cfg),
            )
            .await;
            match reconciler.refresh_advisors().await {
                Ok(n) => {
                    info!("Refreshed {} advisors", n);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("Failed listing advisors: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        ProvisionOpt::DeleteUsers {
            server: _,
            really,
            fileids,
            mut ids,
        } => {
            if let Some(path) = &fileids {
                match read_user_ids(path) {
                    Ok(listed) => ids.extend(listed),
                    Err(e) => {
                        error!("{:?}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            ids.sort();
            ids.dedup();
            if ids.is_empty() {
                error!("No user ids given");
                return ExitCode::FAILURE;
            }
            if !really {
                println!("Would delete {} users: {}", ids.len(), ids.join(", "));
                println!("Pass --really to delete them.");
                return ExitCode::SUCCESS;
            }
            let dir = match connect(&cfg).await {
                Some(dir) => dir,
                None => return ExitCode::FAILURE,
            };
            let deleted = delete_accounts(&dir, &ids).await;
            info!("Deleted {} of {} users", deleted, ids.len());
            if deleted == ids.len() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        // Printed before the configuration is loaded.
        ProvisionOpt::Version { .. } => ExitCode::SUCCESS,
    }
}
