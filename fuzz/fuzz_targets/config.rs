//! Fuzz the provisioning config reader.
//!
//! Writes arbitrary bytes, then a structured file touching every option,
//! and reads every getter back. Nothing here may panic.

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

use provision_common::config::ProvisionConfig;
use provision_common::mapper::MapperContext;

#[derive(Debug, Arbitrary)]
struct FInput {
    raw_cfg: Vec<u8>,
    use_structured: bool,

    url: Stringish,
    auth_mode: Stringish,
    connection_timeout: Stringish,
    environment: Stringish,
    debug: Stringish,
    colleges: Vec<Stringish>,
    remaining_source: Stringish,
    index_wait: Stringish,
    college_profile: Vec<(Stringish, Stringish)>,
    dynamic_lists: Vec<(Stringish, Stringish)>,
}

#[derive(Debug, Arbitrary, Clone)]
struct Stringish(Vec<u8>);

impl fmt::Display for Stringish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Newlines would start new keys
        let s = String::from_utf8_lossy(&self.0).replace(['\n', '\r'], " ");
        write!(f, "{}", s)
    }
}

fn write_structured_ini(path: &Path, fi: &FInput) -> std::io::Result<()> {
    let mut f = File::create(path)?;

    writeln!(f, "[server]")?;
    writeln!(f, "url = {}", fi.url)?;
    writeln!(f, "auth_mode = {}", fi.auth_mode)?;
    writeln!(f, "connection_timeout = {}", fi.connection_timeout)?;

    writeln!(f, "\n[global]")?;
    writeln!(f, "environment = {}", fi.environment)?;
    writeln!(f, "debug = {}", fi.debug)?;

    writeln!(f, "\n[reconcile]")?;
    let colleges = fi
        .colleges
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",");
    writeln!(f, "colleges = {}", colleges)?;
    writeln!(f, "remaining_source = {}", fi.remaining_source)?;

    writeln!(f, "\n[report]")?;
    writeln!(f, "index_wait = {}", fi.index_wait)?;

    writeln!(f, "\n[college_profile]")?;
    for (k, v) in &fi.college_profile {
        writeln!(f, "{} = {}", k, v)?;
    }
    writeln!(f, "\n[dynamic_lists]")?;
    for (k, v) in &fi.dynamic_lists {
        writeln!(f, "{} = {}", k, v)?;
    }
    Ok(())
}

fn exercise_config(cfg: &ProvisionConfig) {
    let _ = cfg.get_server_url();
    let _ = cfg.get_admin_user();
    let _ = cfg.get_admin_password();
    let _ = cfg.get_auth_mode();
    let _ = cfg.get_connection_timeout();
    let _ = cfg.get_environment();
    let _ = cfg.get_debug();
    let _ = cfg.get_db_path();
    let _ = cfg.get_user_password_key();
    let _ = cfg.get_email_domain();
    let _ = cfg.get_colleges();
    let _ = cfg.get_advisors_group();
    let _ = cfg.get_students_group();
    let _ = cfg.get_report_group();
    let _ = cfg.get_advisor_college();
    let _ = cfg.get_remaining_source();
    let _ = cfg.get_refresh_acls();
    let _ = cfg.get_index_wait();
    let _ = cfg.get_college_profile_map();
    let _ = cfg.get_college_demographic_map();

    let ctx = MapperContext::from_config(cfg);
    for college in cfg.get_dynamic_lists().keys() {
        let _ = ctx.demographic_college(college);
    }
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let fi = match FInput::arbitrary(&mut u) {
        Ok(fi) => fi,
        Err(_) => return,
    };

    let tmp = match TempDir::new() {
        Ok(t) => t,
        Err(_) => return,
    };
    let cfg_path = tmp.path().join("provision.conf");

    if !fi.raw_cfg.is_empty() {
        let _ = fs::write(&cfg_path, String::from_utf8_lossy(&fi.raw_cfg).as_bytes());
        if let Ok(cfg) = ProvisionConfig::new(Some(cfg_path.to_string_lossy().as_ref())) {
            exercise_config(&cfg);
        }
    }

    if fi.use_structured {
        let _ = write_structured_ini(&cfg_path, &fi);
        if let Ok(cfg) = ProvisionConfig::new(Some(cfg_path.to_string_lossy().as_ref())) {
            exercise_config(&cfg);
        }
    }
});
