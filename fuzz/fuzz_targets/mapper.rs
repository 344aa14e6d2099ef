//! Fuzz the campus record mapping and the user id list reader.

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;

use provision_common::config::Environment;
use provision_common::fixture::{parse_user_ids, Fixture};
use provision_common::mapper::{dedup_paths, map_record, MapperContext};
use provision_common::record::{MajorSlot, SourceRecord};

#[derive(Debug, Arbitrary)]
struct FSlot {
    college_abbr: Option<String>,
    major_name: Option<String>,
    major_title: Option<String>,
}

#[derive(Debug, Arbitrary)]
struct FInput {
    prod: bool,
    ldap_uid: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email_address: Option<String>,
    affiliations: Option<String>,
    ug_grad_flag: Option<String>,
    majors: Vec<FSlot>,
    level_desc: Option<String>,
    new_trfr_flag: Option<String>,
    id_list: String,
    fixture: String,
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let fi = match FInput::arbitrary(&mut u) {
        Ok(fi) => fi,
        Err(_) => return,
    };

    let rec = SourceRecord {
        ldap_uid: fi.ldap_uid,
        first_name: fi.first_name,
        last_name: fi.last_name,
        email_address: fi.email_address,
        affiliations: fi.affiliations,
        ug_grad_flag: fi.ug_grad_flag,
        majors: fi
            .majors
            .into_iter()
            .map(|m| MajorSlot {
                college_abbr: m.college_abbr,
                major_name: m.major_name,
                major_title: m.major_title,
            })
            .collect(),
        level_desc: fi.level_desc,
        new_trfr_flag: fi.new_trfr_flag,
    };
    let env = if fi.prod {
        Environment::Production
    } else {
        Environment::Development
    };
    let ctx = MapperContext::new(env);
    let props = map_record(&rec, &ctx);
    let deduped = dedup_paths(props.demographics.clone());
    assert!(deduped.len() <= props.demographics.len());

    for id in parse_user_ids(&fi.id_list) {
        assert!(!id.is_empty() && id.chars().all(|c| c.is_ascii_digit()));
    }
    let _ = Fixture::from_json(&fi.fixture);
});
