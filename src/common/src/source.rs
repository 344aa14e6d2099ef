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
use anyhow::{anyhow, Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use std::path::Path;

use crate::constants::{AFFILIATION_REGISTERED_STUDENT, MAJOR_SLOTS};
use crate::record::{MajorSlot, SourceRecord};

const SELECT_PERSON_COLUMNS: &str = "select pi.LDAP_UID, pi.FIRST_NAME, pi.LAST_NAME, \
     pi.EMAIL_ADDRESS, pi.AFFILIATIONS, pi.UG_GRAD_FLAG, \
     sm.COLLEGE_ABBR, sm.MAJOR_NAME, sm.MAJOR_TITLE, \
     sm.COLLEGE_ABBR2, sm.MAJOR_NAME2, sm.MAJOR_TITLE2, \
     sm.COLLEGE_ABBR3, sm.MAJOR_NAME3, sm.MAJOR_TITLE3, \
     sm.COLLEGE_ABBR4, sm.MAJOR_NAME4, sm.MAJOR_TITLE4, \
     sp.LEVEL_DESC_S, st.NEW_TRFR_FLAG \
     from BSPACE_PERSON_INFO_VW pi \
     left join BSPACE_STUDENT_MAJOR_VW sm on pi.LDAP_UID = sm.LDAP_UID \
     left join BSPACE_STUDENT_PORTAL_VW sp on pi.LDAP_UID = sp.LDAP_UID \
     left join BSPACE_STUDENT_TERM_VW st on pi.LDAP_UID = st.LDAP_UID";

/// Schema of the campus views, for building local extracts.
pub const CAMPUS_VIEWS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS BSPACE_PERSON_INFO_VW (
        LDAP_UID TEXT PRIMARY KEY,
        FIRST_NAME TEXT,
        LAST_NAME TEXT,
        EMAIL_ADDRESS TEXT,
        AFFILIATIONS TEXT,
        UG_GRAD_FLAG TEXT
    );
    CREATE TABLE IF NOT EXISTS BSPACE_STUDENT_MAJOR_VW (
        LDAP_UID TEXT PRIMARY KEY,
        COLLEGE_ABBR TEXT, MAJOR_NAME TEXT, MAJOR_TITLE TEXT,
        COLLEGE_ABBR2 TEXT, MAJOR_NAME2 TEXT, MAJOR_TITLE2 TEXT,
        COLLEGE_ABBR3 TEXT, MAJOR_NAME3 TEXT, MAJOR_TITLE3 TEXT,
        COLLEGE_ABBR4 TEXT, MAJOR_NAME4 TEXT, MAJOR_TITLE4 TEXT
    );
    CREATE TABLE IF NOT EXISTS BSPACE_STUDENT_PORTAL_VW (
        LDAP_UID TEXT PRIMARY KEY,
        LEVEL_DESC_S TEXT
    );
    CREATE TABLE IF NOT EXISTS BSPACE_STUDENT_TERM_VW (
        LDAP_UID TEXT PRIMARY KEY,
        NEW_TRFR_FLAG TEXT
    );";

/// Authoritative person data.
pub trait PersonSource {
    /// Registered students with any major slot in one of `colleges`.
    fn select_students_from_colleges(&self, colleges: &[String]) -> Result<Vec<SourceRecord>>;

    fn select_person(&self, uid: &str) -> Result<Option<SourceRecord>>;
}

pub struct DbPersonSource {
    conn: Connection,
}

impl DbPersonSource {
    /// Opens an existing extract read only.
    pub fn open(db_path: &str) -> Result<Self> {
        if !Path::new(db_path).exists() {
            return Err(anyhow!("Campus database {} does not exist", db_path));
        }
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed opening campus database {}", db_path))?;
        debug!("Opened campus database {}", db_path);
        Ok(DbPersonSource { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        DbPersonSource { conn }
    }
}

// The views are not consistent about column types, so every value is read
// as optional text.
fn text(row: &Row, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => None,
    })
}

fn record_from_row(row: &Row) -> rusqlite::Result<SourceRecord> {
    let mut majors = Vec::with_capacity(MAJOR_SLOTS);
    for slot in 0..MAJOR_SLOTS {
        let base = 6 + slot * 3;
        majors.push(MajorSlot {
            college_abbr: text(row, base)?,
            major_name: text(row, base + 1)?,
            major_title: text(row, base + 2)?,
        });
    }
    Ok(SourceRecord {
        ldap_uid: text(row, 0)?.unwrap_or_default(),
        first_name: text(row, 1)?,
        last_name: text(row, 2)?,
        email_address: text(row, 3)?,
        affiliations: text(row, 4)?,
        ug_grad_flag: text(row, 5)?,
        majors,
        level_desc: text(row, 18)?,
        new_trfr_flag: text(row, 19)?,
    })
}

impl PersonSource for DbPersonSource {
    fn select_students_from_colleges(&self, colleges: &[String]) -> Result<Vec<SourceRecord>> {
        if colleges.is_empty() {
            return Ok(vec![]);
        }
        let placeholders = (1..=colleges.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<String>>()
            .join(", ");
        let sql = format!(
            "{} where (sm.COLLEGE_ABBR in ({p}) or sm.COLLEGE_ABBR2 in ({p}) \
             or sm.COLLEGE_ABBR3 in ({p}) or sm.COLLEGE_ABBR4 in ({p})) \
             and pi.AFFILIATIONS like '%{}%' order by pi.LDAP_UID",
            SELECT_PERSON_COLUMNS,
            AFFILIATION_REGISTERED_STUDENT,
            p = placeholders
        );
        let mut stmt = self.conn.prepare(&sql).context("Invalid student query")?;
        let rows = stmt
            .query_map(params_from_iter(colleges.iter()), record_from_row)
            .context("Failed selecting students")?;
        let mut students = vec![];
        for row in rows {
            students.push(row.context("Failed reading student row")?);
        }
        debug!(
            "Selected {} students from colleges {:?}",
            students.len(),
            colleges
        );
        Ok(students)
    }

    fn select_person(&self, uid: &str) -> Result<Option<SourceRecord>> {
        let sql = format!("{} where pi.LDAP_UID = ?1", SELECT_PERSON_COLUMNS);
        let mut stmt = self.conn.prepare(&sql).context("Invalid person query")?;
        let mut rows = stmt.query([uid]).context("Failed selecting person")?;
        match rows.next().context("Failed reading person row")? {
            Some(row) => Ok(Some(record_from_row(row)?)),
            None => Ok(None),
        }
    }
}

/// A source without records, for runs that only touch curated accounts.
pub struct EmptySource;

impl PersonSource for EmptySource {
    fn select_students_from_colleges(&self, _colleges: &[String]) -> Result<Vec<SourceRecord>> {
        Ok(vec![])
    }

    fn select_person(&self, _uid: &str) -> Result<Option<SourceRecord>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campus_db() -> DbPersonSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CAMPUS_VIEWS_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO BSPACE_PERSON_INFO_VW VALUES
                ('300846', 'Jane', 'OBrien', 'jane@berkeley.edu', 'STUDENT-TYPE-REGISTERED', 'U'),
                ('300847', 'Ravi', 'Patel', 'ravi@berkeley.edu', 'STUDENT-TYPE-REGISTERED', 'G'),
                ('300848', 'Old', 'Timer', 'old@berkeley.edu', 'STUDENT-STATUS-EXPIRED', 'U'),
                ('300849', 'Hist', 'Major', 'h@berkeley.edu', 'STUDENT-TYPE-REGISTERED', 'U'),
                ('212372', 'Ada', 'Lovelace', 'ada@berkeley.edu', 'EMPLOYEE-TYPE-STAFF', NULL);
             INSERT INTO BSPACE_STUDENT_MAJOR_VW (LDAP_UID, COLLEGE_ABBR, MAJOR_NAME, MAJOR_TITLE,
                COLLEGE_ABBR2, MAJOR_NAME2) VALUES
                ('300846', 'ENV DSGN', 'ARCHITECTURE', 'Architecture', NULL, NULL),
                ('300847', 'L&S', 'HISTORY', NULL, 'NAT RES', 'FORESTRY'),
                ('300848', 'ENV DSGN', 'ARCHITECTURE', NULL, NULL, NULL),
                ('300849', 'L&S', 'HISTORY', NULL, NULL, NULL);
             INSERT INTO BSPACE_STUDENT_PORTAL_VW VALUES ('300846', 'Junior');
             INSERT INTO BSPACE_STUDENT_TERM_VW VALUES ('300846', 'T');",
        )
        .unwrap();
        DbPersonSource::from_connection(conn)
    }

    #[test]
    fn test_select_students_from_colleges() {
        let db = campus_db();
        let colleges = vec!["ENV DSGN".to_string(), "NAT RES".to_string()];
        let students = db.select_students_from_colleges(&colleges).unwrap();
        let uids: Vec<&str> = students.iter().map(|s| s.ldap_uid.as_str()).collect();
        assert_eq!(uids, vec!["300846", "300847"]);
        assert_eq!(students[1].majors[1].college(), Some("NAT RES"));
    }

    #[test]
    fn test_select_no_colleges() {
        let db = campus_db();
        assert!(db.select_students_from_colleges(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_select_person_joins_views() {
        let db = campus_db();
        let jane = db.select_person("300846").unwrap().unwrap();
        assert_eq!(jane.first_name.as_deref(), Some("Jane"));
        assert_eq!(jane.majors.len(), MAJOR_SLOTS);
        assert_eq!(jane.majors[0].title(), Some("Architecture"));
        assert_eq!(jane.majors[2].major(), None);
        assert_eq!(jane.level_desc.as_deref(), Some("Junior"));
        assert_eq!(jane.new_trfr_flag.as_deref(), Some("T"));

        let ada = db.select_person("212372").unwrap().unwrap();
        assert_eq!(ada.ug_grad_flag, None);
        assert!(ada.majors.iter().all(|m| m.major().is_none()));

        assert!(db.select_person("999999").unwrap().is_none());
    }

    #[test]
    fn test_open_missing_db() {
        assert!(DbPersonSource::open("/nonexistent/campus.db").is_err());
    }
}
