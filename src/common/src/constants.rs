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
use crate::config::{AuthMode, Environment, RemainingSource};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/myberkeley/provision.conf";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/";
pub const DEFAULT_ADMIN_USER: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";
pub const DEFAULT_AUTH_MODE: AuthMode = AuthMode::Form;
pub const DEFAULT_ENVIRONMENT: Environment = Environment::Development;
pub const DEFAULT_DB_PATH: &str = "/var/lib/myberkeley/campus.db";
pub const DEFAULT_EMAIL_DOMAIN: &str = "berkeley.edu";
pub const DEFAULT_REMAINING_SOURCE: RemainingSource = RemainingSource::IntegratedUserIds;
pub const DEFAULT_REFRESH_ACLS: bool = true;
pub const DEFAULT_INDEX_WAIT: u64 = 4;
pub const DEFAULT_CONN_TIMEOUT: u64 = 30;

// Currently these group names are misleading. They mean "all advisors in
// the pilot" and "all students in the pilot".
pub const DEFAULT_ADVISORS_GROUP: &str = "g-ced-advisors";
pub const DEFAULT_STUDENTS_GROUP: &str = "g-ced-students";
pub const DEFAULT_REPORT_GROUP: &str = "CalCentral-Team";
pub const DEFAULT_ADVISOR_COLLEGE: &str = "College of Environmental Design";

pub const DEFAULT_COLLEGES: &[&str] = &["ENV DSGN", "NAT RES"];
pub const DEFAULT_COLLEGE_PROFILE: &[(&str, &str)] = &[
    ("ENV DSGN", "College of Environmental Design"),
    ("NAT RES", "College of Natural Resources"),
];
pub const DEFAULT_COLLEGE_DEMOGRAPHIC: &[(&str, &str)] = &[("ENV DSGN", "CED")];
pub const DEFAULT_DYNAMIC_LISTS: &[(&str, &str)] = &[
    ("ENV DSGN", "myb-ced-students"),
    ("NAT RES", "myb-cnr-students"),
];

// Used as the account password when no derivation key is configured.
pub const DEFAULT_TEST_PASSWORD: &str = "testuser";

// Reserved prefix marking a principal id as a group.
pub const GROUP_PREFIX: &str = "g-";

pub const AFFILIATION_REGISTERED_STUDENT: &str = "STUDENT-TYPE-REGISTERED";
pub const AFFILIATION_ACADEMIC_EMPLOYEE: &str = "EMPLOYEE-TYPE-ACADEMIC";
pub const AFFILIATION_STAFF_EMPLOYEE: &str = "EMPLOYEE-TYPE-STAFF";
pub const AFFILIATION_VISITING: &str = "AFFILIATE-TYPE-VISITING";

pub const ROLE_UNDERGRAD: &str = "Undergraduate Student";
pub const ROLE_GRAD: &str = "Graduate Student";
pub const ROLE_STUDENT: &str = "Student";
pub const ROLE_INSTRUCTOR: &str = "Instructor";
pub const ROLE_STAFF: &str = "Staff";
pub const ROLE_GUEST: &str = "Guest";

pub const MAJOR_SLOTS: usize = 4;
