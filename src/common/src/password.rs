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
use sha1::{Digest, Sha1};

use crate::constants::DEFAULT_TEST_PASSWORD;

/// Initial password for a new account. Accounts authenticate through campus
/// SSO, so this only has to be unguessable without the key.
pub fn make_password(uid: &str, key: Option<&str>) -> String {
    match key {
        Some(key) if !key.is_empty() => {
            let mut hasher = Sha1::new();
            hasher.update(uid.as_bytes());
            hasher.update(key.as_bytes());
            hex::encode(hasher.finalize())
        }
        _ => DEFAULT_TEST_PASSWORD.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_key_uses_test_password() {
        assert_eq!(make_password("300846", None), "testuser");
        assert_eq!(make_password("300846", Some("")), "testuser");
    }

    #[test]
    fn test_keyed_password() {
        // sha1("abc")
        assert_eq!(
            make_password("a", Some("bc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_ne!(
            make_password("300846", Some("secret")),
            make_password("300847", Some("secret"))
        );
    }
}
