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
use std::fmt;

/// Failures of a single request against the content system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The request never produced a response: connection refused, timeout,
    /// malformed request.
    Transport(String),
    /// The server answered with a non-success status.
    Status { code: u16, body: String },
    /// A response body was not the JSON we expected.
    InvalidJson(String),
    /// A request path could not be joined onto the server url.
    InvalidUrl(String),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::Status { code: 404, .. })
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::Transport(msg) => write!(f, "Transport failure: {}", msg),
            DirectoryError::Status { code, body } => {
                write!(f, "Request failed with status {}: {}", code, body)
            }
            DirectoryError::InvalidJson(msg) => write!(f, "Invalid JSON response: {}", msg),
            DirectoryError::InvalidUrl(msg) => write!(f, "Invalid url: {}", msg),
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<reqwest::Error> for DirectoryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            DirectoryError::InvalidJson(e.to_string())
        } else {
            DirectoryError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(e: serde_json::Error) -> Self {
        DirectoryError::InvalidJson(e.to_string())
    }
}

impl From<url::ParseError> for DirectoryError {
    fn from(e: url::ParseError) -> Self {
        DirectoryError::InvalidUrl(e.to_string())
    }
}
