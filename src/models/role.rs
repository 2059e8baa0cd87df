use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Roles an administrator can assign to a user.
///
/// The wire form is the capitalised name used by the backend (`"Admin"`,
/// `"PPIC"`, `"QC"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[serde(rename = "PPIC")]
    Ppic,
    Toolpather,
    #[serde(rename = "PEM")]
    Pem,
    #[serde(rename = "QC")]
    Qc,
    Engineering,
    Guest,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Ppic,
        Role::Toolpather,
        Role::Pem,
        Role::Qc,
        Role::Engineering,
        Role::Guest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Ppic => "PPIC",
            Role::Toolpather => "Toolpather",
            Role::Pem => "PEM",
            Role::Qc => "QC",
            Role::Engineering => "Engineering",
            Role::Guest => "Guest",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownRole(value.to_string()))
    }
}
