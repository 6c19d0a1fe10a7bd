//! User entity - Directory record for every party that can call the ledger.
//!
//! The numeric affiliation stored with the user is the caller's role.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Error, Result};

/// Permission class of a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Card authority; creates templates and hands them to shops
    Authority,
    /// Issuing shop
    Shop,
    /// Card holder
    Consumer,
    /// Mailbox holder
    Mailbox,
}

impl Role {
    /// Stored affiliation code for this role.
    #[must_use]
    pub const fn affiliation(self) -> i64 {
        match self {
            Self::Authority => 1,
            Self::Shop => 2,
            Self::Consumer => 3,
            Self::Mailbox => 4,
        }
    }

    /// Parses an affiliation code.
    pub fn from_affiliation(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Authority),
            2 => Some(Self::Shop),
            3 => Some(Self::Consumer),
            4 => Some(Self::Mailbox),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authority => "authority",
            Self::Shop => "shop",
            Self::Consumer => "consumer",
            Self::Mailbox => "mailbox",
        };
        f.write_str(name)
    }
}

/// User directory record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Caller identity, also the store key suffix
    pub identity: String,
    /// Display name
    pub name: String,
    /// Enrollment certificate reference (opaque)
    pub ecert: String,
    /// Role code, see [`Role::affiliation`]
    pub affiliation: i64,
    /// External authentication id
    #[serde(rename = "authid")]
    pub auth_id: String,
}

impl User {
    /// Resolves the user's role.
    ///
    /// An affiliation outside the known codes means the stored record is bad.
    pub fn role(&self) -> Result<Role> {
        Role::from_affiliation(self.affiliation).ok_or_else(|| Error::CorruptRecord {
            key: self.identity.clone(),
            message: format!("unknown affiliation {}", self.affiliation),
        })
    }
}
