//! Principal (staff account) domain model.
//!
//! Principals are owned by the surrounding platform. This subsystem
//! reads them for authentication and writes only the last-login fields,
//! the token version and the admin role.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Admin,
    Moderator,
    Developer,
}

impl AdminRole {
    pub const ALL: [AdminRole; 3] = [AdminRole::Admin, AdminRole::Moderator, AdminRole::Developer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::Developer => "developer",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "moderator" => Ok(Self::Moderator),
            "developer" => Ok(Self::Developer),
            other => Err(format!("unknown admin role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub admin_role: Option<AdminRole>,
    /// Incrementing this invalidates every token issued before.
    pub token_version: u64,
    pub is_admin_active: bool,
    pub last_admin_login: Option<DateTime<Utc>>,
    pub last_ip: Option<String>,
    pub last_user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// The role this principal may act with, if any.
    pub fn privileged_role(&self) -> Option<AdminRole> {
        if self.is_admin_active {
            self.admin_role
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrincipal {
    pub email: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    pub admin_role: Option<AdminRole>,
    pub is_admin_active: bool,
}

/// Last-login fields written after a successful authentication.
#[derive(Debug, Clone)]
pub struct LoginStamp {
    pub at: DateTime<Utc>,
    pub ip: String,
    pub user_agent: Option<String>,
}
