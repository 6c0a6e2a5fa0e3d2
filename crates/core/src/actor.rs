//! Acting party identity
//!
//! Identity is issued elsewhere. The core only records who did what, so an
//! actor is an opaque id plus a role label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The party requesting, approving or rejecting a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }

    /// The actor used when a request carries no identity (batch jobs, schedulers)
    pub fn system() -> Self {
        Self::new("SYSTEM", "system")
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}
