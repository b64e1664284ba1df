use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ScoreError};

/// Role of the caller, as provided by the hosting platform's session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Director,
    Secretary,
    Regional,
}

impl Role {
    /// Supervisors may unlock criteria, reclassify and reset clubs.
    pub fn is_supervisor(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Evaluators may submit criterion scores and record demerits.
    pub fn can_evaluate(self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }

    pub fn can_register(self) -> bool {
        matches!(self, Role::Admin | Role::Secretary)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Director => "director",
            Role::Secretary => "secretary",
            Role::Regional => "regional",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "director" => Ok(Role::Director),
            "secretary" => Ok(Role::Secretary),
            "regional" => Ok(Role::Regional),
            other => Err(format!(
                "unknown role '{}' (expected admin, staff, director, secretary or regional)",
                other
            )),
        }
    }
}

/// The acting user for a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn require_supervisor(&self, operation: &str) -> Result<()> {
        self.require(self.role.is_supervisor(), operation)
    }

    pub fn require_evaluator(&self, operation: &str) -> Result<()> {
        self.require(self.role.can_evaluate(), operation)
    }

    pub fn require_registrar(&self, operation: &str) -> Result<()> {
        self.require(self.role.can_register(), operation)
    }

    fn require(&self, allowed: bool, operation: &str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(ScoreError::Permission {
                actor: self.id.clone(),
                role: self.role,
                operation: operation.to_string(),
            })
        }
    }
}
