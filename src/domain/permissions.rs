//! Roles, capabilities, and the fixed permission table
//!
//! The table is built once at startup and evaluated by a pure function.
//! Any `(role, capability)` pair absent from the table is denied, and an
//! unrecognized role never panics: it simply holds no capabilities.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Session role of an acting user, immutable for the session's duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including user and configuration management
    Admin,
    /// Read/write/share access to research data
    Researcher,
    /// Read-only access
    Reader,
}

impl Role {
    /// All built-in roles
    pub fn all() -> [Role; 3] {
        [Role::Admin, Role::Researcher, Role::Reader]
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Spanish aliases kept for compatibility with the legacy dashboard users
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "researcher" | "investigador" => Ok(Role::Researcher),
            "reader" | "lector" => Ok(Role::Reader),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Researcher => write!(f, "researcher"),
            Role::Reader => write!(f, "reader"),
        }
    }
}

/// A named permission unit gating one kind of gateway operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReadFile,
    WriteFile,
    DeleteFile,
    ShareFile,
    RunCommand,
    ManageUsers,
    ManageConfig,
}

impl Capability {
    /// All capabilities, for exhaustive checks
    pub fn all() -> [Capability; 7] {
        [
            Capability::ReadFile,
            Capability::WriteFile,
            Capability::DeleteFile,
            Capability::ShareFile,
            Capability::RunCommand,
            Capability::ManageUsers,
            Capability::ManageConfig,
        ]
    }

    /// Whether a forwarded operation under this capability may be retried.
    /// Retry is limited to idempotent reads; writes, deletions, and command
    /// execution must reach the module at most once from the gateway's side.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Capability::ReadFile)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ReadFile => "read_file",
            Capability::WriteFile => "write_file",
            Capability::DeleteFile => "delete_file",
            Capability::ShareFile => "share_file",
            Capability::RunCommand => "run_command",
            Capability::ManageUsers => "manage_users",
            Capability::ManageConfig => "manage_config",
        };
        write!(f, "{}", name)
    }
}

/// Fixed `(role, capability)` allow-set, default-deny
#[derive(Debug, Clone)]
pub struct PermissionTable {
    allowed: HashSet<(Role, Capability)>,
}

impl PermissionTable {
    /// The built-in permission table. Changing it means redeploying
    /// configuration; there is no runtime mutation API.
    pub fn builtin() -> Self {
        let mut allowed = HashSet::new();

        for capability in Capability::all() {
            allowed.insert((Role::Admin, capability));
        }

        allowed.insert((Role::Researcher, Capability::ReadFile));
        allowed.insert((Role::Researcher, Capability::WriteFile));
        allowed.insert((Role::Researcher, Capability::ShareFile));

        allowed.insert((Role::Reader, Capability::ReadFile));

        Self { allowed }
    }

    /// Pure permission check: no side effects, no I/O, deterministic.
    pub fn authorize(&self, role: Role, capability: Capability) -> bool {
        self.allowed.contains(&(role, capability))
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(role: Role, capability: Capability) -> bool {
        match role {
            Role::Admin => true,
            Role::Researcher => matches!(
                capability,
                Capability::ReadFile | Capability::WriteFile | Capability::ShareFile
            ),
            Role::Reader => matches!(capability, Capability::ReadFile),
        }
    }

    #[test]
    fn exhaustive_permission_table() {
        let table = PermissionTable::builtin();
        for role in Role::all() {
            for capability in Capability::all() {
                assert_eq!(
                    table.authorize(role, capability),
                    expected(role, capability),
                    "unexpected decision for ({role}, {capability})"
                );
            }
        }
    }

    #[test]
    fn researcher_cannot_delete_or_manage() {
        let table = PermissionTable::builtin();
        assert!(!table.authorize(Role::Researcher, Capability::DeleteFile));
        assert!(!table.authorize(Role::Researcher, Capability::RunCommand));
        assert!(!table.authorize(Role::Researcher, Capability::ManageUsers));
        assert!(!table.authorize(Role::Researcher, Capability::ManageConfig));
    }

    #[test]
    fn unknown_role_string_is_rejected_not_panicked() {
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!("investigador".parse::<Role>(), Ok(Role::Researcher));
        assert_eq!("LECTOR".parse::<Role>(), Ok(Role::Reader));
    }

    #[test]
    fn only_reads_are_idempotent() {
        for capability in Capability::all() {
            assert_eq!(
                capability.is_idempotent(),
                capability == Capability::ReadFile
            );
        }
    }
}
