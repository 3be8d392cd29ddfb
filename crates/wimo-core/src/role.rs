//! Role groups and the fixed permission table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An operation class gated by role group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Load,
    Save,
    Delete,
}

impl Permission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Save => "save",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coarse permission bucket assigned to each user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleGroup {
    Administrator,
    Readonly,
}

impl RoleGroup {
    /// Every known role group.
    pub const ALL: [RoleGroup; 2] = [RoleGroup::Administrator, RoleGroup::Readonly];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Readonly => "readonly",
        }
    }

    /// Operations granted to this group.
    #[must_use]
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Administrator => &[Permission::Load, Permission::Save, Permission::Delete],
            Self::Readonly => &[Permission::Load],
        }
    }

    #[must_use]
    pub fn permits(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for RoleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role group name is not in the permission table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role group: {0}")]
pub struct UnknownRoleGroup(pub String);

impl FromStr for RoleGroup {
    type Err = UnknownRoleGroup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrator" => Ok(Self::Administrator),
            "readonly" => Ok(Self::Readonly),
            other => Err(UnknownRoleGroup(other.to_string())),
        }
    }
}
