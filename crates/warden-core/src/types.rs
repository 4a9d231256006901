//! Primitive identifiers and rulings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a tenant.
///
/// Every grant, permission record and cached decision belongs to exactly
/// one tenant. The super tenant uses the well-known id `-1234`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(i32);

impl TenantId {
    /// The super tenant.
    pub const SUPER: Self = Self(-1234);

    /// Creates a tenant id from its numeric value.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::SUPER
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for TenantId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Whether a subject name refers to a role or to a user.
///
/// Role and user decisions live in separate namespaces: the same name may
/// carry a role ruling and a user ruling without either affecting the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// A role (group of users).
    Role,
    /// An individual user.
    User,
}

impl SubjectKind {
    /// Returns the kind for an `is_role` flag.
    #[must_use]
    pub const fn from_is_role(is_role: bool) -> Self {
        if is_role {
            Self::Role
        } else {
            Self::User
        }
    }

    /// Returns true for [`SubjectKind::Role`].
    #[must_use]
    pub const fn is_role(self) -> bool {
        matches!(self, Self::Role)
    }

    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::User => "user",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An explicit ruling recorded for a subject on a resource.
///
/// The absence of a `Decision` means "no ruling here"; it is modelled with
/// `Option<Decision>` rather than a third variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Access is granted.
    Allow,
    /// Access is refused.
    Deny,
}

impl Decision {
    /// Maps an allow flag onto a decision.
    #[must_use]
    pub const fn from_allowed(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny
        }
    }

    /// Returns true for [`Decision::Allow`].
    #[must_use]
    pub const fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns the opposite polarity.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Allow => Self::Deny,
            Self::Deny => Self::Allow,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
        }
    }
}
