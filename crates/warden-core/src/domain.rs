//! Identity-domain qualification of role names.
//!
//! A role may belong to the primary user store, to a secondary (external)
//! store, or to one of the engine's own domains. The domain travels as a
//! prefix on the role name (`LDAP/engineers`), is stored as a separate,
//! uppercased column, and is re-attached when grants are read back.
//!
//! Roles from the primary domain and built-in system roles are addressed by
//! their bare name, so [`canonical_role_name`] drops those two prefixes.

use std::fmt;

/// Separator between a domain and the bare role name.
pub const SEPARATOR: char = '/';

/// Primary (default) user-store domain.
pub const PRIMARY_DOMAIN: &str = "PRIMARY";

/// Synthetic domain of built-in system roles.
pub const SYSTEM_DOMAIN: &str = "SYSTEM";

/// Domain of internal (hybrid) roles such as `Internal/everyone`.
pub const INTERNAL_DOMAIN: &str = "INTERNAL";

/// Domain of application roles.
pub const APPLICATION_DOMAIN: &str = "APPLICATION";

/// Separator between a role name and a tenant domain (`role@tenant.com`).
pub const TENANT_DOMAIN_COMBINER: char = '@';

/// Returns the domain prefix of `name`, if any.
///
/// ```
/// use warden_core::domain::extract_domain;
///
/// assert_eq!(extract_domain("LDAP/engineers"), Some("LDAP"));
/// assert_eq!(extract_domain("engineers"), None);
/// ```
#[must_use]
pub fn extract_domain(name: &str) -> Option<&str> {
    match name.find(SEPARATOR) {
        Some(index) if index > 0 => Some(&name[..index]),
        _ => None,
    }
}

/// Returns `name` without its domain prefix.
#[must_use]
pub fn remove_domain(name: &str) -> &str {
    match name.find(SEPARATOR) {
        Some(index) if index > 0 => &name[index + SEPARATOR.len_utf8()..],
        _ => name,
    }
}

/// Prefixes `name` with `domain` unless the domain is absent or primary.
///
/// An existing prefix on `name` is replaced.
#[must_use]
pub fn add_domain(name: &str, domain: Option<&str>) -> String {
    match domain.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) if !d.eq_ignore_ascii_case(PRIMARY_DOMAIN) => {
            format!("{}{SEPARATOR}{}", d.to_uppercase(), remove_domain(name))
        }
        _ => name.to_string(),
    }
}

/// Returns the form under which a role is indexed and compared.
///
/// The domain is uppercased; primary and system prefixes are dropped.
#[must_use]
pub fn canonical_role_name(name: &str) -> String {
    QualifiedRole::parse(name).canonical()
}

/// Strips a tenant-domain suffix (`admin@acme.com` -> `admin`).
#[must_use]
pub fn strip_tenant_domain(role: &str) -> &str {
    match role.find(TENANT_DOMAIN_COMBINER) {
        Some(index) => &role[..index],
        None => role,
    }
}

/// A role name split into its bare name and optional domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedRole {
    /// Role name without any domain prefix.
    pub name: String,
    /// Uppercased domain, if the name carried one.
    pub domain: Option<String>,
}

impl QualifiedRole {
    /// Splits `name` into domain and bare role name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        Self {
            name: remove_domain(name).to_string(),
            domain: extract_domain(name).map(str::to_uppercase),
        }
    }

    /// Rebuilds a role from a stored (name, domain) pair.
    #[must_use]
    pub fn from_stored(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: Some(domain.into().to_uppercase()),
        }
    }

    /// Returns the domain to persist alongside the bare name.
    ///
    /// Built-in system roles always land in [`SYSTEM_DOMAIN`]; roles without
    /// a prefix default to [`PRIMARY_DOMAIN`].
    #[must_use]
    pub fn storage_domain(&self, is_system_role: bool) -> String {
        if is_system_role {
            SYSTEM_DOMAIN.to_string()
        } else {
            self.domain
                .clone()
                .unwrap_or_else(|| PRIMARY_DOMAIN.to_string())
        }
    }

    /// Returns the canonical, index-ready role name.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self.domain.as_deref() {
            None | Some(PRIMARY_DOMAIN | SYSTEM_DOMAIN) => self.name.clone(),
            Some(domain) => format!("{domain}{SEPARATOR}{}", self.name),
        }
    }
}

impl fmt::Display for QualifiedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_and_remove() {
        assert_eq!(extract_domain("Internal/everyone"), Some("Internal"));
        assert_eq!(remove_domain("Internal/everyone"), "everyone");
        assert_eq!(extract_domain("/leading"), None);
        assert_eq!(remove_domain("/leading"), "/leading");
        assert_eq!(remove_domain("plain"), "plain");
    }

    #[test]
    fn test_add_domain() {
        assert_eq!(add_domain("admin", Some("ldap")), "LDAP/admin");
        assert_eq!(add_domain("admin", Some("PRIMARY")), "admin");
        assert_eq!(add_domain("admin", None), "admin");
        assert_eq!(add_domain("OLD/admin", Some("new")), "NEW/admin");
        assert_eq!(add_domain("admin", Some("  ")), "admin");
    }

    #[test]
    fn test_canonical_role_name() {
        assert_eq!(canonical_role_name("internal/everyone"), "INTERNAL/everyone");
        assert_eq!(canonical_role_name("primary/admin"), "admin");
        assert_eq!(canonical_role_name("system/wheel"), "wheel");
        assert_eq!(canonical_role_name("manager"), "manager");
    }

    #[test]
    fn test_storage_domain() {
        let plain = QualifiedRole::parse("manager");
        assert_eq!(plain.storage_domain(false), PRIMARY_DOMAIN);
        assert_eq!(plain.storage_domain(true), SYSTEM_DOMAIN);

        let external = QualifiedRole::parse("ldap/engineers");
        assert_eq!(external.storage_domain(false), "LDAP");
    }

    #[test]
    fn test_stored_round_trip_matches_canonical() {
        let stored = QualifiedRole::from_stored("engineers", "ldap");
        assert_eq!(stored.canonical(), canonical_role_name("LDAP/engineers"));
        let primary = QualifiedRole::from_stored("admin", PRIMARY_DOMAIN);
        assert_eq!(primary.canonical(), "admin");
    }

    #[test]
    fn test_strip_tenant_domain() {
        assert_eq!(strip_tenant_domain("admin@acme.com"), "admin");
        assert_eq!(strip_tenant_domain("admin"), "admin");
    }

    proptest! {
        #[test]
        fn canonical_is_idempotent(name in "[A-Za-z]{0,6}(/[A-Za-z]{1,6})?") {
            let once = canonical_role_name(&name);
            prop_assert_eq!(canonical_role_name(&once), once);
        }
    }
}
