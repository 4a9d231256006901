//! Manager configuration.

use std::time::Duration;

use warden_config::WardenConfig;
use warden_core::TenantId;
use warden_tree::ActionVocabulary;

use crate::error::{AuthzError, AuthzResult};

/// Default principal that bypasses every check.
pub const DEFAULT_SYSTEM_USER: &str = "warden.system.user";

/// Default role held by every authenticated user.
pub const DEFAULT_EVERYONE_ROLE: &str = "Internal/everyone";

/// Default administrative role.
pub const DEFAULT_ADMIN_ROLE: &str = "admin";

/// Grants written when a manager is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSettings {
    /// Role every authenticated user holds.
    pub everyone_role: String,
    /// Administrative role.
    pub admin_role: String,
    /// UI resources granted to the everyone role.
    pub everyone_resources: Vec<String>,
    /// UI resources granted to the admin role.
    pub admin_resources: Vec<String>,
    /// Overrides the user store domain reported by the role resolver.
    pub user_store_domain: Option<String>,
    /// Overrides whether a read-only user store exposes groups as roles.
    pub read_groups: Option<bool>,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            everyone_role: DEFAULT_EVERYONE_ROLE.to_string(),
            admin_role: DEFAULT_ADMIN_ROLE.to_string(),
            everyone_resources: Vec::new(),
            admin_resources: Vec::new(),
            user_store_domain: None,
            read_groups: None,
        }
    }
}

/// Configuration of one [`AuthorizationManager`](crate::AuthorizationManager).
///
/// # Example
///
/// ```
/// use warden_authz::ManagerConfig;
///
/// let config = ManagerConfig::default();
/// assert!(config.cache_enabled);
/// assert!(!config.case_sensitive);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Tenant the manager serves.
    pub tenant: TenantId,
    /// Memoize user authorization results.
    pub cache_enabled: bool,
    /// Compare names case-sensitively.
    pub case_sensitive: bool,
    /// Resolve membership by listing every role of the user; also selects
    /// the tree-walking UI resource listing.
    pub verify_by_retrieving_all_user_roles: bool,
    /// Let the store cascade permission deletes onto grants.
    pub cascade_delete_enabled: bool,
    /// Identifier of the decision cache.
    pub cache_identifier: String,
    /// Principal that is authorized for everything.
    pub system_user: String,
    /// Deadline for one write transaction.
    pub store_timeout: Option<Duration>,
    /// Actions understood in addition to the built-in vocabulary.
    pub extra_actions: Vec<String>,
    /// Maximum number of cached decisions.
    pub cache_max_entries: usize,
    /// Lifetime of a cached decision.
    pub cache_ttl: Option<Duration>,
    /// Startup grants.
    pub bootstrap: BootstrapSettings,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            tenant: TenantId::SUPER,
            cache_enabled: true,
            case_sensitive: false,
            verify_by_retrieving_all_user_roles: false,
            cascade_delete_enabled: false,
            cache_identifier: "default".to_string(),
            system_user: DEFAULT_SYSTEM_USER.to_string(),
            store_timeout: None,
            extra_actions: Vec::new(),
            cache_max_entries: 10_000,
            cache_ttl: None,
            bootstrap: BootstrapSettings::default(),
        }
    }
}

impl ManagerConfig {
    /// Builds the action vocabulary: the defaults plus `extra_actions`.
    pub fn vocabulary(&self) -> AuthzResult<ActionVocabulary> {
        ActionVocabulary::default()
            .with_actions(&self.extra_actions)
            .map_err(|e| AuthzError::Config(e.to_string()))
    }
}

impl From<&WardenConfig> for ManagerConfig {
    fn from(config: &WardenConfig) -> Self {
        let authorization = &config.authorization;
        Self {
            tenant: TenantId::new(authorization.tenant_id),
            cache_enabled: authorization.cache_enabled,
            case_sensitive: authorization.case_sensitive,
            verify_by_retrieving_all_user_roles: authorization.verify_by_retrieving_all_user_roles,
            cascade_delete_enabled: authorization.cascade_delete_enabled,
            cache_identifier: authorization.cache_identifier.clone(),
            system_user: authorization.system_user.clone(),
            store_timeout: authorization.store_timeout_ms.map(Duration::from_millis),
            extra_actions: authorization.actions.clone(),
            cache_max_entries: config.cache.max_entries,
            cache_ttl: config.cache.ttl_secs.map(Duration::from_secs),
            bootstrap: BootstrapSettings {
                everyone_role: config.bootstrap.everyone_role.clone(),
                admin_role: config.bootstrap.admin_role.clone(),
                everyone_resources: config.bootstrap.everyone_resource_list(),
                admin_resources: config.bootstrap.admin_resource_list(),
                user_store_domain: config.bootstrap.user_store_domain.clone(),
                read_groups: config.bootstrap.read_groups,
            },
        }
    }
}
