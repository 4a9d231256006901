//! # Warden
//!
//! **Hierarchical, tenant-scoped authorization**
//!
//! Warden answers "may this role or user perform this action on this
//! resource?" against a durable grant store:
//!
//! - **Inherited rulings** - an allow or deny on `/apps/billing` covers every
//!   resource below it, and the most specific ruling wins
//! - **Roles and users** - users are authorized directly or through the roles
//!   they hold
//! - **Consistent caching** - memoized decisions are invalidated by every
//!   committed write, including writes made by other nodes
//! - **Transactional writes** - every grant change commits or rolls back as a
//!   whole
//!
//! ## Quick Start
//!
//! ```rust
//! use warden::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_string(
//!         r#"
//!         [bootstrap]
//!         admin_resources = "/permission/admin"
//!         "#,
//!         "toml",
//!     )
//!     .unwrap()
//!     .load()
//!     .unwrap();
//!
//! let manager = warden::in_memory(&config).await.unwrap();
//! assert!(manager
//!     .is_role_authorized("admin", "/permission/admin/users", UI_EXECUTE)
//!     .await
//!     .unwrap());
//! # });
//! ```
//!
//! ## Crates
//!
//! | Crate | Contents |
//! |---|---|
//! | [`core`] | Tenants, subject kinds, decisions, role domains |
//! | [`tree`] | Resource paths, the action vocabulary, the permission tree |
//! | [`store`] | The store boundary and the in-memory store |
//! | [`config`] | Layered configuration |
//! | [`telemetry`] | Logging and metrics |
//! | [`authz`] | The authorization manager |

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

// Re-export core types
pub use warden_core as core;

// Re-export the tree and codec
pub use warden_tree as tree;

// Re-export the store boundary
pub use warden_store as store;

// Re-export configuration
pub use warden_config as config;

// Re-export telemetry
pub use warden_telemetry as telemetry;

// Re-export the manager
pub use warden_authz as authz;

use warden_authz::{AuthorizationManager, AuthzResult, ManagerConfig};
use warden_config::WardenConfig;
use warden_store::InMemoryStore;

/// Builds a manager for `config` on top of a fresh [`InMemoryStore`].
///
/// The store keeps `store.change_retention` changes per tenant. Useful for
/// tests and single-process deployments.
///
/// # Errors
///
/// Returns an error if the configured action vocabulary is invalid or the
/// startup grants cannot be written.
pub async fn in_memory(config: &WardenConfig) -> AuthzResult<AuthorizationManager> {
    let store = InMemoryStore::with_retention(config.store.change_retention);
    AuthorizationManager::builder(Arc::new(store))
        .config(ManagerConfig::from(config))
        .build()
        .await
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use warden::prelude::*;
///
/// let config = ManagerConfig::default();
/// assert_eq!(config.tenant, TenantId::SUPER);
/// ```
pub mod prelude {
    pub use warden_core::{Decision, SubjectKind, TenantId};

    pub use warden_tree::UI_EXECUTE;

    pub use warden_store::{InMemoryStore, PermissionStore, StoreError};

    pub use warden_config::{ConfigLoader, WardenConfig};

    pub use warden_telemetry::{init_telemetry, TelemetryConfig};

    pub use warden_authz::{
        AuthorizationListener, AuthorizationManager, AuthzError, AuthzResult, ManagerConfig,
        RoleResolver,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_config::ConfigLoader;

    #[tokio::test]
    async fn test_in_memory_applies_config() {
        let config = ConfigLoader::new()
            .with_defaults()
            .with_string(
                r#"
                [authorization]
                tenant_id = 7
                actions = ["approve"]

                [bootstrap]
                everyone_resources = "/portal, /portal/help"
                "#,
                "toml",
            )
            .unwrap()
            .load()
            .unwrap();

        let manager = in_memory(&config).await.unwrap();
        assert_eq!(manager.tenant_id(), warden_core::TenantId::new(7));
        assert!(manager
            .is_role_authorized("Internal/everyone", "/portal/help", "ui.execute")
            .await
            .unwrap());

        manager.authorize_role("clerk", "/invoices", "approve").await.unwrap();
        assert!(manager
            .is_role_authorized("clerk", "/invoices/1", "approve")
            .await
            .unwrap());
    }
}
