//! Hierarchical authorization for Warden.
//!
//! This crate answers "may this role or user perform this action on this
//! resource?" for one tenant, and keeps the answer consistent with a durable
//! [`PermissionStore`](warden_store::PermissionStore).
//!
//! - [`AuthorizationManager`] - the public entry point: queries, grants,
//!   clearing, role renames and startup grants, gated by
//!   [`AuthorizationListener`]s
//! - [`AuthorizationEngine`] - the same operations without listeners
//! - [`PermissionIndex`] - the tenant's permission tree, synchronised from
//!   the store's change feed
//! - [`AuthorizationCache`] - memoized user decisions with race-free
//!   invalidation
//! - [`RoleResolver`] - the role membership collaborator
//!
//! # Decision rules
//!
//! Rulings are inherited down the resource hierarchy and the most specific
//! explicit ruling wins; without any ruling the answer is "not allowed".
//! A user is authorized by an allow on their own name or by holding any role
//! whose inherited ruling is allow.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use warden_authz::{AuthorizationManager, ManagerConfig};
//! use warden_store::InMemoryStore;
//!
//! # tokio_test::block_on(async {
//! let manager = AuthorizationManager::builder(Arc::new(InMemoryStore::new()))
//!     .config(ManagerConfig::default())
//!     .build()
//!     .await
//!     .unwrap();
//!
//! manager.authorize_user("alice", "/apps/billing", "read").await.unwrap();
//! assert!(manager.is_user_authorized("Alice", "/apps/billing/reports", "read").await.unwrap());
//! assert!(!manager.is_user_authorized("bob", "/apps/billing", "read").await.unwrap());
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bootstrap;
pub mod cache;
pub mod config;
mod engine;
pub mod error;
pub mod index;
pub mod listener;
mod manager;
pub mod membership;
mod mutation;
mod names;

pub use cache::{AuthorizationCache, CacheLookup, CacheSettings, CacheStats, CacheTicket};
pub use config::{BootstrapSettings, ManagerConfig};
pub use engine::AuthorizationEngine;
pub use error::{AuthzError, AuthzResult, OperationContext};
pub use index::{PermissionIndex, RefreshMode, RefreshOutcome};
pub use listener::AuthorizationListener;
pub use manager::{AuthorizationManager, AuthorizationManagerBuilder};
pub use membership::{MembershipError, NoRoles, RoleResolver, UserStoreInfo};
