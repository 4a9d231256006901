//! # Warden Test
//!
//! Test fixtures for exercising the authorization manager without real
//! infrastructure.
//!
//! ## Fixtures
//!
//! - [`FaultyStore`] - an in-memory permission store that fails or stalls at
//!   chosen points
//! - [`StaticRoleResolver`] - fixed role membership with a failure switch
//! - [`RecordingListener`] - records listener hooks and vetoes selected ones
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use warden_authz::AuthorizationManager;
//! use warden_store::InMemoryStore;
//! use warden_test::{FaultyStore, RecordingListener, StaticRoleResolver};
//!
//! # tokio_test::block_on(async {
//! let store = FaultyStore::new(InMemoryStore::new());
//! let listener = Arc::new(RecordingListener::vetoing(&["deny_role"]));
//! let manager = AuthorizationManager::builder(Arc::new(store))
//!     .resolver(Arc::new(StaticRoleResolver::new().with_roles("alice", &["manager"])))
//!     .listener(listener.clone())
//!     .build()
//!     .await
//!     .unwrap();
//!
//! manager.authorize_role("manager", "/reports", "read").await.unwrap();
//! assert!(manager.is_user_authorized("alice", "/reports", "read").await.unwrap());
//! assert_eq!(listener.hooks(), vec!["authorize_role", "is_user_authorized"]);
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod faulty;
mod listener;
mod resolver;

pub use faulty::{FaultPoint, FaultyStore};
pub use listener::{ListenerCall, RecordingListener};
pub use resolver::StaticRoleResolver;
