//! Core types for the Warden authorization engine.
//!
//! This crate holds the small vocabulary every other Warden crate speaks:
//!
//! - [`TenantId`] - the isolation boundary for grants and cached decisions
//! - [`SubjectKind`] - whether a name refers to a role or a user
//! - [`Decision`] - an explicit allow or deny ruling
//! - [`domain`] - identity-domain qualification of role names
//!
//! # Example
//!
//! ```
//! use warden_core::{domain, Decision, SubjectKind, TenantId};
//!
//! let tenant = TenantId::SUPER;
//! assert_eq!(tenant.to_string(), "-1234");
//!
//! assert_eq!(Decision::from_allowed(false), Decision::Deny);
//! assert!(SubjectKind::Role.is_role());
//!
//! assert_eq!(domain::canonical_role_name("Internal/everyone"), "INTERNAL/everyone");
//! assert_eq!(domain::canonical_role_name("PRIMARY/admin"), "admin");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod domain;
mod types;

pub use domain::QualifiedRole;
pub use types::{Decision, SubjectKind, TenantId};
