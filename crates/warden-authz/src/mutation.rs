//! Grant mutations and how they are written to a store transaction.

use warden_core::{QualifiedRole, SubjectKind};
use warden_store::{PermissionId, StoreResult, StoreTransaction};
use warden_tree::{PermissionCategory, ResourcePath};

use crate::error::OperationContext;

/// A validated, normalized (resource, action) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub(crate) resource: String,
    pub(crate) path: ResourcePath,
    pub(crate) category: PermissionCategory,
    /// Action name as registered in the vocabulary.
    pub(crate) action: String,
}

/// Normalized grant subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Subject {
    Role(QualifiedRole),
    User(String),
}

impl Subject {
    pub(crate) fn kind(&self) -> SubjectKind {
        match self {
            Self::Role(_) => SubjectKind::Role,
            Self::User(_) => SubjectKind::User,
        }
    }

    /// Name as indexed in the tree and reported in errors.
    pub(crate) fn display_name(&self) -> String {
        match self {
            Self::Role(role) => role.canonical(),
            Self::User(user) => user.clone(),
        }
    }
}

/// Which cached decisions a committed mutation makes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InvalidationScope {
    Tenant,
    User(String),
}

/// One write against the store.
#[derive(Debug, Clone)]
pub(crate) enum GrantMutation {
    /// Record an allow or deny, replacing a grant of the other polarity.
    Set {
        subject: Subject,
        target: Target,
        allowed: bool,
    },
    /// Remove one grant.
    ClearGrant { subject: Subject, target: Target },
    /// Remove every grant of a subject.
    ClearSubject(Subject),
    /// Remove a role's grants for one action on every resource.
    ClearRoleAction { role: QualifiedRole, action: String },
    /// Remove every grant and permission record of a resource.
    ClearResource { resource: String },
    /// Move a role's grants onto a new name.
    RenameRole { old: QualifiedRole, new: QualifiedRole },
}

impl GrantMutation {
    pub(crate) fn context(&self, operation: &'static str) -> OperationContext {
        let context = OperationContext::new(operation);
        match self {
            Self::Set {
                subject, target, ..
            }
            | Self::ClearGrant { subject, target } => context
                .subject(subject.display_name())
                .resource(target.resource.as_str())
                .action(target.action.as_str()),
            Self::ClearSubject(subject) => context.subject(subject.display_name()),
            Self::ClearRoleAction { role, action } => {
                context.subject(role.canonical()).action(action.as_str())
            }
            Self::ClearResource { resource } => context.resource(resource.as_str()),
            Self::RenameRole { old, new } => {
                context.subject(format!("{} -> {}", old.canonical(), new.canonical()))
            }
        }
    }

    /// Cached decisions to drop once the mutation is committed.
    ///
    /// A user's own grants only affect that user's decisions, on the target
    /// and on every resource inheriting from it.
    pub(crate) fn scope(&self) -> InvalidationScope {
        match self {
            Self::Set {
                subject: Subject::User(user),
                ..
            }
            | Self::ClearGrant {
                subject: Subject::User(user),
                ..
            }
            | Self::ClearSubject(Subject::User(user)) => InvalidationScope::User(user.clone()),
            _ => InvalidationScope::Tenant,
        }
    }

    /// Writes the mutation into `tx`. Does not commit.
    pub(crate) async fn apply(
        &self,
        tx: &mut dyn StoreTransaction,
        cascade_delete: bool,
    ) -> StoreResult<()> {
        match self {
            Self::Set {
                subject,
                target,
                allowed,
            } => {
                let permission = tx.ensure_permission(&target.resource, &target.action).await?;
                set_grant(tx, permission, subject, *allowed).await
            }
            Self::ClearGrant { subject, target } => {
                let Some(permission) = tx.permission_id(&target.resource, &target.action).await?
                else {
                    return Ok(());
                };
                match subject {
                    Subject::Role(role) => {
                        let domain = storage_domain(tx, role).await?;
                        tx.delete_role_grant(permission, &role.name, &domain).await?;
                    }
                    Subject::User(user) => {
                        tx.delete_user_grant(permission, user).await?;
                    }
                }
                Ok(())
            }
            Self::ClearSubject(Subject::Role(role)) => {
                let domain = storage_domain(tx, role).await?;
                tx.delete_role_grants(&role.name, &domain).await?;
                Ok(())
            }
            Self::ClearSubject(Subject::User(user)) => {
                tx.delete_user_grants(user).await?;
                Ok(())
            }
            Self::ClearRoleAction { role, action } => {
                let domain = storage_domain(tx, role).await?;
                tx.delete_role_grants_for_action(&role.name, &domain, action)
                    .await?;
                Ok(())
            }
            Self::ClearResource { resource } => {
                if !cascade_delete {
                    tx.delete_grants_for_resource(resource).await?;
                }
                tx.delete_permissions_for_resource(resource).await?;
                Ok(())
            }
            Self::RenameRole { old, new } => {
                let domain = storage_domain(tx, new).await?;
                tx.rename_role(&old.name, &new.name, &domain).await?;
                Ok(())
            }
        }
    }
}

/// Domain a role is persisted under. Unprefixed built-in roles live in the
/// system domain.
async fn storage_domain(tx: &mut dyn StoreTransaction, role: &QualifiedRole) -> StoreResult<String> {
    let is_system = role.domain.is_none() && tx.is_system_role(&role.name).await?;
    Ok(role.storage_domain(is_system))
}

async fn set_grant(
    tx: &mut dyn StoreTransaction,
    permission: PermissionId,
    subject: &Subject,
    allowed: bool,
) -> StoreResult<()> {
    match subject {
        Subject::Role(role) => {
            let domain = storage_domain(tx, role).await?;
            match tx.role_grant(permission, &role.name, &domain).await? {
                Some(existing) if existing == allowed => return Ok(()),
                Some(_) => {
                    tx.delete_role_grant(permission, &role.name, &domain).await?;
                }
                None => {}
            }
            tx.insert_role_grant(permission, &role.name, &domain, allowed)
                .await
        }
        Subject::User(user) => {
            match tx.user_grant(permission, user).await? {
                Some(existing) if existing == allowed => return Ok(()),
                Some(_) => {
                    tx.delete_user_grant(permission, user).await?;
                }
                None => {}
            }
            tx.insert_user_grant(permission, user, allowed).await
        }
    }
}
