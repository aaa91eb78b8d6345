//! Sessions, the permission gate and the user/role directory.

use tracing::{debug, info, instrument, warn};

use labstock_auth::{
    CredentialStore, Identity, Permission, PermissionSet, ProfileUpdate, Role, Session,
    SessionToken, User, UserStatus, ADMIN_ROLE, authorize, validate_secret,
};
use labstock_core::{ExpectedVersion, UserId};

use super::InventoryEngine;
use crate::audit::{AuditAction, AuditEntry};
use crate::error::EngineError;
use crate::store::{ChangeSet, LedgerStore, Mutation};

impl<S, C> InventoryEngine<S, C>
where
    S: LedgerStore,
    C: CredentialStore,
{
    /// Exchange an employee id and secret for a session.
    ///
    /// Unknown ids, wrong secrets and suspended accounts all fail the same
    /// way; the audit entry records which it was.
    #[instrument(skip(self, secret))]
    pub fn login(&self, employee_id: &str, secret: &str) -> Result<Session, EngineError> {
        let now = self.now();
        let employee_id = employee_id.trim();

        let user = self.store.user_by_employee_id(employee_id)?.map(|r| r.value);
        let verified = self.credentials.verify_credential(employee_id, secret)?;

        let user = match user {
            Some(user) if verified && user.is_active() => user,
            other => {
                let reason = match other {
                    None => "unknown employee id",
                    Some(u) if !u.is_active() => "account suspended",
                    Some(_) => "wrong secret",
                };
                warn!(employee_id, reason, "login rejected");
                let mut changes = ChangeSet::new();
                changes.audit(AuditEntry::anonymous(
                    employee_id,
                    AuditAction::LoginFailed,
                    reason,
                    now,
                ));
                self.store.commit(changes)?;
                return Err(EngineError::Unauthenticated);
            }
        };

        let session = Session::issue(user.id, now, self.session_ttl);
        self.sessions.insert(session.clone())?;

        let mut changes = ChangeSet::new();
        changes.audit(AuditEntry::by(
            &user.identity(),
            AuditAction::Login,
            &user.employee_id,
            "",
            now,
        ));
        self.store.commit(changes)?;

        info!(employee_id, "logged in");
        Ok(session)
    }

    /// Resolve a token to the identity behind it, sliding its expiry.
    pub fn validate(&self, token: &SessionToken) -> Result<Identity, EngineError> {
        let now = self.now();
        let validated = self.sessions.validate(token, now, self.session_ttl)?;
        if validated.purged > 0 {
            debug!(purged = validated.purged, "expired sessions purged");
        }

        let session = validated.session.ok_or(EngineError::Unauthenticated)?;
        match self.store.user(session.user_id)? {
            Some(record) if record.value.is_active() => Ok(record.value.identity()),
            _ => {
                self.sessions.revoke(token)?;
                Err(EngineError::Unauthenticated)
            }
        }
    }

    #[instrument(skip(self, token))]
    pub fn logout(&self, token: &SessionToken) -> Result<(), EngineError> {
        let Some(session) = self.sessions.revoke(token)? else {
            return Ok(());
        };
        if let Some(record) = self.store.user(session.user_id)? {
            let mut changes = ChangeSet::new();
            changes.audit(AuditEntry::by(
                &record.value.identity(),
                AuditAction::Logout,
                &record.value.employee_id,
                "",
                self.now(),
            ));
            self.store.commit(changes)?;
        }
        Ok(())
    }

    /// Check `identity`'s role against `permission`.
    ///
    /// The role is read fresh on every call, so registry updates apply to
    /// live sessions immediately.
    pub fn authorize(&self, identity: &Identity, permission: Permission) -> Result<(), EngineError> {
        let role = self
            .store
            .role(&identity.role)?
            .map(|r| r.value)
            .ok_or_else(|| EngineError::PermissionDenied(format!("unknown role '{}'", identity.role)))?;

        authorize(identity, &role, permission).map_err(|err| {
            warn!(
                employee_id = %identity.employee_id,
                role = %identity.role,
                permission = permission.label(),
                "permission denied"
            );
            err.into()
        })
    }

    #[instrument(skip(self, actor, secret), fields(actor = %actor.employee_id))]
    pub fn create_user(
        &self,
        actor: &Identity,
        employee_id: &str,
        name: &str,
        role: &str,
        secret: &str,
    ) -> Result<User, EngineError> {
        self.authorize(actor, Permission::UserManagement)?;
        validate_secret(secret)?;

        let user = User::new(employee_id, name, role)?;
        if self.store.role(&user.role)?.is_none() {
            return Err(EngineError::NotFound {
                entity: "role",
                id: user.role.clone(),
            });
        }

        let mut changes = ChangeSet::new();
        changes.push(Mutation::PutUser {
            user: user.clone(),
            expected: ExpectedVersion::Absent,
        });
        changes.audit(AuditEntry::by(
            actor,
            AuditAction::UserCreated,
            &user.employee_id,
            format!("role {}", user.role),
            self.now(),
        ));
        self.store.commit(changes)?;

        // The account must not outlive a credential that was never stored.
        if let Err(err) = self.credentials.set_credential(&user.employee_id, secret) {
            warn!(employee_id = %user.employee_id, error = %err, "credential not stored; reverting user");
            self.revert_user(actor, &user, &err.to_string())?;
            return Err(err.into());
        }

        info!(employee_id = %user.employee_id, role = %user.role, "user created");
        Ok(user)
    }

    fn revert_user(&self, actor: &Identity, user: &User, reason: &str) -> Result<(), EngineError> {
        self.retry.run("revert_user", |_| {
            let Some(record) = self.store.user(user.id)? else {
                return Ok(());
            };
            let mut changes = ChangeSet::new();
            changes.push(Mutation::RemoveUser {
                user_id: user.id,
                expected: ExpectedVersion::Exact(record.revision),
            });
            changes.audit(AuditEntry::by(
                actor,
                AuditAction::UserCreationReverted,
                &user.employee_id,
                reason,
                self.now(),
            ));
            self.store.commit(changes)?;
            Ok(())
        })
    }

    pub fn list_users(&self, actor: &Identity) -> Result<Vec<User>, EngineError> {
        self.authorize(actor, Permission::UserManagement)?;
        Ok(self.store.users()?)
    }

    /// Change the caller's own secret. Needs no permission beyond a valid
    /// session, but the current secret must be presented again.
    #[instrument(skip(self, actor, current, new_secret), fields(actor = %actor.employee_id))]
    pub fn change_secret(
        &self,
        actor: &Identity,
        current: &str,
        new_secret: &str,
    ) -> Result<(), EngineError> {
        if !self.credentials.verify_credential(&actor.employee_id, current)? {
            return Err(EngineError::Unauthenticated);
        }
        self.credentials.set_credential(&actor.employee_id, new_secret)?;

        let mut changes = ChangeSet::new();
        changes.audit(AuditEntry::by(
            actor,
            AuditAction::SecretChanged,
            &actor.employee_id,
            "",
            self.now(),
        ));
        self.store.commit(changes)?;
        Ok(())
    }

    /// The caller's own directory record, profile included.
    pub fn profile(&self, actor: &Identity) -> Result<User, EngineError> {
        self.store
            .user(actor.user_id)?
            .map(|record| record.value)
            .ok_or_else(|| EngineError::NotFound {
                entity: "user",
                id: actor.user_id.to_string(),
            })
    }

    /// Edit the caller's own name and personal details. Needs no permission
    /// beyond a valid session.
    #[instrument(skip(self, actor, update), fields(actor = %actor.employee_id))]
    pub fn update_profile(
        &self,
        actor: &Identity,
        update: &ProfileUpdate,
    ) -> Result<User, EngineError> {
        let user = self.retry.run("update_profile", |_| {
            let now = self.now();
            let record = self.store.user(actor.user_id)?.ok_or_else(|| EngineError::NotFound {
                entity: "user",
                id: actor.user_id.to_string(),
            })?;
            let mut user = record.value;
            let changed = user.apply_profile(update, now.date_naive())?;
            if changed.is_empty() {
                return Err(EngineError::InvalidArgument("profile is unchanged".to_string()));
            }

            let details = if changed == ["picture"] {
                "changed profile picture".to_string()
            } else {
                format!("updated {}", changed.join(", "))
            };
            let mut changes = ChangeSet::new();
            changes.push(Mutation::PutUser {
                user: user.clone(),
                expected: ExpectedVersion::Exact(record.revision),
            });
            changes.audit(AuditEntry::by(
                actor,
                AuditAction::ProfileUpdated,
                &user.employee_id,
                details,
                now,
            ));
            self.store.commit(changes)?;
            Ok(user)
        })?;

        info!(employee_id = %user.employee_id, "profile updated");
        Ok(user)
    }

    /// Suspend or reactivate a user. Suspension ends every live session of
    /// that user.
    #[instrument(skip(self, actor), fields(actor = %actor.employee_id))]
    pub fn set_user_status(
        &self,
        actor: &Identity,
        user_id: UserId,
        status: UserStatus,
    ) -> Result<User, EngineError> {
        self.authorize(actor, Permission::UserManagement)?;
        if user_id == actor.user_id {
            return Err(EngineError::InvalidArgument(
                "cannot change the status of your own account".to_string(),
            ));
        }

        let user = self.retry.run("set_user_status", |_| {
            let record = self.store.user(user_id)?.ok_or_else(|| EngineError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })?;
            let mut user = record.value;
            user.status = status;

            let mut changes = ChangeSet::new();
            changes.push(Mutation::PutUser {
                user: user.clone(),
                expected: ExpectedVersion::Exact(record.revision),
            });
            changes.audit(AuditEntry::by(
                actor,
                AuditAction::UserStatusChanged,
                &user.employee_id,
                status.to_string(),
                self.now(),
            ));
            self.store.commit(changes)?;
            Ok(user)
        })?;

        if status == UserStatus::Suspended {
            let revoked = self.sessions.revoke_user(user_id)?;
            debug!(revoked, "sessions revoked for suspended user");
        }
        Ok(user)
    }

    /// Replace the permission set of an existing role.
    ///
    /// The admin role always keeps `User Management`, otherwise nobody could
    /// ever edit roles again.
    #[instrument(skip(self, actor, permissions), fields(actor = %actor.employee_id))]
    pub fn update_role(
        &self,
        actor: &Identity,
        name: &str,
        permissions: PermissionSet,
    ) -> Result<Role, EngineError> {
        self.authorize(actor, Permission::UserManagement)?;
        if name == ADMIN_ROLE && !permissions.contains(Permission::UserManagement) {
            return Err(EngineError::InvalidArgument(
                "the admin role cannot lose User Management".to_string(),
            ));
        }

        let details = permissions
            .iter()
            .map(|p| p.label())
            .collect::<Vec<_>>()
            .join(", ");

        self.retry.run("update_role", |_| {
            let record = self.store.role(name)?.ok_or_else(|| EngineError::NotFound {
                entity: "role",
                id: name.to_string(),
            })?;
            let role = record.value.with_permissions(permissions.clone());

            let mut changes = ChangeSet::new();
            changes.push(Mutation::PutRole {
                role: role.clone(),
                expected: ExpectedVersion::Exact(record.revision),
            });
            changes.audit(AuditEntry::by(
                actor,
                AuditAction::RoleUpdated,
                name,
                details.clone(),
                self.now(),
            ));
            self.store.commit(changes)?;
            info!(role = name, "role updated");
            Ok(role)
        })
    }

    pub fn list_roles(&self, actor: &Identity) -> Result<Vec<Role>, EngineError> {
        self.authorize(actor, Permission::UserManagement)?;
        Ok(self.store.roles()?)
    }
}
