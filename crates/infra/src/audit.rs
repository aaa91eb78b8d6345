//! Append-only audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_auth::Identity;
use labstock_core::{AggregateId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    LoginFailed,
    Logout,
    ItemDefined,
    ItemDeleted,
    ItemsImported,
    CategoryAdded,
    StockIn,
    StockOut,
    KitDefined,
    KitIssued,
    KitReturned,
    PurchaseOrderCommitted,
    PurchaseOrderDeleted,
    UserCreated,
    UserCreationReverted,
    UserStatusChanged,
    ProfileUpdated,
    SecretChanged,
    RoleUpdated,
}

/// Who did what to which record.
///
/// `actor` is `None` only for failed logins, where no identity was
/// established; `actor_name` then carries the attempted employee id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AggregateId,
    pub at: DateTime<Utc>,
    pub actor: Option<UserId>,
    pub actor_name: String,
    pub action: AuditAction,
    pub target: String,
    pub details: String,
}

impl AuditEntry {
    pub fn by(
        identity: &Identity,
        action: AuditAction,
        target: impl Into<String>,
        details: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AggregateId::new(),
            at,
            actor: Some(identity.user_id),
            actor_name: identity.name.clone(),
            action,
            target: target.into(),
            details: details.into(),
        }
    }

    pub fn anonymous(
        attempted: &str,
        action: AuditAction,
        details: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AggregateId::new(),
            at,
            actor: None,
            actor_name: attempted.to_string(),
            action,
            target: attempted.to_string(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_carry_identity_name() {
        let identity = Identity {
            user_id: UserId::new(),
            employee_id: "admin".to_string(),
            name: "System Admin".to_string(),
            role: "admin".to_string(),
        };
        let entry = AuditEntry::by(&identity, AuditAction::StockIn, "item-1", "qty 5", Utc::now());
        assert_eq!(entry.actor, Some(identity.user_id));
        assert_eq!(entry.actor_name, "System Admin");
        assert_eq!(serde_json::to_value(entry.action).unwrap(), "stock_in");
    }
}
