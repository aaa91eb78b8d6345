use serde::{Deserialize, Serialize};

use labstock_core::{DomainError, DomainResult};

use crate::permissions::{Permission, PermissionSet};

/// Role name used as the key of the role registry.
pub const ADMIN_ROLE: &str = "admin";
pub const ASSISTANT_ROLE: &str = "assistant";

/// Role definition: a name plus the typed set of operations it may invoke.
///
/// Roles are ordinary persisted data; the two built-ins below are only the
/// bootstrap seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    name: String,
    permissions: PermissionSet,
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: PermissionSet) -> DomainResult<Self> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid("role name cannot be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            permissions,
        })
    }

    /// Full access, including user management and audit logs.
    pub fn admin() -> Self {
        Self {
            name: ADMIN_ROLE.to_string(),
            permissions: PermissionSet::all(),
        }
    }

    /// Day-to-day lab operations without administration.
    pub fn assistant() -> Self {
        Self {
            name: ASSISTANT_ROLE.to_string(),
            permissions: [
                Permission::Dashboard,
                Permission::Inventory,
                Permission::StockOperations,
                Permission::Kits,
                Permission::Reports,
                Permission::ShoppingList,
                Permission::PurchaseOrders,
            ]
            .into_iter()
            .collect(),
        }
    }

    pub fn defaults() -> Vec<Role> {
        vec![Self::admin(), Self::assistant()]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn permits(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }

    pub fn with_permissions(&self, permissions: PermissionSet) -> Self {
        Self {
            name: self.name.clone(),
            permissions,
        }
    }
}
