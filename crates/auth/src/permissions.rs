use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Operation label a role may be granted.
///
/// This is a closed set: every ledger, kit, procurement and administrative call
/// names exactly one of these. Labels serialize as their display names
/// (e.g. `"Stock Operations"`), which is also how role definitions are stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "Dashboard")]
    Dashboard,
    #[serde(rename = "Inventory")]
    Inventory,
    #[serde(rename = "Stock Operations")]
    StockOperations,
    #[serde(rename = "Kits")]
    Kits,
    #[serde(rename = "Reports")]
    Reports,
    #[serde(rename = "Shopping List")]
    ShoppingList,
    #[serde(rename = "Purchase Orders")]
    PurchaseOrders,
    #[serde(rename = "User Management")]
    UserManagement,
    #[serde(rename = "Audit Logs")]
    AuditLogs,
    #[serde(rename = "Settings")]
    Settings,
}

impl Permission {
    pub const ALL: [Permission; 10] = [
        Permission::Dashboard,
        Permission::Inventory,
        Permission::StockOperations,
        Permission::Kits,
        Permission::Reports,
        Permission::ShoppingList,
        Permission::PurchaseOrders,
        Permission::UserManagement,
        Permission::AuditLogs,
        Permission::Settings,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Permission::Dashboard => "Dashboard",
            Permission::Inventory => "Inventory",
            Permission::StockOperations => "Stock Operations",
            Permission::Kits => "Kits",
            Permission::Reports => "Reports",
            Permission::ShoppingList => "Shopping List",
            Permission::PurchaseOrders => "Purchase Orders",
            Permission::UserManagement => "User Management",
            Permission::AuditLogs => "Audit Logs",
            Permission::Settings => "Settings",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.label() == label)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Typed set of granted permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Permission::ALL.into_iter().collect()
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for p in Permission::ALL {
            assert_eq!(Permission::from_label(p.label()), Some(p));
        }
        assert_eq!(Permission::from_label("Theme"), None);
    }

    #[test]
    fn serializes_with_display_labels() {
        let set: PermissionSet = [Permission::StockOperations, Permission::Dashboard]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["Dashboard","Stock Operations"]"#);
    }

    #[test]
    fn unknown_labels_fail_to_deserialize() {
        let res: Result<PermissionSet, _> = serde_json::from_str(r#"["Dashboard","Root"]"#);
        assert!(res.is_err());
    }
}
