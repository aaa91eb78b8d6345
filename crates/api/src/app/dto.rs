//! Request bodies and the few response shapes that are not plain domain
//! types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labstock_auth::{Identity, Permission, PermissionSet, SessionToken, UserStatus};
use labstock_core::Money;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub employee_id: String,
    pub secret: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: SessionToken,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user_id: String,
    pub employee_id: String,
    pub name: String,
    pub role: String,
}

impl From<&Identity> for WhoAmI {
    fn from(value: &Identity) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            employee_id: value.employee_id.clone(),
            name: value.name.clone(),
            role: value.role.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeSecretRequest {
    pub current: String,
    pub new_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct StockInRequest {
    pub quantity: u64,
    pub unit_cost: Money,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct StockOutRequest {
    pub quantity: u64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct KitCountRequest {
    pub count: u64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub employee_id: String,
    pub name: String,
    pub role: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub permissions: Vec<Permission>,
}

impl UpdateRoleRequest {
    pub fn permission_set(&self) -> PermissionSet {
        self.permissions.iter().copied().collect()
    }
}
