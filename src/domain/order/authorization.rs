use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregate::Order;

// ============================================================================
// Authorization Policy
// ============================================================================
//
// Decides whether a verified caller may perform an action on an order.
// The identity itself is established upstream; nothing here authenticates.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => f.write_str("customer"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "user" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A verified identity acting on the order domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn customer(user_id: Uuid) -> Self {
        Self { user_id, role: Role::Customer }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self { user_id, role: Role::Admin }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    View,
    Cancel,
    AdvanceStatus,
    Delete,
    ListAll,
}

impl OrderAction {
    /// Actions decided from the caller alone, before any order is loaded
    pub fn requires_privilege(self) -> bool {
        matches!(self, OrderAction::AdvanceStatus | OrderAction::Delete | OrderAction::ListAll)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

pub trait AuthorizationPolicy: Send + Sync {
    fn decide(&self, caller: &Caller, action: OrderAction, order: Option<&Order>) -> Decision;
}

/// Owners may read and cancel their own orders; admins may do everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerOrAdmin;

impl AuthorizationPolicy for OwnerOrAdmin {
    fn decide(&self, caller: &Caller, action: OrderAction, order: Option<&Order>) -> Decision {
        if caller.role.is_privileged() {
            return Decision::Allow;
        }

        if action.requires_privilege() {
            return Decision::Deny("admin role required");
        }

        match order {
            Some(order) if order.is_owned_by(caller.user_id) => Decision::Allow,
            Some(_) => Decision::Deny("only the order owner or an admin may do this"),
            None => Decision::Deny("order context required"),
        }
    }
}
