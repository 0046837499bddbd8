//! # Access Module
//!
//! The role capability table. Consulted once per request by the API layer;
//! handlers never re-derive permissions on their own.
//!
//! ```text
//! Action        admin   pharmacist   audit
//! ──────────    ─────   ──────────   ─────
//! CreateBill      ✓         ✓
//! CancelBill      ✓
//! ViewBill        ✓         ✓          ✓
//! ViewStock       ✓         ✓          ✓
//! ViewEvents      ✓                    ✓
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Pharmacist,
    Audit,
}

/// Something a caller may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    CreateBill,
    CancelBill,
    ViewBill,
    ViewStock,
    ViewEvents,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Pharmacist, Role::Audit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Pharmacist => "pharmacist",
            Role::Audit => "audit",
        }
    }

    /// Returns whether this role may perform `action`.
    ///
    /// ## Example
    /// ```rust
    /// use pharmos_core::access::{Action, Role};
    ///
    /// assert!(Role::Pharmacist.can(Action::CreateBill));
    /// assert!(!Role::Pharmacist.can(Action::CancelBill));
    /// assert!(!Role::Audit.can(Action::CreateBill));
    /// ```
    pub const fn can(&self, action: Action) -> bool {
        match self {
            Role::Admin => true,
            Role::Pharmacist => matches!(
                action,
                Action::CreateBill | Action::ViewBill | Action::ViewStock
            ),
            Role::Audit => matches!(
                action,
                Action::ViewBill | Action::ViewStock | Action::ViewEvents
            ),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "pharmacist" => Ok(Role::Pharmacist),
            "audit" => Ok(Role::Audit),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateBill => "createBill",
            Action::CancelBill => "cancelBill",
            Action::ViewBill => "viewBill",
            Action::ViewStock => "viewStock",
            Action::ViewEvents => "viewEvents",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_can_do_everything() {
        for action in [
            Action::CreateBill,
            Action::CancelBill,
            Action::ViewBill,
            Action::ViewStock,
            Action::ViewEvents,
        ] {
            assert!(Role::Admin.can(action), "admin denied {}", action);
        }
    }

    #[test]
    fn test_pharmacist_capabilities() {
        assert!(Role::Pharmacist.can(Action::CreateBill));
        assert!(Role::Pharmacist.can(Action::ViewBill));
        assert!(Role::Pharmacist.can(Action::ViewStock));
        assert!(!Role::Pharmacist.can(Action::CancelBill));
        assert!(!Role::Pharmacist.can(Action::ViewEvents));
    }

    #[test]
    fn test_audit_is_read_only() {
        assert!(Role::Audit.can(Action::ViewBill));
        assert!(Role::Audit.can(Action::ViewStock));
        assert!(Role::Audit.can(Action::ViewEvents));
        assert!(!Role::Audit.can(Action::CreateBill));
        assert!(!Role::Audit.can(Action::CancelBill));
    }

    #[test]
    fn test_role_parse() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(" Pharmacist ".parse::<Role>().unwrap(), Role::Pharmacist);
        assert!("cashier".parse::<Role>().is_err());
    }
}
