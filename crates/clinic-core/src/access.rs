//! # Access Matrix
//!
//! Maps roles to the areas of the application they may use.
//!
//! ```text
//!                 Patients Consult Prescr Inventory Procure Cash Staff Reports Admin
//!  admin             ✔        ✔       ✔       ✔        ✔      ✔    ✔      ✔      ✔
//!  doctor            ✔        ✔       ✔
//!  pharmacist        ✔                ✔       ✔
//!  cash_manager      ✔                                        ✔           ✔
//!  stock_manager                              ✔        ✔                  ✔
//! ```
//!
//! A user holding several roles reaches the union of their areas.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::types::Role;

/// A gated part of the application. Each HTTP route belongs to one area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Area {
    Patients,
    Consultations,
    Prescriptions,
    Inventory,
    Procurement,
    Cash,
    Staff,
    Reports,
    Admin,
}

impl Area {
    pub const ALL: &'static [Area] = &[
        Area::Patients,
        Area::Consultations,
        Area::Prescriptions,
        Area::Inventory,
        Area::Procurement,
        Area::Cash,
        Area::Staff,
        Area::Reports,
        Area::Admin,
    ];
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Area::Patients => "patients",
            Area::Consultations => "consultations",
            Area::Prescriptions => "prescriptions",
            Area::Inventory => "inventory",
            Area::Procurement => "procurement",
            Area::Cash => "cash",
            Area::Staff => "staff",
            Area::Reports => "reports",
            Area::Admin => "admin",
        };
        f.write_str(name)
    }
}

impl Role {
    /// Areas this single role reaches.
    pub fn areas(self) -> &'static [Area] {
        use Area::*;
        match self {
            Role::Admin => Area::ALL,
            Role::Doctor => &[Patients, Consultations, Prescriptions],
            Role::Pharmacist => &[Patients, Prescriptions, Inventory],
            Role::CashManager => &[Patients, Cash, Reports],
            Role::StockManager => &[Inventory, Procurement, Reports],
        }
    }
}

/// Whether any of `roles` reaches `area`.
pub fn can_access(roles: &[Role], area: Area) -> bool {
    roles.iter().any(|r| r.areas().contains(&area))
}

/// The union of areas reachable by `roles`, in menu order.
pub fn reachable_areas(roles: &[Role]) -> Vec<Area> {
    Area::ALL
        .iter()
        .copied()
        .filter(|a| can_access(roles, *a))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_reaches_everything() {
        assert_eq!(reachable_areas(&[Role::Admin]), Area::ALL.to_vec());
    }

    #[test]
    fn test_role_union() {
        let roles = [Role::Doctor, Role::CashManager];
        assert!(can_access(&roles, Area::Consultations));
        assert!(can_access(&roles, Area::Cash));
        assert!(!can_access(&roles, Area::Procurement));
        assert!(!can_access(&roles, Area::Admin));
    }

    #[test]
    fn test_no_roles_no_access() {
        assert!(reachable_areas(&[]).is_empty());
        assert!(!can_access(&[], Area::Patients));
    }

    #[test]
    fn test_only_admin_reaches_admin_and_staff() {
        for role in Role::ALL {
            let expected = *role == Role::Admin;
            assert_eq!(can_access(&[*role], Area::Admin), expected);
            assert_eq!(can_access(&[*role], Area::Staff), expected);
        }
    }
}
