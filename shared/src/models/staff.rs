//! Shop staff Model

use serde::{Deserialize, Serialize};

/// Staff role, ordered by authority (owner highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Barber,
    Manager,
    Admin,
    Owner,
}

impl StaffRole {
    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "barber" => Some(Self::Barber),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Barber => "barber",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Add / remove staff and change roles
    pub fn can_manage_staff(&self) -> bool {
        *self >= Self::Admin
    }

    /// Edit shop details
    pub fn can_edit_shop(&self) -> bool {
        *self >= Self::Admin
    }

    /// Create / edit / deactivate shop services
    pub fn can_manage_services(&self) -> bool {
        *self >= Self::Manager
    }

    /// Act on any booking of the shop (barbers only act on their own)
    pub fn can_manage_all_bookings(&self) -> bool {
        *self >= Self::Manager
    }

    /// Whether a member with this role may grant `target` to someone else.
    ///
    /// Owners grant admin and below; admins grant manager and below. The owner
    /// role itself is never granted.
    pub fn can_assign(&self, target: StaffRole) -> bool {
        if target == Self::Owner || !self.can_manage_staff() {
            return false;
        }
        match self {
            Self::Owner => true,
            _ => target < *self,
        }
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Staff member of a shop (joined with profile display fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShopStaff {
    pub id: String,
    pub shop_id: String,
    pub user_id: String,
    /// See [`StaffRole`]
    pub role: String,
    pub is_active: bool,
    pub bio: Option<String>,
    pub full_name: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: i64,
}

impl ShopStaff {
    pub fn role(&self) -> Option<StaffRole> {
        StaffRole::from_db(&self.role)
    }
}

/// Add staff payload (the user must already have a profile)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffCreate {
    pub email: String,
    pub role: StaffRole,
    pub bio: Option<String>,
}

/// Update staff payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffUpdate {
    pub role: Option<StaffRole>,
    pub is_active: Option<bool>,
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use StaffRole::*;

    #[test]
    fn test_role_ordering() {
        assert!(Owner > Admin);
        assert!(Admin > Manager);
        assert!(Manager > Barber);
    }

    #[test]
    fn test_permissions_by_tier() {
        assert!(Owner.can_manage_staff());
        assert!(Admin.can_manage_staff());
        assert!(!Manager.can_manage_staff());

        assert!(Admin.can_edit_shop());
        assert!(!Manager.can_edit_shop());

        assert!(Manager.can_manage_services());
        assert!(!Barber.can_manage_services());

        assert!(Manager.can_manage_all_bookings());
        assert!(!Barber.can_manage_all_bookings());
    }

    #[test]
    fn test_can_assign() {
        assert!(Owner.can_assign(Admin));
        assert!(Owner.can_assign(Barber));
        assert!(!Owner.can_assign(Owner));

        assert!(Admin.can_assign(Manager));
        assert!(Admin.can_assign(Barber));
        assert!(!Admin.can_assign(Admin));

        assert!(!Manager.can_assign(Barber));
        assert!(!Barber.can_assign(Barber));
    }

    #[test]
    fn test_db_round_trip() {
        for role in [Barber, Manager, Admin, Owner] {
            assert_eq!(StaffRole::from_db(role.as_db()), Some(role));
        }
        assert_eq!(StaffRole::from_db("stylist"), None);
        assert_eq!(serde_json::to_string(&Manager).unwrap(), "\"manager\"");
    }
}
