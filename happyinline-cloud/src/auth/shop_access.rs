//! Per-shop role checks

use shared::error::{AppError, ErrorCode};
use shared::models::{ShopStaff, StaffRole};
use sqlx::PgPool;

use crate::db;
use crate::error::ServiceResult;

/// Caller's membership in a shop, with the role parsed
#[derive(Debug, Clone)]
pub struct ShopMember {
    pub staff: ShopStaff,
    pub role: StaffRole,
}

/// Check an (optional) membership row against a minimum role
pub fn authorize(staff: Option<ShopStaff>, min_role: StaffRole) -> Result<ShopMember, AppError> {
    let staff = staff
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::new(ErrorCode::NotShopStaff))?;
    let role = staff
        .role()
        .ok_or_else(|| AppError::internal(format!("unknown staff role {}", staff.role)))?;
    if role < min_role {
        return Err(AppError::new(ErrorCode::RoleRequired).with_detail("required", min_role.as_db()));
    }
    Ok(ShopMember { staff, role })
}

/// Load the caller's membership and require at least `min_role`
pub async fn require_role(
    pool: &PgPool,
    shop_id: &str,
    user_id: &str,
    min_role: StaffRole,
) -> ServiceResult<ShopMember> {
    let staff = db::staff::find(pool, shop_id, user_id).await?;
    Ok(authorize(staff, min_role)?)
}

/// Any active member of the shop
pub async fn require_staff(pool: &PgPool, shop_id: &str, user_id: &str) -> ServiceResult<ShopMember> {
    require_role(pool, shop_id, user_id, StaffRole::Barber).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: &str, is_active: bool) -> ShopStaff {
        ShopStaff {
            id: "st1".into(),
            shop_id: "shop1".into(),
            user_id: "u1".into(),
            role: role.into(),
            is_active,
            bio: None,
            full_name: None,
            email: "u1@example.com".into(),
            avatar_url: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_non_member_rejected() {
        let err = authorize(None, StaffRole::Barber).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotShopStaff);
    }

    #[test]
    fn test_inactive_member_rejected() {
        let err = authorize(Some(member("admin", false)), StaffRole::Barber).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotShopStaff);
    }

    #[test]
    fn test_role_threshold() {
        let err = authorize(Some(member("barber", true)), StaffRole::Manager).unwrap_err();
        assert_eq!(err.code, ErrorCode::RoleRequired);

        let ok = authorize(Some(member("admin", true)), StaffRole::Manager).unwrap();
        assert_eq!(ok.role, StaffRole::Admin);
    }
}
