//! Shop signup deep link
//!
//! QR codes printed in a shop encode `happyinline://signup/shop/{shopId}`.
//! Scanning one opens the app on the shop's signup screen.

/// URL scheme registered by the mobile app
pub const SCHEME: &str = "happyinline";

const SIGNUP_SHOP_PATH: &str = "signup/shop/";

/// Build the signup link for a shop
pub fn shop_signup_link(shop_id: &str) -> String {
    format!("{SCHEME}://{SIGNUP_SHOP_PATH}{shop_id}")
}

/// Extract the shop id from a signup link
///
/// Accepts a trailing slash and ignores any query string. Returns `None` for
/// other schemes, other paths, or an empty id.
pub fn parse_shop_signup_link(link: &str) -> Option<&str> {
    let rest = link
        .trim()
        .strip_prefix(SCHEME)?
        .strip_prefix("://")?
        .strip_prefix(SIGNUP_SHOP_PATH)?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let id = rest.strip_suffix('/').unwrap_or(rest);
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(id)
}
