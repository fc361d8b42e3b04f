/// One day in milliseconds
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// One minute in milliseconds
pub const MINUTE_MS: i64 = 60 * 1000;

/// Current UTC timestamp (milliseconds)
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// New UUID v4 resource id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whole days elapsed between two millisecond timestamps (never negative)
pub fn days_between(from: i64, to: i64) -> i64 {
    ((to - from) / DAY_MS).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_between() {
        assert_eq!(days_between(0, 15 * DAY_MS), 15);
        assert_eq!(days_between(0, 15 * DAY_MS - 1), 14);
        assert_eq!(days_between(10 * DAY_MS, 0), 0);
    }

    #[test]
    fn test_new_id_is_uuid() {
        let id = new_id();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_ne!(id, new_id());
    }
}
