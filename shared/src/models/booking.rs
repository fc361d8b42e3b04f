//! Booking Model
//!
//! The booking lifecycle is an explicit state machine:
//!
//! ```text
//! pending ──► confirmed ──► completed
//!    │            │
//!    ├──► rejected└──► cancelled
//!    └──► cancelled
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Requested by the customer, awaiting shop decision
    Pending,
    /// Accepted by the shop
    Confirmed,
    /// Declined by the shop
    Rejected,
    /// Service delivered
    Completed,
    /// Withdrawn by the customer or the shop
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::Rejected,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Database values of every status that holds a barber's time slot
    pub fn slot_holding() -> Vec<&'static str> {
        Self::ALL
            .into_iter()
            .filter(Self::occupies_slot)
            .map(|s| s.as_db())
            .collect()
    }

    /// Parse from database string value (lowercase)
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "rejected" => Some(Self::Rejected),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Database string representation (lowercase)
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether `self -> next` is an allowed edge
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
        )
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Cancelled)
    }

    /// Statuses that hold a barber's time slot
    pub fn occupies_slot(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Booking entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Booking {
    pub id: String,
    /// Human-friendly reference shown to customers (e.g. `HI-7K2QXD`)
    pub reference: String,
    pub shop_id: String,
    pub customer_id: String,
    /// Assigned barber (profile id), None = any available staff
    pub barber_id: Option<String>,
    /// Shop service ids included in this booking
    pub service_ids: Vec<String>,
    /// Appointment start (Unix millis)
    pub appointment_at: i64,
    pub duration_minutes: i32,
    pub total_amount: Decimal,
    /// See [`BookingStatus`]
    pub status: String,
    pub customer_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub confirmed_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Booking {
    /// Parsed status (None if the row holds an unknown value)
    pub fn status(&self) -> Option<BookingStatus> {
        BookingStatus::from_db(&self.status)
    }

    /// Appointment end (Unix millis)
    pub fn ends_at(&self) -> i64 {
        self.appointment_at + i64::from(self.duration_minutes) * 60_000
    }
}

/// Create booking payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreate {
    pub shop_id: String,
    pub service_ids: Vec<String>,
    pub barber_id: Option<String>,
    pub appointment_at: i64,
    pub customer_notes: Option<String>,
}

/// Optional reason attached to reject / cancel actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingStatusChange {
    pub reason: Option<String>,
}

/// Generate a booking reference: `HI-` + 6 uppercase alphanumerics
///
/// Ambiguous glyphs (0/O, 1/I) are excluded so the code can be read aloud.
pub fn generate_reference() -> String {
    use rand::Rng;
    const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    let code: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("HI-{code}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALL: [BookingStatus; 5] = BookingStatus::ALL;

    #[test]
    fn test_allowed_transitions() {
        let allowed = [
            (Pending, Confirmed),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Confirmed, Completed),
            (Confirmed, Cancelled),
        ];
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(ALL.iter().all(|to| !from.can_transition_to(*to)));
        }
        assert!(!Pending.is_terminal());
        assert!(!Confirmed.is_terminal());
        assert!(Pending.occupies_slot() && Confirmed.occupies_slot());
        assert!(ALL.iter().filter(|s| s.is_terminal()).all(|s| !s.occupies_slot()));
        assert_eq!(BookingStatus::slot_holding(), vec!["pending", "confirmed"]);
    }

    #[test]
    fn test_db_round_trip() {
        for status in ALL {
            assert_eq!(BookingStatus::from_db(status.as_db()), Some(status));
        }
        assert_eq!(BookingStatus::from_db("no_show"), None);
    }

    #[test]
    fn test_serde_matches_db_strings() {
        let json = serde_json::to_string(&Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
    }

    #[test]
    fn test_generate_reference() {
        let reference = generate_reference();
        assert_eq!(reference.len(), 9);
        assert!(reference.starts_with("HI-"));
        assert!(
            reference[3..]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
        assert!(!reference[3..].contains(['0', 'O', '1', 'I']));
    }

    #[test]
    fn test_ends_at() {
        let booking = Booking {
            id: "b1".into(),
            reference: "HI-AAAAAA".into(),
            shop_id: "s1".into(),
            customer_id: "c1".into(),
            barber_id: None,
            service_ids: vec!["svc".into()],
            appointment_at: 1_000_000,
            duration_minutes: 45,
            total_amount: Decimal::new(3000, 2),
            status: "pending".into(),
            customer_notes: None,
            rejection_reason: None,
            cancellation_reason: None,
            cancelled_by: None,
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(booking.ends_at(), 1_000_000 + 45 * 60_000);
        assert_eq!(booking.status(), Some(Pending));
    }
}
