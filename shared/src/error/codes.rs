//! Unified error codes for HappyInline
//!
//! Error codes are shared by the cloud service and the mobile app, organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Shop errors
//! - 4xxx: Booking errors
//! - 5xxx: Billing / payment errors
//! - 6xxx: Service catalog errors
//! - 8xxx: Staff errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Too many requests
    TooManyRequests = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1005,
    /// Verification code expired
    VerificationCodeExpired = 1006,
    /// Verification code invalid
    VerificationCodeInvalid = 1007,
    /// Too many verification attempts
    TooManyAttempts = 1008,
    /// Password too short
    PasswordTooShort = 1009,
    /// Email already registered
    EmailAlreadyRegistered = 1010,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific staff role required
    RoleRequired = 2002,
    /// Caller is not staff of this shop
    NotShopStaff = 2003,

    // ==================== 3xxx: Shop ====================
    /// Shop not found
    ShopNotFound = 3001,
    /// Shop is not active
    ShopInactive = 3002,
    /// Shop signup link is malformed
    InvalidShopLink = 3003,

    // ==================== 4xxx: Booking ====================
    /// Booking not found
    BookingNotFound = 4001,
    /// Status transition not allowed from the current status
    BookingInvalidTransition = 4002,
    /// Appointment time is in the past
    BookingInPast = 4003,
    /// Barber already has a booking in that slot
    BookingSlotTaken = 4004,
    /// Booking has no services
    BookingEmpty = 4005,
    /// Appointment already started, customer can no longer cancel
    BookingAlreadyStarted = 4006,

    // ==================== 5xxx: Billing ====================
    /// Payment processing failed
    PaymentFailed = 5001,
    /// Payment provider setup failed (Stripe customer, subscription)
    PaymentSetupFailed = 5002,
    /// Profile has no active subscription
    NoActiveSubscription = 5003,
    /// Profile already has an active subscription
    SubscriptionAlreadyActive = 5004,
    /// Subscription is already cancelled or refunded
    SubscriptionAlreadyCancelled = 5005,
    /// Requested plan is not an upgrade of the current plan
    InvalidPlanUpgrade = 5006,
    /// Refund window has closed
    RefundWindowExpired = 5007,
    /// Unknown subscription plan
    PlanNotFound = 5008,
    /// Plan quota (barbers) reached
    PlanLimitReached = 5009,

    // ==================== 6xxx: Service catalog ====================
    /// Shop service not found
    ServiceNotFound = 6001,
    /// Service has invalid price
    ServiceInvalidPrice = 6002,
    /// Service has invalid duration
    ServiceInvalidDuration = 6003,
    /// Service is not offered (inactive)
    ServiceInactive = 6004,
    /// Catalog template not found
    CatalogServiceNotFound = 6101,

    // ==================== 65xx: File Upload ====================
    /// File too large
    FileTooLarge = 6501,
    /// Unsupported file format
    UnsupportedFileFormat = 6502,
    /// Invalid/corrupted image file
    InvalidImageFile = 6503,
    /// No file provided in request
    NoFileProvided = 6504,
    /// File storage failed
    FileStorageFailed = 6509,

    // ==================== 8xxx: Staff ====================
    /// Staff member not found
    StaffNotFound = 8001,
    /// User is already staff of this shop
    StaffAlreadyExists = 8002,
    /// Owner row cannot be changed or removed
    CannotModifyOwner = 8003,
    /// Cannot change own role
    CannotModifySelf = 8004,
    /// Profile not found
    ProfileNotFound = 8005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// Upstream provider (Stripe, S3, SES) error
    UpstreamError = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::VerificationCodeExpired => "Verification code has expired",
            ErrorCode::VerificationCodeInvalid => "Invalid verification code",
            ErrorCode::TooManyAttempts => "Too many attempts",
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",
            ErrorCode::EmailAlreadyRegistered => "Email is already registered",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "A higher staff role is required",
            ErrorCode::NotShopStaff => "Not a staff member of this shop",

            // Shop
            ErrorCode::ShopNotFound => "Shop not found",
            ErrorCode::ShopInactive => "Shop is not active",
            ErrorCode::InvalidShopLink => "Invalid shop signup link",

            // Booking
            ErrorCode::BookingNotFound => "Booking not found",
            ErrorCode::BookingInvalidTransition => "Booking status change is not allowed",
            ErrorCode::BookingInPast => "Appointment time must be in the future",
            ErrorCode::BookingSlotTaken => "Barber is not available at that time",
            ErrorCode::BookingEmpty => "Booking must include at least one service",
            ErrorCode::BookingAlreadyStarted => "Appointment has already started",

            // Billing
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::PaymentSetupFailed => "Payment setup failed",
            ErrorCode::NoActiveSubscription => "No active subscription",
            ErrorCode::SubscriptionAlreadyActive => "Subscription is already active",
            ErrorCode::SubscriptionAlreadyCancelled => "Subscription is already cancelled",
            ErrorCode::InvalidPlanUpgrade => "Requested plan is not an upgrade",
            ErrorCode::RefundWindowExpired => "Refund window has expired",
            ErrorCode::PlanNotFound => "Subscription plan not found",
            ErrorCode::PlanLimitReached => "Subscription plan limit reached",

            // Service catalog
            ErrorCode::ServiceNotFound => "Service not found",
            ErrorCode::ServiceInvalidPrice => "Service has invalid price",
            ErrorCode::ServiceInvalidDuration => "Service has invalid duration",
            ErrorCode::ServiceInactive => "Service is not offered",
            ErrorCode::CatalogServiceNotFound => "Catalog service not found",

            // File Upload
            ErrorCode::FileTooLarge => "File too large",
            ErrorCode::UnsupportedFileFormat => "Unsupported file format",
            ErrorCode::InvalidImageFile => "Invalid image file",
            ErrorCode::NoFileProvided => "No file provided",
            ErrorCode::FileStorageFailed => "File storage failed",

            // Staff
            ErrorCode::StaffNotFound => "Staff member not found",
            ErrorCode::StaffAlreadyExists => "User is already staff of this shop",
            ErrorCode::CannotModifyOwner => "Cannot modify the shop owner",
            ErrorCode::CannotModifySelf => "Cannot change your own role",
            ErrorCode::ProfileNotFound => "Profile not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::UpstreamError => "Upstream provider error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::TooManyRequests),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1005 => Ok(ErrorCode::AccountDisabled),
            1006 => Ok(ErrorCode::VerificationCodeExpired),
            1007 => Ok(ErrorCode::VerificationCodeInvalid),
            1008 => Ok(ErrorCode::TooManyAttempts),
            1009 => Ok(ErrorCode::PasswordTooShort),
            1010 => Ok(ErrorCode::EmailAlreadyRegistered),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::NotShopStaff),

            // Shop
            3001 => Ok(ErrorCode::ShopNotFound),
            3002 => Ok(ErrorCode::ShopInactive),
            3003 => Ok(ErrorCode::InvalidShopLink),

            // Booking
            4001 => Ok(ErrorCode::BookingNotFound),
            4002 => Ok(ErrorCode::BookingInvalidTransition),
            4003 => Ok(ErrorCode::BookingInPast),
            4004 => Ok(ErrorCode::BookingSlotTaken),
            4005 => Ok(ErrorCode::BookingEmpty),
            4006 => Ok(ErrorCode::BookingAlreadyStarted),

            // Billing
            5001 => Ok(ErrorCode::PaymentFailed),
            5002 => Ok(ErrorCode::PaymentSetupFailed),
            5003 => Ok(ErrorCode::NoActiveSubscription),
            5004 => Ok(ErrorCode::SubscriptionAlreadyActive),
            5005 => Ok(ErrorCode::SubscriptionAlreadyCancelled),
            5006 => Ok(ErrorCode::InvalidPlanUpgrade),
            5007 => Ok(ErrorCode::RefundWindowExpired),
            5008 => Ok(ErrorCode::PlanNotFound),
            5009 => Ok(ErrorCode::PlanLimitReached),

            // Service catalog
            6001 => Ok(ErrorCode::ServiceNotFound),
            6002 => Ok(ErrorCode::ServiceInvalidPrice),
            6003 => Ok(ErrorCode::ServiceInvalidDuration),
            6004 => Ok(ErrorCode::ServiceInactive),
            6101 => Ok(ErrorCode::CatalogServiceNotFound),

            // File Upload
            6501 => Ok(ErrorCode::FileTooLarge),
            6502 => Ok(ErrorCode::UnsupportedFileFormat),
            6503 => Ok(ErrorCode::InvalidImageFile),
            6504 => Ok(ErrorCode::NoFileProvided),
            6509 => Ok(ErrorCode::FileStorageFailed),

            // Staff
            8001 => Ok(ErrorCode::StaffNotFound),
            8002 => Ok(ErrorCode::StaffAlreadyExists),
            8003 => Ok(ErrorCode::CannotModifyOwner),
            8004 => Ok(ErrorCode::CannotModifySelf),
            8005 => Ok(ErrorCode::ProfileNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::UpstreamError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::ShopNotFound.code(), 3001);
        assert_eq!(ErrorCode::BookingInvalidTransition.code(), 4002);
        assert_eq!(ErrorCode::RefundWindowExpired.code(), 5007);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_u16() {
        assert_eq!(ErrorCode::try_from(4004), Ok(ErrorCode::BookingSlotTaken));
        assert_eq!(ErrorCode::try_from(5006), Ok(ErrorCode::InvalidPlanUpgrade));
        assert_eq!(ErrorCode::try_from(7001), Err(InvalidErrorCode(7001)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::BookingNotFound).unwrap();
        assert_eq!(json, "4001");

        let code: ErrorCode = serde_json::from_str("8003").unwrap();
        assert_eq!(code, ErrorCode::CannotModifyOwner);

        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
    }
}
