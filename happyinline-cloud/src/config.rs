//! Cloud service configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stripe Price ids, one per paid plan
#[derive(Debug, Clone)]
pub struct StripePrices {
    pub basic: String,
    pub professional: String,
    pub enterprise: String,
    pub unlimited: String,
}

/// Cloud service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// JWT secret for user authentication
    pub jwt_secret: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Stripe Price ids per plan
    pub stripe_prices: StripePrices,
    /// SES sender email address
    pub ses_from_email: String,
    /// S3 bucket for uploaded images
    pub image_s3_bucket: String,
    /// Allowed CORS origin (any origin when unset)
    pub cors_allowed_origin: Option<String>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            stripe_prices: StripePrices {
                basic: Self::require_secret("STRIPE_PRICE_BASIC", &environment)?,
                professional: Self::require_secret("STRIPE_PRICE_PROFESSIONAL", &environment)?,
                enterprise: Self::require_secret("STRIPE_PRICE_ENTERPRISE", &environment)?,
                unlimited: Self::require_secret("STRIPE_PRICE_UNLIMITED", &environment)?,
            },
            ses_from_email: std::env::var("SES_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@happyinline.app".into()),
            image_s3_bucket: std::env::var("IMAGE_S3_BUCKET")
                .unwrap_or_else(|_| "happyinline-images".into()),
            cors_allowed_origin: std::env::var("CORS_ALLOWED_ORIGIN")
                .ok()
                .filter(|s| !s.is_empty()),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
