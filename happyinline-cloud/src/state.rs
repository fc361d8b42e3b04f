//! Application state for happyinline-cloud

use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;

use crate::auth::RateLimiter;
use crate::billing::BillingService;
use crate::billing::store::PgBillingStore;
use crate::config::Config;
use crate::email::EmailClient;
use crate::storage::ImageStorage;
use crate::stripe::StripeClient;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// JWT secret for user authentication
    pub jwt_secret: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Subscription billing (Stripe + profile rows)
    pub billing: BillingService,
    /// Transactional email
    pub email: EmailClient,
    /// Uploaded images
    pub images: ImageStorage,
    /// Rate limiter for sign-in routes
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let s3 = S3Client::new(&aws_config);

        let ses = if let Ok(ses_region) = std::env::var("SES_REGION") {
            let ses_config = aws_config
                .to_builder()
                .region(aws_config::Region::new(ses_region))
                .build();
            SesClient::new(&ses_config)
        } else {
            SesClient::new(&aws_config)
        };

        let billing = BillingService::new(
            Arc::new(StripeClient::new(
                config.stripe_secret_key.clone(),
                config.stripe_prices.clone(),
            )),
            Arc::new(PgBillingStore::new(pool.clone())),
        );

        Ok(Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            billing,
            email: EmailClient::new(ses, config.ses_from_email.clone()),
            images: ImageStorage::new(s3, config.image_s3_bucket.clone()),
            rate_limiter: RateLimiter::new(),
        })
    }
}
