//! Stripe integration via REST API (no SDK dependency)
//!
//! [`StripeGateway`] is the seam the billing service calls: one method per
//! server-side billing function. [`StripeClient`] is the live implementation,
//! holding the secret key so it never reaches a client.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sha2::Sha256;
use shared::error::{AppError, ErrorCode};
use shared::models::SubscriptionPlan;

use crate::config::StripePrices;

const API_BASE: &str = "https://api.stripe.com/v1";

/// Stripe call failure
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Stripe API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("Unexpected Stripe response: {0}")]
    UnexpectedResponse(String),
}

impl From<StripeError> for AppError {
    fn from(e: StripeError) -> Self {
        match e {
            // 402: card declined / payment required
            StripeError::Api {
                status: 402,
                message,
                ..
            } => AppError::with_message(ErrorCode::PaymentFailed, message),
            StripeError::Api {
                status: 400,
                code: Some(code),
                message,
            } if code.starts_with("payment_method") || code.starts_with("card") => {
                AppError::with_message(ErrorCode::PaymentSetupFailed, message)
            }
            other => {
                tracing::error!(error = %other, "Stripe call failed");
                AppError::upstream("Payment provider error")
            }
        }
    }
}

/// Subscription created and paid on Stripe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSubscription {
    pub subscription_id: String,
    /// Payment intent of the first invoice (needed for refunds)
    pub payment_intent_id: Option<String>,
    /// End of the first period, Unix millis
    pub current_period_end: Option<i64>,
}

/// How to cancel a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    Immediately,
    AtPeriodEnd,
}

/// Server-side billing functions
#[async_trait]
pub trait StripeGateway: Send + Sync {
    /// Create a customer for a profile, returns the customer id
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, StripeError>;

    /// Attach the payment method and start a subscription charged immediately
    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: SubscriptionPlan,
        payment_method_id: &str,
    ) -> Result<CreatedSubscription, StripeError>;

    /// Switch the subscription price, invoicing the proration now.
    /// Returns the proration invoice id when Stripe reports one.
    async fn upgrade_subscription(
        &self,
        subscription_id: &str,
        new_plan: SubscriptionPlan,
    ) -> Result<Option<String>, StripeError>;

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        mode: CancelMode,
    ) -> Result<(), StripeError>;

    /// Refund a payment intent (full amount when `amount` is `None`), returns the refund id
    async fn process_refund(
        &self,
        payment_intent_id: &str,
        amount: Option<Decimal>,
    ) -> Result<String, StripeError>;
}

/// Live Stripe client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    prices: StripePrices,
}

impl StripeClient {
    pub fn new(secret_key: String, prices: StripePrices) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            prices,
        }
    }

    fn price_id(&self, plan: SubscriptionPlan) -> Result<&str, StripeError> {
        match plan {
            SubscriptionPlan::Basic => Ok(&self.prices.basic),
            SubscriptionPlan::Professional => Ok(&self.prices.professional),
            SubscriptionPlan::Enterprise => Ok(&self.prices.enterprise),
            SubscriptionPlan::Unlimited => Ok(&self.prices.unlimited),
            SubscriptionPlan::None => Err(StripeError::UnexpectedResponse(
                "no price for the free plan".into(),
            )),
        }
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<serde_json::Value, StripeError> {
        let resp = self
            .http
            .post(format!("{API_BASE}{path}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await?;
        read_response(resp).await
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value, StripeError> {
        let resp = self
            .http
            .get(format!("{API_BASE}{path}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        read_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<serde_json::Value, StripeError> {
        let resp = self
            .http
            .delete(format!("{API_BASE}{path}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        read_response(resp).await
    }
}

async fn read_response(resp: reqwest::Response) -> Result<serde_json::Value, StripeError> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await?;
    if status.is_success() {
        return Ok(body);
    }
    let error = &body["error"];
    Err(StripeError::Api {
        status: status.as_u16(),
        code: error["code"].as_str().map(String::from),
        message: error["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string(),
    })
}

fn required_str(value: &serde_json::Value, field: &str) -> Result<String, StripeError> {
    value[field]
        .as_str()
        .map(String::from)
        .ok_or_else(|| StripeError::UnexpectedResponse(format!("missing {field}: {value}")))
}

/// Decimal dollars to integer cents
fn to_cents(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, StripeError> {
        let resp = self
            .post("/customers", &[("email", email), ("metadata[user_id]", user_id)])
            .await?;
        required_str(&resp, "id")
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        plan: SubscriptionPlan,
        payment_method_id: &str,
    ) -> Result<CreatedSubscription, StripeError> {
        self.post(
            &format!("/payment_methods/{payment_method_id}/attach"),
            &[("customer", customer_id)],
        )
        .await?;
        self.post(
            &format!("/customers/{customer_id}"),
            &[("invoice_settings[default_payment_method]", payment_method_id)],
        )
        .await?;

        let price_id = self.price_id(plan)?;
        let resp = self
            .post(
                "/subscriptions",
                &[
                    ("customer", customer_id),
                    ("items[0][price]", price_id),
                    ("default_payment_method", payment_method_id),
                    ("payment_behavior", "error_if_incomplete"),
                    ("metadata[plan]", plan.as_db()),
                    ("expand[]", "latest_invoice.payment_intent"),
                ],
            )
            .await?;

        let payment_intent_id = match &resp["latest_invoice"]["payment_intent"] {
            serde_json::Value::String(id) => Some(id.clone()),
            obj => obj["id"].as_str().map(String::from),
        };
        let current_period_end = resp["current_period_end"]
            .as_i64()
            .or_else(|| resp["items"]["data"][0]["current_period_end"].as_i64())
            .map(|secs| secs * 1000);

        Ok(CreatedSubscription {
            subscription_id: required_str(&resp, "id")?,
            payment_intent_id,
            current_period_end,
        })
    }

    async fn upgrade_subscription(
        &self,
        subscription_id: &str,
        new_plan: SubscriptionPlan,
    ) -> Result<Option<String>, StripeError> {
        let sub = self.get(&format!("/subscriptions/{subscription_id}")).await?;
        let item_id = sub["items"]["data"][0]["id"]
            .as_str()
            .ok_or_else(|| StripeError::UnexpectedResponse("subscription has no items".into()))?
            .to_string();

        let price_id = self.price_id(new_plan)?;
        let resp = self
            .post(
                &format!("/subscriptions/{subscription_id}"),
                &[
                    ("items[0][id]", item_id.as_str()),
                    ("items[0][price]", price_id),
                    ("proration_behavior", "always_invoice"),
                    ("metadata[plan]", new_plan.as_db()),
                ],
            )
            .await?;

        Ok(resp["latest_invoice"].as_str().map(String::from))
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        mode: CancelMode,
    ) -> Result<(), StripeError> {
        let path = format!("/subscriptions/{subscription_id}");
        match mode {
            CancelMode::Immediately => self.delete(&path).await?,
            CancelMode::AtPeriodEnd => {
                self.post(&path, &[("cancel_at_period_end", "true")]).await?
            }
        };
        Ok(())
    }

    async fn process_refund(
        &self,
        payment_intent_id: &str,
        amount: Option<Decimal>,
    ) -> Result<String, StripeError> {
        let cents = amount.and_then(to_cents).map(|c| c.to_string());
        let mut form = vec![
            ("payment_intent", payment_intent_id),
            ("reason", "requested_by_customer"),
        ];
        if let Some(cents) = cents.as_deref() {
            form.push(("amount", cents));
        }
        let resp = self.post("/refunds", &form).await?;
        required_str(&resp, "id")
    }
}

/// Verify Stripe webhook signature (HMAC-SHA256) against the current time
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

/// Verify Stripe webhook signature with an explicit clock (Unix seconds)
pub fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe may send several v1 signatures while rotating secrets
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    // Reject events older than 5 minutes to prevent replay attacks
    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now_secs - ts).abs() > 300 {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"invoice.paid"}"#;

    fn sign(ts: i64, payload: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{ts}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let ts = 1_760_000_000;
        let header = format!("t={ts},v1={}", sign(ts, PAYLOAD));
        assert!(verify_webhook_signature_at(PAYLOAD, &header, SECRET, ts + 10).is_ok());
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let ts = 1_760_000_000;
        let header = format!("t={ts},v1={},v1={}", "00".repeat(32), sign(ts, PAYLOAD));
        assert!(verify_webhook_signature_at(PAYLOAD, &header, SECRET, ts).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let ts = 1_760_000_000;
        let header = format!("t={ts},v1={}", sign(ts, PAYLOAD));
        let tampered = br#"{"id":"evt_1","type":"charge.refunded"}"#;
        assert_eq!(
            verify_webhook_signature_at(tampered, &header, SECRET, ts),
            Err("Webhook signature mismatch")
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let ts = 1_760_000_000;
        let header = format!("t={ts},v1={}", sign(ts, PAYLOAD));
        assert_eq!(
            verify_webhook_signature_at(PAYLOAD, &header, SECRET, ts + 301),
            Err("Webhook timestamp too old")
        );
        assert!(verify_webhook_signature_at(PAYLOAD, &header, SECRET, ts + 300).is_ok());
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert_eq!(
            verify_webhook_signature_at(PAYLOAD, "v1=abc", SECRET, 0),
            Err("Invalid Stripe-Signature header")
        );
        assert_eq!(
            verify_webhook_signature_at(PAYLOAD, "t=1,v1=zz", SECRET, 1),
            Err("Webhook signature mismatch")
        );
    }

    #[test]
    fn test_to_cents() {
        assert_eq!(to_cents(Decimal::new(2499, 2)), Some(2499));
        assert_eq!(to_cents(Decimal::new(3750, 2)), Some(3750));
    }

    #[test]
    fn test_card_decline_maps_to_payment_failed() {
        let err: AppError = StripeError::Api {
            status: 402,
            code: Some("card_declined".into()),
            message: "Your card was declined.".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::PaymentFailed);
        assert_eq!(err.message, "Your card was declined.");
    }
}
