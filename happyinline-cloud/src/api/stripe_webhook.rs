//! Stripe webhook handler
//!
//! POST /stripe/webhook: converges profiles with Stripe's view of each
//! subscription (raw body for signature verification)

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shared::models::{PaymentKind, SubscriptionStatus};

use crate::billing::store::NewPayment;
use crate::db::{self, BoxError};
use crate::state::AppState;
use crate::stripe;

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe/webhook", post(handle_webhook))
}

/// Events this service reacts to, with the fields it needs
#[derive(Debug, PartialEq, Eq)]
enum WebhookEvent<'a> {
    InvoicePaid {
        subscription_id: &'a str,
        invoice_id: Option<&'a str>,
        /// Renewal (not the first invoice of the subscription)
        is_renewal: bool,
        amount_paid_cents: Option<i64>,
        /// End of the paid period (Unix millis)
        period_end: Option<i64>,
    },
    InvoicePaymentFailed {
        subscription_id: &'a str,
    },
    SubscriptionDeleted {
        subscription_id: &'a str,
    },
    ChargeRefunded {
        customer_id: &'a str,
        payment_intent_id: Option<&'a str>,
        amount_refunded_cents: Option<i64>,
    },
    Ignored,
}

/// Subscription id of an invoice across Stripe API versions
fn invoice_subscription(obj: &Value) -> Option<&str> {
    obj["subscription"]
        .as_str()
        .or_else(|| obj["parent"]["subscription_details"]["subscription"].as_str())
}

fn classify(event: &Value) -> WebhookEvent<'_> {
    let obj = &event["data"]["object"];
    match event["type"].as_str().unwrap_or("") {
        "invoice.paid" => match invoice_subscription(obj) {
            Some(subscription_id) => WebhookEvent::InvoicePaid {
                subscription_id,
                invoice_id: obj["id"].as_str(),
                is_renewal: obj["billing_reason"].as_str() == Some("subscription_cycle"),
                amount_paid_cents: obj["amount_paid"].as_i64(),
                period_end: obj["lines"]["data"][0]["period"]["end"]
                    .as_i64()
                    .map(|secs| secs * 1000),
            },
            None => WebhookEvent::Ignored,
        },
        "invoice.payment_failed" => match invoice_subscription(obj) {
            Some(subscription_id) => WebhookEvent::InvoicePaymentFailed { subscription_id },
            None => WebhookEvent::Ignored,
        },
        "customer.subscription.deleted" => match obj["id"].as_str() {
            Some(subscription_id) => WebhookEvent::SubscriptionDeleted { subscription_id },
            None => WebhookEvent::Ignored,
        },
        "charge.refunded" => match obj["customer"].as_str() {
            Some(customer_id) => WebhookEvent::ChargeRefunded {
                customer_id,
                payment_intent_id: obj["payment_intent"].as_str(),
                amount_refunded_cents: obj["amount_refunded"].as_i64(),
            },
            None => WebhookEvent::Ignored,
        },
        _ => WebhookEvent::Ignored,
    }
}

/// Handle incoming Stripe webhook events
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(sig_header) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Missing Stripe-Signature header");
        return StatusCode::BAD_REQUEST;
    };

    if let Err(e) =
        stripe::verify_webhook_signature(&body, sig_header, &state.stripe_webhook_secret)
    {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    let event: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    let Some(event_id) = event["id"].as_str() else {
        tracing::warn!("Webhook event missing id");
        return StatusCode::BAD_REQUEST;
    };
    tracing::info!(event_id, event_type, "Received Stripe webhook");

    let now = shared::util::now_millis();
    match db::webhook_events::try_record(&state.pool, event_id, event_type, now).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }

    let result = match classify(&event) {
        WebhookEvent::InvoicePaid {
            subscription_id,
            invoice_id,
            is_renewal,
            amount_paid_cents,
            period_end,
        } => {
            handle_invoice_paid(
                &state,
                subscription_id,
                invoice_id,
                is_renewal,
                amount_paid_cents,
                period_end,
                now,
            )
            .await
        }
        WebhookEvent::InvoicePaymentFailed { subscription_id } => {
            handle_payment_failed(&state, subscription_id, now).await
        }
        WebhookEvent::SubscriptionDeleted { subscription_id } => {
            handle_subscription_deleted(&state, subscription_id, now).await
        }
        WebhookEvent::ChargeRefunded {
            customer_id,
            payment_intent_id,
            amount_refunded_cents,
        } => {
            handle_charge_refunded(
                &state,
                customer_id,
                payment_intent_id,
                amount_refunded_cents,
                now,
            )
            .await
        }
        WebhookEvent::Ignored => {
            tracing::debug!(event_type, "Unhandled webhook event type");
            Ok(())
        }
    };

    match result {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(event_id, event_type, %e, "Webhook handling failed");
            // Let Stripe's retry run the handler again
            if let Err(e) = db::webhook_events::forget(&state.pool, event_id).await {
                tracing::error!(event_id, %e, "Failed to forget webhook event");
            }
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn cents(amount: Option<i64>) -> Option<Decimal> {
    amount.map(|c| Decimal::new(c, 2))
}

/// invoice.paid → status active, next billing date from the invoice period
async fn handle_invoice_paid(
    state: &AppState,
    subscription_id: &str,
    invoice_id: Option<&str>,
    is_renewal: bool,
    amount_paid_cents: Option<i64>,
    period_end: Option<i64>,
    now: i64,
) -> Result<(), BoxError> {
    let Some(profile) = db::profiles::find_billing_by_subscription(&state.pool, subscription_id).await?
    else {
        tracing::warn!(subscription_id, "invoice.paid for unknown subscription");
        return Ok(());
    };

    db::profiles::renew_by_subscription(&state.pool, subscription_id, period_end, now).await?;

    if is_renewal && let Some(amount) = cents(amount_paid_cents) {
        db::payments::insert(
            &state.pool,
            &NewPayment {
                user_id: profile.id.clone(),
                kind: PaymentKind::Charge,
                plan: profile.plan(),
                amount,
                stripe_reference: invoice_id.map(str::to_string),
                description: format!("{} plan renewal", profile.plan().as_db()),
            },
            now,
        )
        .await?;
    }

    db::subscription_events::log(
        &state.pool,
        &profile.id,
        if is_renewal { "renewed" } else { "invoice_paid" },
        Some(&json!({ "invoice_id": invoice_id, "next_billing_date": period_end })),
        now,
    )
    .await?;
    tracing::info!(user_id = %profile.id, subscription_id, "Invoice paid");
    Ok(())
}

/// invoice.payment_failed → status past_due
async fn handle_payment_failed(
    state: &AppState,
    subscription_id: &str,
    now: i64,
) -> Result<(), BoxError> {
    let Some(profile) = db::profiles::find_billing_by_subscription(&state.pool, subscription_id).await?
    else {
        tracing::warn!(subscription_id, "invoice.payment_failed for unknown subscription");
        return Ok(());
    };

    let updated =
        db::profiles::mark_past_due_by_subscription(&state.pool, subscription_id, now).await?;
    db::subscription_events::log(&state.pool, &profile.id, "payment_failed", None, now).await?;
    tracing::warn!(user_id = %profile.id, subscription_id, "Subscription payment failed");

    if updated > 0
        && let Err(e) = state.email.send_payment_failed(&profile.email).await
    {
        tracing::warn!(user_id = %profile.id, error = %e, "Payment failure email failed");
    }
    Ok(())
}

/// customer.subscription.deleted → free plan (a refunded status is kept)
async fn handle_subscription_deleted(
    state: &AppState,
    subscription_id: &str,
    now: i64,
) -> Result<(), BoxError> {
    let Some(profile) = db::profiles::find_billing_by_subscription(&state.pool, subscription_id).await?
    else {
        tracing::info!(subscription_id, "Deleted subscription already detached");
        return Ok(());
    };

    db::profiles::end_subscription(&state.pool, subscription_id, now).await?;
    db::subscription_events::log(
        &state.pool,
        &profile.id,
        "subscription_ended",
        Some(&json!({ "subscription_id": subscription_id })),
        now,
    )
    .await?;
    tracing::info!(user_id = %profile.id, subscription_id, "Subscription ended");

    if profile.status() != SubscriptionStatus::Refunded
        && let Err(e) = state.email.send_subscription_cancelled(&profile.email, None).await
    {
        tracing::warn!(user_id = %profile.id, error = %e, "Cancellation email failed");
    }
    Ok(())
}

/// charge.refunded → audit only; the refund flow already updated the profile
async fn handle_charge_refunded(
    state: &AppState,
    customer_id: &str,
    payment_intent_id: Option<&str>,
    amount_refunded_cents: Option<i64>,
    now: i64,
) -> Result<(), BoxError> {
    let Some(profile) = db::profiles::find_billing_by_customer(&state.pool, customer_id).await?
    else {
        tracing::warn!(customer_id, "charge.refunded for unknown customer");
        return Ok(());
    };

    db::subscription_events::log(
        &state.pool,
        &profile.id,
        "refund_confirmed",
        Some(&json!({
            "payment_intent_id": payment_intent_id,
            "amount": cents(amount_refunded_cents),
        })),
        now,
    )
    .await?;
    tracing::info!(user_id = %profile.id, "Stripe confirmed refund");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_renewal_invoice() {
        let event = json!({
            "id": "evt_1",
            "type": "invoice.paid",
            "data": { "object": {
                "id": "in_1",
                "subscription": "sub_1",
                "billing_reason": "subscription_cycle",
                "amount_paid": 2499,
                "lines": { "data": [ { "period": { "start": 1_700_000_000, "end": 1_702_592_000 } } ] }
            }}
        });
        assert_eq!(
            classify(&event),
            WebhookEvent::InvoicePaid {
                subscription_id: "sub_1",
                invoice_id: Some("in_1"),
                is_renewal: true,
                amount_paid_cents: Some(2499),
                period_end: Some(1_702_592_000_000),
            }
        );
    }

    #[test]
    fn test_classify_invoice_with_parent_subscription() {
        let event = json!({
            "type": "invoice.payment_failed",
            "data": { "object": {
                "parent": { "subscription_details": { "subscription": "sub_9" } }
            }}
        });
        assert_eq!(
            classify(&event),
            WebhookEvent::InvoicePaymentFailed {
                subscription_id: "sub_9"
            }
        );
    }

    #[test]
    fn test_classify_deleted_and_refunded() {
        let deleted = json!({
            "type": "customer.subscription.deleted",
            "data": { "object": { "id": "sub_2" } }
        });
        assert_eq!(
            classify(&deleted),
            WebhookEvent::SubscriptionDeleted {
                subscription_id: "sub_2"
            }
        );

        let refunded = json!({
            "type": "charge.refunded",
            "data": { "object": {
                "customer": "cus_1", "payment_intent": "pi_1", "amount_refunded": 2499
            }}
        });
        assert_eq!(
            classify(&refunded),
            WebhookEvent::ChargeRefunded {
                customer_id: "cus_1",
                payment_intent_id: Some("pi_1"),
                amount_refunded_cents: Some(2499),
            }
        );
    }

    #[test]
    fn test_classify_ignores_unknown_and_incomplete() {
        assert_eq!(
            classify(&json!({ "type": "customer.created", "data": { "object": {} } })),
            WebhookEvent::Ignored
        );
        assert_eq!(
            classify(&json!({ "type": "invoice.paid", "data": { "object": { "id": "in_1" } } })),
            WebhookEvent::Ignored
        );
    }
}
