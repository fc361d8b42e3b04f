//! Transactional email over SES

use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use rust_decimal::Decimal;
use shared::models::{Booking, SubscriptionPlan};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Subject and plain-text body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct EmailClient {
    ses: SesClient,
    from: String,
}

impl EmailClient {
    pub fn new(ses: SesClient, from: impl Into<String>) -> Self {
        Self {
            ses,
            from: from.into(),
        }
    }

    async fn send(&self, to: &str, email: Email) -> Result<(), BoxError> {
        let subject = Content::builder().data(email.subject).build()?;
        let body = Body::builder()
            .text(Content::builder().data(email.body).build()?)
            .build();
        let message = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;
        Ok(())
    }

    pub async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), BoxError> {
        self.send(to, verification_code(code)).await?;
        tracing::info!(to = to, "Verification code sent");
        Ok(())
    }

    pub async fn send_booking_confirmed(
        &self,
        to: &str,
        booking: &Booking,
        shop_name: &str,
    ) -> Result<(), BoxError> {
        self.send(to, booking_confirmed(booking, shop_name)).await?;
        tracing::info!(to = to, booking = %booking.reference, "Booking confirmation sent");
        Ok(())
    }

    pub async fn send_booking_rejected(
        &self,
        to: &str,
        booking: &Booking,
        shop_name: &str,
    ) -> Result<(), BoxError> {
        self.send(to, booking_rejected(booking, shop_name)).await?;
        tracing::info!(to = to, booking = %booking.reference, "Booking rejection sent");
        Ok(())
    }

    pub async fn send_subscription_activated(
        &self,
        to: &str,
        plan: SubscriptionPlan,
        amount: Decimal,
    ) -> Result<(), BoxError> {
        self.send(to, subscription_activated(plan, amount)).await?;
        tracing::info!(to = to, plan = plan.as_db(), "Subscription activation email sent");
        Ok(())
    }

    pub async fn send_subscription_cancelled(
        &self,
        to: &str,
        access_until: Option<i64>,
    ) -> Result<(), BoxError> {
        self.send(to, subscription_cancelled(access_until)).await?;
        tracing::info!(to = to, "Subscription cancellation email sent");
        Ok(())
    }

    pub async fn send_refund_processed(
        &self,
        to: &str,
        amount: Option<Decimal>,
    ) -> Result<(), BoxError> {
        self.send(to, refund_processed(amount)).await?;
        tracing::info!(to = to, "Refund email sent");
        Ok(())
    }

    pub async fn send_payment_failed(&self, to: &str) -> Result<(), BoxError> {
        self.send(to, payment_failed()).await?;
        tracing::info!(to = to, "Payment failure email sent");
        Ok(())
    }
}

// ── Templates ──

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn format_date(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn verification_code(code: &str) -> Email {
    Email {
        subject: "Your HappyInline verification code".into(),
        body: format!("Your verification code is: {code}\nValid for 5 minutes."),
    }
}

fn booking_confirmed(booking: &Booking, shop_name: &str) -> Email {
    Email {
        subject: format!("Booking {} confirmed", booking.reference),
        body: format!(
            "{shop_name} confirmed your appointment on {}.\n\
             Reference: {}\nTotal: ${}",
            format_millis(booking.appointment_at),
            booking.reference,
            booking.total_amount.round_dp(2),
        ),
    }
}

fn booking_rejected(booking: &Booking, shop_name: &str) -> Email {
    let reason = booking
        .rejection_reason
        .as_deref()
        .map(|r| format!("\nReason: {r}"))
        .unwrap_or_default();
    Email {
        subject: format!("Booking {} was declined", booking.reference),
        body: format!(
            "{shop_name} could not take your appointment on {}.{reason}\nReference: {}",
            format_millis(booking.appointment_at),
            booking.reference,
        ),
    }
}

fn subscription_activated(plan: SubscriptionPlan, amount: Decimal) -> Email {
    Email {
        subject: "Your HappyInline subscription is active".into(),
        body: format!(
            "Your {} plan is active. ${} was charged today.\n\
             You can cancel within 7 days for a full refund.",
            plan.as_db(),
            amount.round_dp(2),
        ),
    }
}

fn subscription_cancelled(access_until: Option<i64>) -> Email {
    let body = match access_until {
        Some(until) => format!(
            "Your subscription has been cancelled. You keep access until {}.",
            format_date(until)
        ),
        None => "Your subscription has been cancelled.".to_string(),
    };
    Email {
        subject: "Your HappyInline subscription was cancelled".into(),
        body,
    }
}

fn refund_processed(amount: Option<Decimal>) -> Email {
    let body = match amount {
        Some(amount) => format!(
            "We refunded ${} to your original payment method. \
             It can take 5-10 business days to appear.",
            amount.round_dp(2)
        ),
        None => "We refunded your payment to your original payment method.".to_string(),
    };
    Email {
        subject: "Your HappyInline refund".into(),
        body,
    }
}

fn payment_failed() -> Email {
    Email {
        subject: "Payment failed for your HappyInline subscription".into(),
        body: "We could not charge your payment method for the latest invoice. \
               Update it in the app to keep your subscription active."
            .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking() -> Booking {
        Booking {
            id: "b1".into(),
            reference: "HI-7K2QXD".into(),
            shop_id: "s1".into(),
            customer_id: "c1".into(),
            barber_id: None,
            service_ids: vec!["svc".into()],
            appointment_at: 1_767_225_600_000,
            duration_minutes: 30,
            total_amount: Decimal::new(2500, 2),
            status: "confirmed".into(),
            customer_notes: None,
            rejection_reason: Some("Fully booked".into()),
            cancellation_reason: None,
            cancelled_by: None,
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_booking_confirmed_mentions_reference_and_time() {
        let email = booking_confirmed(&booking(), "Fade Factory");
        assert!(email.subject.contains("HI-7K2QXD"));
        assert!(email.body.contains("Fade Factory"));
        assert!(email.body.contains("2026-01-01 00:00 UTC"));
        assert!(email.body.contains("$25.00"));
    }

    #[test]
    fn test_booking_rejected_includes_reason() {
        let email = booking_rejected(&booking(), "Fade Factory");
        assert!(email.body.contains("Reason: Fully booked"));

        let mut no_reason = booking();
        no_reason.rejection_reason = None;
        assert!(!booking_rejected(&no_reason, "Fade Factory").body.contains("Reason"));
    }

    #[test]
    fn test_cancelled_with_access_date() {
        let email = subscription_cancelled(Some(1_767_225_600_000));
        assert!(email.body.contains("until 2026-01-01"));
    }

    #[test]
    fn test_verification_code_body() {
        assert!(verification_code("123456").body.contains("123456"));
    }
}
