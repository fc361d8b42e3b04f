//! Subscription billing endpoints for shop owners

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{PaymentRecord, SubscriptionEvent, SubscriptionPlan};

use crate::auth::UserIdentity;
use crate::billing::lifecycle::CancellationKind;
use crate::billing::plans::{get_upgrade_options, monthly_price, parse_paid_plan};
use crate::billing::proration::Proration;
use crate::billing::service::{CancellationOutcome, SubscriptionSummary, UpgradeOutcome};
use crate::db;
use crate::state::AppState;

use super::{ApiResult, page};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/billing/subscription", get(get_subscription))
        .route("/api/billing/upgrade-options", get(upgrade_options))
        .route("/api/billing/proration", get(preview_proration))
        .route("/api/billing/subscribe", post(subscribe))
        .route("/api/billing/upgrade", post(upgrade))
        .route("/api/billing/cancel", post(cancel))
        .route("/api/billing/refund", post(refund))
        .route("/api/billing/payments", get(list_payments))
        .route("/api/billing/events", get(list_events))
}

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub plan: String,
    pub payment_method_id: String,
}

#[derive(Deserialize)]
pub struct UpgradeRequest {
    pub plan: String,
}

#[derive(Deserialize)]
pub struct ProrationQuery {
    pub to: String,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct PlanOption {
    pub plan: SubscriptionPlan,
    pub monthly_price: Decimal,
}

/// GET /api/billing/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<SubscriptionSummary> {
    let now = shared::util::now_millis();
    Ok(Json(
        state
            .billing
            .subscription_summary(&identity.user_id, now)
            .await?,
    ))
}

/// GET /api/billing/upgrade-options
pub async fn upgrade_options(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Vec<PlanOption>> {
    let current = db::profiles::plan_of(&state.pool, &identity.user_id).await?;
    Ok(Json(
        get_upgrade_options(current)
            .into_iter()
            .map(|plan| PlanOption {
                plan,
                monthly_price: monthly_price(plan),
            })
            .collect(),
    ))
}

/// GET /api/billing/proration?to=
pub async fn preview_proration(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Query(query): Query<ProrationQuery>,
) -> ApiResult<Proration> {
    let plan = parse_paid_plan(&query.to)?;
    let now = shared::util::now_millis();
    Ok(Json(
        state
            .billing
            .preview_upgrade(&identity.user_id, plan, now)
            .await?,
    ))
}

/// POST /api/billing/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<SubscribeRequest>,
) -> ApiResult<SubscriptionSummary> {
    let plan = parse_paid_plan(&req.plan)?;
    let now = shared::util::now_millis();
    let summary = state
        .billing
        .create_subscription(&identity.user_id, plan, &req.payment_method_id, now)
        .await?;

    if let Err(e) = state
        .email
        .send_subscription_activated(&identity.email, plan, monthly_price(plan))
        .await
    {
        tracing::warn!(user_id = %identity.user_id, error = %e, "Activation email failed");
    }
    Ok(Json(summary))
}

/// POST /api/billing/upgrade
pub async fn upgrade(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<UpgradeRequest>,
) -> ApiResult<UpgradeOutcome> {
    let plan = parse_paid_plan(&req.plan)?;
    let now = shared::util::now_millis();
    Ok(Json(
        state
            .billing
            .upgrade_subscription(&identity.user_id, plan, now)
            .await?,
    ))
}

async fn notify_cancellation(
    state: &AppState,
    identity: &UserIdentity,
    outcome: &CancellationOutcome,
) {
    let result = match outcome.kind {
        CancellationKind::Refunded => {
            state
                .email
                .send_refund_processed(&identity.email, outcome.refund_amount)
                .await
        }
        CancellationKind::CancelledAtPeriodEnd | CancellationKind::LocalDowngrade => {
            state
                .email
                .send_subscription_cancelled(&identity.email, outcome.access_until)
                .await
        }
    };
    if let Err(e) = result {
        tracing::warn!(user_id = %identity.user_id, error = %e, "Cancellation email failed");
    }
}

/// POST /api/billing/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<CancellationOutcome> {
    let now = shared::util::now_millis();
    let outcome = state
        .billing
        .cancel_subscription(&identity.user_id, now)
        .await?;
    notify_cancellation(&state, &identity, &outcome).await;
    Ok(Json(outcome))
}

/// POST /api/billing/refund
pub async fn refund(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<CancellationOutcome> {
    let now = shared::util::now_millis();
    let outcome = state.billing.process_refund(&identity.user_id, now).await?;
    notify_cancellation(&state, &identity, &outcome).await;
    Ok(Json(outcome))
}

/// GET /api/billing/payments
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<PaymentRecord>> {
    let (limit, offset) = page(query.limit, query.offset);
    Ok(Json(
        db::payments::list_for_user(&state.pool, &identity.user_id, limit, offset).await?,
    ))
}

/// GET /api/billing/events (subscription audit trail, newest first)
pub async fn list_events(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<SubscriptionEvent>> {
    let (limit, _) = page(query.limit, None);
    Ok(Json(
        db::subscription_events::list_for_user(&state.pool, &identity.user_id, limit).await?,
    ))
}
