//! Business metrics for the Gather server.
//!
//! Prometheus counters for the operations that matter operationally:
//!
//! - `gather_registrations_total{kind, outcome}` - admissions by outcome
//! - `gather_checkins_total{repeat}` - check-in scans (first vs repeat)
//! - `gather_coupon_redemptions_total{outcome}` - redemption attempts
//! - `gather_notification_deliveries_total` - fan-out delivery records

use metrics::describe_counter;

/// Registers metric descriptions. Call once at startup, before any metric
/// is recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "gather_registrations_total",
        "Registration attempts by kind (event, session) and outcome \
         (admitted, duplicate, full, deadline)"
    );
    describe_counter!(
        "gather_checkins_total",
        "Check-in scans; repeat=true counts idempotent re-scans"
    );
    describe_counter!(
        "gather_coupon_redemptions_total",
        "Coupon redemption attempts by outcome (redeemed, already_redeemed)"
    );
    describe_counter!(
        "gather_notification_deliveries_total",
        "Notification delivery records created by fan-out"
    );

    tracing::info!("business metrics registered");
}

/// Records a registration attempt outcome.
pub fn record_registration(kind: &'static str, outcome: &'static str) {
    metrics::counter!(
        "gather_registrations_total",
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

/// Records a check-in scan.
pub fn record_check_in(repeat: bool) {
    metrics::counter!(
        "gather_checkins_total",
        "repeat" => if repeat { "true" } else { "false" }
    )
    .increment(1);
}

/// Records a coupon redemption attempt outcome.
pub fn record_redemption(outcome: &'static str) {
    metrics::counter!("gather_coupon_redemptions_total", "outcome" => outcome).increment(1);
}

/// Records delivery records created by a notification fan-out.
pub fn record_deliveries(count: usize) {
    metrics::counter!("gather_notification_deliveries_total").increment(count as u64);
}
