//! Unused-subscription detection.
//!
//! A subscription is *unused* when nothing of it is scheduled and its last use
//! (the end of its latest used class, else the purchase date) lies more than
//! [`UNUSED_GAP`] in the past. The customer is told at most once per [`NOTIFY_GAP`].

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::model::{DAY, Ms, Subscription};
use crate::notify::{Notifier, UnusedSubscription};
use crate::store::{Store, StoreError};

pub const UNUSED_GAP: Ms = 7 * DAY;
pub const NOTIFY_GAP: Ms = DAY;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedCandidate {
    pub subscription: Subscription,
    pub last_used_at: Ms,
}

/// Outcome of one detector pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DetectorReport {
    pub selected: usize,
    pub notified: usize,
    pub failed: usize,
}

/// End of the subscription's latest used class, falling back to its purchase date.
pub fn last_used_at(store: &Store, subscription: &Subscription) -> Ms {
    store
        .latest_used_class_end(&subscription.id)
        .unwrap_or(subscription.buy_date)
}

fn cooled_down(subscription: &Subscription, now: Ms) -> bool {
    subscription
        .last_notified_unused
        .is_none_or(|at| now - at > NOTIFY_GAP)
}

/// Subscriptions that should be reported as unused at `now`, oldest use first.
pub fn select_unused_subscriptions(store: &Store, now: Ms) -> Vec<UnusedCandidate> {
    let mut out: Vec<UnusedCandidate> = store
        .subscriptions()
        .into_iter()
        .filter(|s| !s.is_fully_used)
        .filter(|s| !store.has_scheduled_class(&s.id))
        .filter_map(|s| {
            let last_used_at = last_used_at(store, &s);
            (now - last_used_at > UNUSED_GAP && cooled_down(&s, now)).then_some(UnusedCandidate {
                subscription: s,
                last_used_at,
            })
        })
        .collect();
    out.sort_by_key(|c| (c.last_used_at, c.subscription.id));
    out
}

/// One detector pass: stamp every selected subscription, then hand it to `notifier`.
///
/// The stamp is persisted before the notification goes out. A failed delivery
/// keeps its stamp and is only counted; the next attempt comes after [`NOTIFY_GAP`].
pub async fn notify_about_unused_subscriptions(
    store: &Store,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
) -> Result<DetectorReport, StoreError> {
    let started = std::time::Instant::now();
    let now = clock.now();
    let candidates = select_unused_subscriptions(store, now);
    let mut report = DetectorReport {
        selected: candidates.len(),
        ..Default::default()
    };

    for candidate in candidates {
        let id = candidate.subscription.id;
        let Some(customer) = store.customer(&candidate.subscription.customer_id) else {
            warn!("subscription {id} has no customer, skipping");
            continue;
        };
        if !store.stamp_unused_notification(id, now).await? {
            debug!("subscription {id} was stamped by a newer run, skipping");
            continue;
        }
        let subscription = store.subscription(&id).ok_or(StoreError::NotFound(id))?;

        match notifier
            .unused_subscription(UnusedSubscription { subscription, customer })
            .await
        {
            Ok(()) => {
                report.notified += 1;
                metrics::counter!(crate::observability::UNUSED_NOTIFICATIONS_TOTAL).increment(1);
                info!(
                    "notified about unused subscription {id}, idle since {}",
                    candidate.last_used_at
                );
            }
            Err(e) => {
                report.failed += 1;
                metrics::counter!(crate::observability::UNUSED_NOTIFICATION_FAILURES_TOTAL).increment(1);
                warn!("unused subscription {id}: {e}");
            }
        }
    }

    metrics::histogram!(crate::observability::SWEEP_DURATION_SECONDS, "sweep" => "unused_subscriptions")
        .record(started.elapsed().as_secs_f64());
    Ok(report)
}
