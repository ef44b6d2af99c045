use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::clock::Clock;
use crate::market;
use crate::notify::Notifier;
use crate::store::Store;
use crate::timeline;

/// Background task that periodically looks for unused subscriptions.
pub async fn run_unused_detector(
    store: Arc<Store>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        match market::notify_about_unused_subscriptions(&store, notifier.as_ref(), clock.as_ref()).await {
            Ok(report) if report.selected > 0 => info!(
                "unused subscriptions: {} selected, {} notified, {} failed",
                report.selected, report.notified, report.failed
            ),
            Ok(_) => {}
            Err(e) => error!("unused subscription detector: {e}"),
        }
    }
}

/// Background task that periodically finishes entries past their completion lag.
pub async fn run_finisher(store: Arc<Store>, clock: Arc<dyn Clock>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = timeline::finish_due_entries(&store, clock.as_ref()).await {
            error!("completion sweep: {e}");
        }
    }
}

/// Background task that compacts the journal once enough appends piled up.
pub async fn run_compactor(store: Arc<Store>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        if store.journal_appends_since_compact().await >= threshold
            && let Err(e) = store.compact_journal().await
        {
            error!("journal compaction: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::*;
    use crate::notify::NotifyHub;
    use std::path::PathBuf;
    use ulid::Ulid;

    const T0: Ms = 1_600_000_000_000;

    fn test_journal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("lessonbook_test_sweeper");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn detector_task_notifies_on_first_tick() {
        let store = Arc::new(Store::open(test_journal_path("detector_task.journal")).unwrap());
        let customer = Ulid::new();
        store.register_customer(customer, "Grace".into(), "g@example.com".into()).await.unwrap();
        let sub = Ulid::new();
        store.purchase_subscription(sub, customer, T0, &[LessonType::Ordinary]).await.unwrap();

        let hub = Arc::new(NotifyHub::new());
        let mut rx = hub.subscribe();
        let clock = Arc::new(ManualClock::new(T0 + 30 * DAY));

        let task = tokio::spawn(run_unused_detector(
            store.clone(),
            hub.clone(),
            clock.clone(),
            Duration::from_secs(3_600),
        ));
        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        task.abort();

        assert_eq!(got.subscription.id, sub);
        assert_eq!(got.customer.id, customer);
    }

    #[tokio::test]
    async fn finisher_task_finishes_due_entry() {
        let store = Arc::new(Store::open(test_journal_path("finisher_task.journal")).unwrap());
        let teacher = Ulid::new();
        store.register_teacher(teacher, "Ada".into()).await.unwrap();
        let lesson = Ulid::new();
        store
            .define_lesson(lesson, "Lesson".into(), 1, HOUR, LessonKind::Ordinary)
            .await
            .unwrap();
        let entry = Ulid::new();
        store.schedule_entry(entry, teacher, lesson, T0).await.unwrap();

        let clock = Arc::new(ManualClock::new(T0 + 3 * HOUR));
        let task = tokio::spawn(run_finisher(store.clone(), clock, Duration::from_millis(10)));
        for _ in 0..100 {
            if store.entry(&entry).unwrap().is_finished {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        task.abort();
        assert!(store.entry(&entry).unwrap().is_finished);
    }
}
