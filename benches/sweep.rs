use std::sync::Arc;
use std::time::{Duration, Instant};

use ulid::Ulid;

use lessonbook::clock::ManualClock;
use lessonbook::market;
use lessonbook::model::*;
use lessonbook::notify::NotifyHub;
use lessonbook::store::Store;
use lessonbook::timeline;

const T0: Ms = 1_600_000_000_000;

/// Latency summary of one measured phase, in milliseconds.
struct Summary {
    n: usize,
    mean: f64,
    p50: f64,
    p95: f64,
    p99: f64,
    max: f64,
}

impl Summary {
    fn of(mut samples: Vec<Duration>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        let rank = |q: f64| ms(samples[((samples.len() - 1) as f64 * q).round() as usize]);
        Some(Self {
            n: samples.len(),
            mean: samples.iter().map(|d| ms(*d)).sum::<f64>() / samples.len() as f64,
            p50: rank(0.50),
            p95: rank(0.95),
            p99: rank(0.99),
            max: rank(1.0),
        })
    }

    fn report(samples: Vec<Duration>, label: &str) {
        match Self::of(samples) {
            Some(s) => println!(
                "  {label}: n={} mean={:.3}ms p50={:.3}ms p95={:.3}ms p99={:.3}ms max={:.3}ms",
                s.n, s.mean, s.p50, s.p95, s.p99, s.max
            ),
            None => println!("  {label}: no samples"),
        }
    }
}

/// `n` customers with one four-class subscription each. Every third and every
/// fifth customer books a class: the first thousand into a future event, the
/// rest into events that already ended.
async fn setup(store: &Store, n: usize) -> Vec<Ulid> {
    let host = Ulid::new();
    store.register_teacher(host, "Host".into()).await.unwrap();
    let event = Ulid::new();
    store
        .define_lesson(event, "Happy hour".into(), 1_000, HOUR, LessonKind::HostedEvent { host: Some(host) })
        .await
        .unwrap();

    let mut entries = Vec::new();
    let mut current = Ulid::new();
    store.schedule_entry(current, host, event, T0 + 20 * DAY).await.unwrap();
    entries.push(current);

    let mut write_latencies = Vec::with_capacity(n);
    for i in 0..n {
        let t = Instant::now();
        let customer = Ulid::new();
        store
            .register_customer(customer, format!("Customer {i}"), format!("c{i}@example.com"))
            .await
            .unwrap();
        let classes = store
            .purchase_subscription(Ulid::new(), customer, T0, &[LessonType::HostedEvent; 4])
            .await
            .unwrap();
        if i % 3 == 0 || i % 5 == 0 {
            if !store.entry(&current).unwrap().is_free {
                current = Ulid::new();
                store.schedule_entry(current, host, event, T0).await.unwrap();
                entries.push(current);
            }
            store.assign_class(classes[0], current).await.unwrap();
        }
        write_latencies.push(t.elapsed());
    }
    Summary::report(write_latencies, "customer + subscription + booking");
    entries
}

#[tokio::main]
async fn main() {
    let n: usize = std::env::var("LESSONBOOK_BENCH_SUBSCRIPTIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(2_000);
    let dir = std::env::temp_dir().join(format!("lessonbook_bench_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let store = Arc::new(Store::open(dir.join("lessonbook.journal")).unwrap());

    println!("=== lessonbook sweep benchmark ===");
    println!("subscriptions: {n}\n");

    println!("[setup]");
    let entries = setup(&store, n).await;
    println!("  {} entries", entries.len());

    println!("\n[phase 1] selection only");
    let mut latencies = Vec::new();
    let mut selected = 0;
    for _ in 0..20 {
        let t = Instant::now();
        selected = market::select_unused_subscriptions(&store, T0 + 10 * DAY).len();
        latencies.push(t.elapsed());
    }
    println!("  {selected} unused");
    Summary::report(latencies, "select_unused_subscriptions");

    println!("\n[phase 2] detector pass with notifications");
    let hub = NotifyHub::new();
    let _rx = hub.subscribe();
    let clock = ManualClock::new(T0 + 10 * DAY);
    let t = Instant::now();
    let report = market::notify_about_unused_subscriptions(&store, &hub, &clock).await.unwrap();
    println!(
        "  notified {} of {} in {:.2}s",
        report.notified,
        report.selected,
        t.elapsed().as_secs_f64()
    );
    let t = Instant::now();
    let again = market::notify_about_unused_subscriptions(&store, &hub, &clock).await.unwrap();
    println!("  re-run selected {} in {:.2}ms", again.selected, t.elapsed().as_secs_f64() * 1000.0);

    println!("\n[phase 3] completion sweep");
    let t = Instant::now();
    let finished = timeline::finish_due_entries(&store, &clock).await.unwrap();
    println!("  finished {finished} entries in {:.2}s", t.elapsed().as_secs_f64());

    println!("\n[phase 4] journal compaction");
    let t = Instant::now();
    store.compact_journal().await.unwrap();
    println!("  compacted in {:.2}s", t.elapsed().as_secs_f64());

    let _ = std::fs::remove_dir_all(&dir);
    println!("\n=== benchmark complete ===");
}
