mod error;
mod mutations;
mod queries;

pub use error::{StoreError, ValidationError};

use std::io;
use std::path::PathBuf;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use ulid::Ulid;

use crate::journal::Journal;
use crate::model::*;

/// In-memory tables for customers, teachers, lessons, subscriptions, classes and
/// timeline entries, persisted as an event journal.
///
/// Every write goes through the journal lock: validate, append, apply. Holding the lock
/// across all three is what serializes writers, so a capacity check and the assignment
/// it guards can't interleave with another writer.
pub struct Store {
    pub(super) customers: DashMap<Ulid, Customer>,
    pub(super) teachers: DashMap<Ulid, Teacher>,
    pub(super) lessons: DashMap<Ulid, Lesson>,
    pub(super) subscriptions: DashMap<Ulid, Subscription>,
    pub(super) classes: DashMap<Ulid, Class>,
    pub(super) entries: DashMap<Ulid, EntryState>,
    /// Subscription → issued class ids.
    pub(super) subscription_classes: DashMap<Ulid, Vec<Ulid>>,
    journal: Mutex<Journal>,
}

impl Store {
    /// Open the journal at `path`, replaying whatever it already holds.
    pub fn open(path: PathBuf) -> io::Result<Self> {
        let (journal, events) = Journal::recover(&path)?;
        let store = Self {
            customers: DashMap::new(),
            teachers: DashMap::new(),
            lessons: DashMap::new(),
            subscriptions: DashMap::new(),
            classes: DashMap::new(),
            entries: DashMap::new(),
            subscription_classes: DashMap::new(),
            journal: Mutex::new(journal),
        };
        for event in &events {
            store.apply(event);
        }
        tracing::debug!("replayed {} events from {}", events.len(), path.display());
        Ok(store)
    }

    /// Take the single-writer lock.
    pub(super) async fn writer(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().await
    }

    /// Append to the journal, then apply. Events are applied only once durable.
    pub(super) fn commit(&self, journal: &mut Journal, event: Event) -> Result<(), StoreError> {
        let started = std::time::Instant::now();
        journal
            .append(&event)
            .map_err(|e| StoreError::WalError(e.to_string()))?;
        metrics::histogram!(crate::observability::JOURNAL_APPEND_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        self.apply(&event);
        Ok(())
    }

    /// Apply an event to the tables. No validation: replay trusts the journal.
    fn apply(&self, event: &Event) {
        match event {
            Event::CustomerRegistered { id, name, email } => {
                self.customers.insert(
                    *id,
                    Customer {
                        id: *id,
                        name: name.clone(),
                        email: email.clone(),
                    },
                );
            }
            Event::TeacherRegistered { id, name } => {
                self.teachers.insert(
                    *id,
                    Teacher {
                        id: *id,
                        name: name.clone(),
                    },
                );
            }
            Event::LessonDefined {
                id,
                name,
                slots,
                duration,
                kind,
            } => {
                self.lessons.insert(
                    *id,
                    Lesson {
                        id: *id,
                        name: name.clone(),
                        slots: *slots,
                        duration: *duration,
                        kind: kind.clone(),
                    },
                );
            }
            Event::SubscriptionPurchased {
                id,
                customer_id,
                buy_date,
            } => {
                self.subscriptions.insert(
                    *id,
                    Subscription {
                        id: *id,
                        customer_id: *customer_id,
                        buy_date: *buy_date,
                        is_fully_used: false,
                        last_notified_unused: None,
                    },
                );
            }
            Event::SubscriptionFullyUsed { id } => {
                if let Some(mut sub) = self.subscriptions.get_mut(id) {
                    sub.is_fully_used = true;
                }
            }
            Event::UnusedNotificationStamped { id, at } => {
                if let Some(mut sub) = self.subscriptions.get_mut(id) {
                    sub.last_notified_unused = Some(sub.last_notified_unused.map_or(*at, |prev| prev.max(*at)));
                }
            }
            Event::ClassIssued {
                id,
                customer_id,
                subscription_id,
                lesson_type,
            } => {
                self.classes.insert(
                    *id,
                    Class {
                        id: *id,
                        customer_id: *customer_id,
                        subscription_id: *subscription_id,
                        lesson_type: *lesson_type,
                        entry_id: None,
                        is_fully_used: false,
                    },
                );
                if let Some(sid) = subscription_id {
                    self.subscription_classes.entry(*sid).or_default().push(*id);
                }
            }
            Event::ClassUsed { id } => {
                if let Some(mut class) = self.classes.get_mut(id) {
                    class.is_fully_used = true;
                }
            }
            Event::EntryScheduled {
                id,
                teacher_id,
                lesson_id,
                lesson_type,
                span,
                slots,
            } => {
                self.entries.insert(
                    *id,
                    EntryState::new(*id, *teacher_id, *lesson_id, *lesson_type, *span, *slots),
                );
            }
            Event::EntryDeactivated { id } => {
                if let Some(mut entry) = self.entries.get_mut(id) {
                    entry.active = false;
                }
            }
            Event::EntryFinished { id } => {
                if let Some(mut entry) = self.entries.get_mut(id) {
                    entry.is_finished = true;
                }
            }
            Event::ClassAssigned { class_id, entry_id } => {
                if let Some(mut entry) = self.entries.get_mut(entry_id) {
                    entry.add_class(*class_id);
                }
                if let Some(mut class) = self.classes.get_mut(class_id) {
                    class.entry_id = Some(*entry_id);
                }
            }
            Event::ClassUnassigned { class_id, entry_id } => {
                if let Some(mut entry) = self.entries.get_mut(entry_id) {
                    entry.remove_class(*class_id);
                }
                if let Some(mut class) = self.classes.get_mut(class_id) {
                    class.entry_id = None;
                }
            }
        }
    }

    /// Rewrite the journal with only the events needed to rebuild the current tables.
    pub async fn compact_journal(&self) -> Result<(), StoreError> {
        let mut journal = self.writer().await;

        let mut events: Vec<Event> = Vec::new();
        for c in self.customers.iter() {
            events.push(Event::CustomerRegistered {
                id: c.id,
                name: c.name.clone(),
                email: c.email.clone(),
            });
        }
        for t in self.teachers.iter() {
            events.push(Event::TeacherRegistered {
                id: t.id,
                name: t.name.clone(),
            });
        }
        for l in self.lessons.iter() {
            events.push(Event::LessonDefined {
                id: l.id,
                name: l.name.clone(),
                slots: l.slots,
                duration: l.duration,
                kind: l.kind.clone(),
            });
        }
        for s in self.subscriptions.iter() {
            events.push(Event::SubscriptionPurchased {
                id: s.id,
                customer_id: s.customer_id,
                buy_date: s.buy_date,
            });
            if s.is_fully_used {
                events.push(Event::SubscriptionFullyUsed { id: s.id });
            }
            if let Some(at) = s.last_notified_unused {
                events.push(Event::UnusedNotificationStamped { id: s.id, at });
            }
        }
        for e in self.entries.iter() {
            events.push(Event::EntryScheduled {
                id: e.id,
                teacher_id: e.teacher_id,
                lesson_id: e.lesson_id,
                lesson_type: e.lesson_type,
                span: e.span,
                slots: e.slots,
            });
            if !e.active {
                events.push(Event::EntryDeactivated { id: e.id });
            }
            if e.is_finished {
                events.push(Event::EntryFinished { id: e.id });
            }
        }

        // Classes last: assignments reference entries, and slot order must survive.
        let mut assignments = Vec::new();
        for e in self.entries.iter() {
            for class_id in &e.classes {
                assignments.push(Event::ClassAssigned {
                    class_id: *class_id,
                    entry_id: e.id,
                });
            }
        }
        let mut used = Vec::new();
        for c in self.classes.iter() {
            events.push(Event::ClassIssued {
                id: c.id,
                customer_id: c.customer_id,
                subscription_id: c.subscription_id,
                lesson_type: c.lesson_type,
            });
            if c.is_fully_used {
                used.push(Event::ClassUsed { id: c.id });
            }
        }
        events.extend(assignments);
        events.extend(used);

        journal
            .compact(&events)
            .map_err(|e| StoreError::WalError(e.to_string()))?;
        tracing::info!("compacted journal to {} events", events.len());
        Ok(())
    }

    pub async fn journal_appends_since_compact(&self) -> u64 {
        self.journal.lock().await.appends_since_compact()
    }
}
