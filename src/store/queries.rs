use ulid::Ulid;

use crate::model::*;

use super::Store;

impl Store {
    pub fn customer(&self, id: &Ulid) -> Option<Customer> {
        self.customers.get(id).map(|c| c.value().clone())
    }

    pub fn teacher(&self, id: &Ulid) -> Option<Teacher> {
        self.teachers.get(id).map(|t| t.value().clone())
    }

    pub fn lesson(&self, id: &Ulid) -> Option<Lesson> {
        self.lessons.get(id).map(|l| l.value().clone())
    }

    pub fn subscription(&self, id: &Ulid) -> Option<Subscription> {
        self.subscriptions.get(id).map(|s| s.value().clone())
    }

    pub fn class(&self, id: &Ulid) -> Option<Class> {
        self.classes.get(id).map(|c| c.value().clone())
    }

    pub fn entry(&self, id: &Ulid) -> Option<EntryInfo> {
        self.entries.get(id).map(|e| EntryInfo::from(e.value()))
    }

    pub fn entry_state(&self, id: &Ulid) -> Option<EntryState> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.subscriptions.iter().map(|s| s.value().clone()).collect()
    }

    pub fn classes_of_subscription(&self, subscription_id: &Ulid) -> Vec<Class> {
        let ids = self
            .subscription_classes
            .get(subscription_id)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        ids.iter().filter_map(|id| self.class(id)).collect()
    }

    /// True when the subscription issued at least one class and all of them are used.
    pub fn subscription_exhausted(&self, subscription_id: &Ulid) -> bool {
        let classes = self.classes_of_subscription(subscription_id);
        !classes.is_empty() && classes.iter().all(Class::is_used)
    }

    /// Whether any class of the subscription currently holds a slot it hasn't used.
    pub fn has_scheduled_class(&self, subscription_id: &Ulid) -> bool {
        self.classes_of_subscription(subscription_id)
            .iter()
            .any(Class::is_scheduled)
    }

    /// End of the latest entry among the subscription's used classes.
    pub fn latest_used_class_end(&self, subscription_id: &Ulid) -> Option<Ms> {
        self.classes_of_subscription(subscription_id)
            .iter()
            .filter(|c| c.is_used())
            .filter_map(|c| c.entry_id)
            .filter_map(|eid| self.entries.get(&eid).map(|e| e.span.end))
            .max()
    }

    /// Default scope: active entries only, ordered by start.
    pub fn active_entries(&self) -> Vec<EntryInfo> {
        let mut out: Vec<EntryInfo> = self
            .entries
            .iter()
            .filter(|e| e.active)
            .map(|e| EntryInfo::from(e.value()))
            .collect();
        out.sort_by_key(|e| (e.start, e.id));
        out
    }

    pub fn entries_of_teacher(&self, teacher_id: &Ulid) -> Vec<EntryInfo> {
        let mut out: Vec<EntryInfo> = self
            .entries
            .iter()
            .filter(|e| e.active && e.teacher_id == *teacher_id)
            .map(|e| EntryInfo::from(e.value()))
            .collect();
        out.sort_by_key(|e| (e.start, e.id));
        out
    }

    /// Active, unfinished entries whose end plus `lag` is at or before `now`.
    pub fn entries_ended_before(&self, now: Ms, lag: Ms) -> Vec<Ulid> {
        let mut due: Vec<(Ms, Ulid)> = self
            .entries
            .iter()
            .filter(|e| e.active && !e.is_finished && now >= e.span.end + lag)
            .map(|e| (e.span.end, e.id))
            .collect();
        due.sort();
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Human-readable name: the lesson name, plus the customers once someone booked it.
    pub fn entry_title(&self, id: &Ulid) -> Option<String> {
        let entry = self.entry_state(id)?;
        let lesson = self.lesson(&entry.lesson_id)?;
        let customers: Vec<String> = entry
            .classes
            .iter()
            .filter_map(|cid| self.class(cid))
            .filter_map(|c| self.customer(&c.customer_id))
            .map(|c| c.name)
            .collect();
        if customers.is_empty() {
            Some(lesson.name)
        } else {
            Some(format!("{} with {}", lesson.name, customers.join(", ")))
        }
    }
}
