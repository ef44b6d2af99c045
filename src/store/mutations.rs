use ulid::Ulid;

use crate::journal::Journal;
use crate::limits::*;
use crate::model::*;

use super::{Store, StoreError, ValidationError};

fn validate_timestamp(t: Ms) -> Result<(), StoreError> {
    if !(MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&t) {
        return Err(StoreError::LimitExceeded("timestamp out of range"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.len() > MAX_NAME_LEN {
        return Err(StoreError::LimitExceeded("name too long"));
    }
    Ok(())
}

impl Store {
    pub async fn register_customer(&self, id: Ulid, name: String, email: String) -> Result<(), StoreError> {
        validate_name(&name)?;
        if email.len() > MAX_EMAIL_LEN {
            return Err(StoreError::LimitExceeded("email too long"));
        }
        let mut journal = self.writer().await;
        if self.customers.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        self.commit(&mut journal, Event::CustomerRegistered { id, name, email })
    }

    pub async fn register_teacher(&self, id: Ulid, name: String) -> Result<(), StoreError> {
        validate_name(&name)?;
        let mut journal = self.writer().await;
        if self.teachers.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        self.commit(&mut journal, Event::TeacherRegistered { id, name })
    }

    pub async fn define_lesson(
        &self,
        id: Ulid,
        name: String,
        slots: u32,
        duration: Ms,
        kind: LessonKind,
    ) -> Result<(), StoreError> {
        validate_name(&name)?;
        if slots == 0 {
            return Err(ValidationError::InvalidLesson("a lesson needs at least one slot").into());
        }
        if slots > MAX_SLOTS {
            return Err(StoreError::LimitExceeded("too many slots"));
        }
        if duration <= 0 {
            return Err(ValidationError::InvalidLesson("duration must be positive").into());
        }
        if duration > MAX_LESSON_DURATION_MS {
            return Err(StoreError::LimitExceeded("lesson too long"));
        }
        let mut journal = self.writer().await;
        if self.lessons.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        if let Some(host) = kind.required_host()
            && !self.teachers.contains_key(&host)
        {
            return Err(StoreError::NotFound(host));
        }
        self.commit(
            &mut journal,
            Event::LessonDefined {
                id,
                name,
                slots,
                duration,
                kind,
            },
        )
    }

    /// Create a subscription and issue one class per entry of `lessons`.
    /// Returns the issued class ids in the same order.
    pub async fn purchase_subscription(
        &self,
        id: Ulid,
        customer_id: Ulid,
        buy_date: Ms,
        lessons: &[LessonType],
    ) -> Result<Vec<Ulid>, StoreError> {
        validate_timestamp(buy_date)?;
        if lessons.len() > MAX_CLASSES_PER_SUBSCRIPTION {
            return Err(StoreError::LimitExceeded("too many classes in subscription"));
        }
        let mut journal = self.writer().await;
        if self.subscriptions.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        if !self.customers.contains_key(&customer_id) {
            return Err(StoreError::NotFound(customer_id));
        }

        self.commit(
            &mut journal,
            Event::SubscriptionPurchased {
                id,
                customer_id,
                buy_date,
            },
        )?;
        let mut class_ids = Vec::with_capacity(lessons.len());
        for lesson_type in lessons {
            let class_id = Ulid::new();
            self.commit(
                &mut journal,
                Event::ClassIssued {
                    id: class_id,
                    customer_id,
                    subscription_id: Some(id),
                    lesson_type: *lesson_type,
                },
            )?;
            class_ids.push(class_id);
        }
        Ok(class_ids)
    }

    /// Issue a single class outside any subscription.
    pub async fn add_class(&self, id: Ulid, customer_id: Ulid, lesson_type: LessonType) -> Result<(), StoreError> {
        let mut journal = self.writer().await;
        if self.classes.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        if !self.customers.contains_key(&customer_id) {
            return Err(StoreError::NotFound(customer_id));
        }
        self.commit(
            &mut journal,
            Event::ClassIssued {
                id,
                customer_id,
                subscription_id: None,
                lesson_type,
            },
        )
    }

    /// Put a lesson on a teacher's timeline. End, capacity and lesson type all come
    /// from the lesson definition.
    pub async fn schedule_entry(
        &self,
        id: Ulid,
        teacher_id: Ulid,
        lesson_id: Ulid,
        start: Ms,
    ) -> Result<EntryInfo, StoreError> {
        validate_timestamp(start)?;
        let mut journal = self.writer().await;
        if self.entries.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        if !self.teachers.contains_key(&teacher_id) {
            return Err(StoreError::NotFound(teacher_id));
        }
        let lesson = self
            .lesson(&lesson_id)
            .ok_or(StoreError::NotFound(lesson_id))?;
        if let Some(required) = lesson.kind.required_host()
            && required != teacher_id
        {
            return Err(ValidationError::HostMismatch {
                required,
                teacher: teacher_id,
            }
            .into());
        }

        let span = Span::starting_at(start, lesson.duration);
        self.commit(
            &mut journal,
            Event::EntryScheduled {
                id,
                teacher_id,
                lesson_id,
                lesson_type: lesson.kind.lesson_type(),
                span,
                slots: lesson.slots,
            },
        )?;
        self.entry(&id).ok_or(StoreError::NotFound(id))
    }

    pub async fn assign_class(&self, class_id: Ulid, entry_id: Ulid) -> Result<(), StoreError> {
        let mut journal = self.writer().await;
        let class = self.class(&class_id).ok_or(StoreError::NotFound(class_id))?;
        let entry = self
            .entry_state(&entry_id)
            .ok_or(StoreError::NotFound(entry_id))?;

        if !entry.active {
            return Err(ValidationError::EntryInactive(entry_id).into());
        }
        if entry.is_finished {
            return Err(ValidationError::AlreadyFinished(entry_id).into());
        }
        if class.is_fully_used {
            return Err(ValidationError::ClassAlreadyUsed(class_id).into());
        }
        if class.entry_id.is_some() {
            return Err(ValidationError::ClassAlreadyAssigned(class_id).into());
        }
        if class.lesson_type != entry.lesson_type {
            return Err(ValidationError::LessonTypeMismatch {
                class: class.lesson_type,
                entry: entry.lesson_type,
            }
            .into());
        }
        if !entry.is_free() {
            return Err(ValidationError::CapacityExceeded(entry.slots).into());
        }

        self.commit(&mut journal, Event::ClassAssigned { class_id, entry_id })
    }

    /// Release the slot a class holds. Returns the entry it was assigned to.
    pub async fn unassign_class(&self, class_id: Ulid) -> Result<Ulid, StoreError> {
        let mut journal = self.writer().await;
        let class = self.class(&class_id).ok_or(StoreError::NotFound(class_id))?;
        let entry_id = class
            .entry_id
            .ok_or(ValidationError::ClassNotAssigned(class_id))?;
        if class.is_fully_used {
            return Err(ValidationError::ClassAlreadyUsed(class_id).into());
        }
        self.commit(&mut journal, Event::ClassUnassigned { class_id, entry_id })?;
        Ok(entry_id)
    }

    pub async fn mark_class_used(&self, class_id: Ulid) -> Result<(), StoreError> {
        let mut journal = self.writer().await;
        let class = self.class(&class_id).ok_or(StoreError::NotFound(class_id))?;
        if class.entry_id.is_none() {
            return Err(ValidationError::ClassNotAssigned(class_id).into());
        }
        if class.is_fully_used {
            return Err(ValidationError::ClassAlreadyUsed(class_id).into());
        }
        self.use_class(&mut journal, &class)
    }

    /// Mark a class used, then flip its subscription once nothing in it is left.
    fn use_class(&self, journal: &mut Journal, class: &Class) -> Result<(), StoreError> {
        self.commit(journal, Event::ClassUsed { id: class.id })?;
        if let Some(sid) = class.subscription_id
            && self.subscription_exhausted(&sid)
        {
            self.commit(journal, Event::SubscriptionFullyUsed { id: sid })?;
            tracing::debug!("subscription {sid} fully used");
        }
        Ok(())
    }

    /// Finish an entry and use up every class it holds. One-way.
    pub async fn mark_entry_finished(&self, entry_id: Ulid) -> Result<(), StoreError> {
        let mut journal = self.writer().await;
        let entry = self
            .entry_state(&entry_id)
            .ok_or(StoreError::NotFound(entry_id))?;
        if entry.is_finished {
            return Err(ValidationError::AlreadyFinished(entry_id).into());
        }

        self.commit(&mut journal, Event::EntryFinished { id: entry_id })?;
        for class_id in &entry.classes {
            if let Some(class) = self.class(class_id)
                && !class.is_fully_used
            {
                self.use_class(&mut journal, &class)?;
            }
        }
        Ok(())
    }

    /// Take an entry off the timeline. Classes it holds but hasn't used go back to
    /// their owners; finished state and used classes are left as is.
    pub async fn deactivate_entry(&self, entry_id: Ulid) -> Result<(), StoreError> {
        let mut journal = self.writer().await;
        let entry = self
            .entry_state(&entry_id)
            .ok_or(StoreError::NotFound(entry_id))?;
        if !entry.active {
            return Ok(());
        }
        self.commit(&mut journal, Event::EntryDeactivated { id: entry_id })?;
        for class_id in &entry.classes {
            if self.class(class_id).is_some_and(|c| !c.is_fully_used) {
                self.commit(
                    &mut journal,
                    Event::ClassUnassigned {
                        class_id: *class_id,
                        entry_id,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// Record that the customer was told about the idle subscription at `at`.
    /// An older stamp than the current one is ignored; returns whether it was written.
    pub async fn stamp_unused_notification(&self, subscription_id: Ulid, at: Ms) -> Result<bool, StoreError> {
        let mut journal = self.writer().await;
        let sub = self
            .subscription(&subscription_id)
            .ok_or(StoreError::NotFound(subscription_id))?;
        if sub.last_notified_unused.is_some_and(|prev| prev > at) {
            return Ok(false);
        }
        self.commit(&mut journal, Event::UnusedNotificationStamped { id: subscription_id, at })?;
        Ok(true)
    }
}
