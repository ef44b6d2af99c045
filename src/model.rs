use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds. The only time type.
pub type Ms = i64;

pub const MINUTE: Ms = 60_000;
pub const HOUR: Ms = 60 * MINUTE;
pub const DAY: Ms = 24 * HOUR;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Span of `duration` starting at `start`.
    pub fn starting_at(start: Ms, duration: Ms) -> Self {
        Self::new(start, start + duration)
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }
}

/// Variant tag of a lesson definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LessonType {
    Ordinary,
    HostedEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonKind {
    /// One-to-one lesson any teacher may give.
    Ordinary,
    /// Master class, happy hour and the like. A set `host` pins the event to that teacher.
    HostedEvent { host: Option<Ulid> },
}

impl LessonKind {
    pub fn lesson_type(&self) -> LessonType {
        match self {
            LessonKind::Ordinary => LessonType::Ordinary,
            LessonKind::HostedEvent { .. } => LessonType::HostedEvent,
        }
    }

    pub fn required_host(&self) -> Option<Ulid> {
        match self {
            LessonKind::Ordinary => None,
            LessonKind::HostedEvent { host } => *host,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Ulid,
    pub name: String,
    /// How many classes one entry of this lesson can hold.
    pub slots: u32,
    pub duration: Ms,
    pub kind: LessonKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Ulid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: Ulid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub buy_date: Ms,
    pub is_fully_used: bool,
    /// Never decreases once set.
    pub last_notified_unused: Option<Ms>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: Ulid,
    pub customer_id: Ulid,
    pub subscription_id: Option<Ulid>,
    pub lesson_type: LessonType,
    pub entry_id: Option<Ulid>,
    pub is_fully_used: bool,
}

impl Class {
    pub fn is_scheduled(&self) -> bool {
        self.entry_id.is_some() && !self.is_fully_used
    }

    pub fn is_used(&self) -> bool {
        self.is_fully_used
    }
}

/// A bookable slot on a teacher's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryState {
    pub id: Ulid,
    pub teacher_id: Ulid,
    pub lesson_id: Ulid,
    pub lesson_type: LessonType,
    pub span: Span,
    /// Capacity, copied from the lesson at scheduling time.
    pub slots: u32,
    /// Assigned class ids in assignment order.
    pub classes: Vec<Ulid>,
    pub active: bool,
    pub is_finished: bool,
}

impl EntryState {
    pub fn new(id: Ulid, teacher_id: Ulid, lesson_id: Ulid, lesson_type: LessonType, span: Span, slots: u32) -> Self {
        Self {
            id,
            teacher_id,
            lesson_id,
            lesson_type,
            span,
            slots,
            classes: Vec::new(),
            active: true,
            is_finished: false,
        }
    }

    pub fn taken_slots(&self) -> u32 {
        self.classes.len() as u32
    }

    pub fn is_free(&self) -> bool {
        self.taken_slots() < self.slots
    }

    pub fn is_in_past(&self, now: Ms) -> bool {
        self.span.end < now
    }

    pub fn add_class(&mut self, class_id: Ulid) {
        if !self.classes.contains(&class_id) {
            self.classes.push(class_id);
        }
    }

    pub fn remove_class(&mut self, class_id: Ulid) -> bool {
        if let Some(pos) = self.classes.iter().position(|c| *c == class_id) {
            self.classes.remove(pos);
            true
        } else {
            false
        }
    }
}

/// Journal record format. Flat, no nesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    CustomerRegistered {
        id: Ulid,
        name: String,
        email: String,
    },
    TeacherRegistered {
        id: Ulid,
        name: String,
    },
    LessonDefined {
        id: Ulid,
        name: String,
        slots: u32,
        duration: Ms,
        kind: LessonKind,
    },
    SubscriptionPurchased {
        id: Ulid,
        customer_id: Ulid,
        buy_date: Ms,
    },
    SubscriptionFullyUsed {
        id: Ulid,
    },
    UnusedNotificationStamped {
        id: Ulid,
        at: Ms,
    },
    ClassIssued {
        id: Ulid,
        customer_id: Ulid,
        subscription_id: Option<Ulid>,
        lesson_type: LessonType,
    },
    ClassUsed {
        id: Ulid,
    },
    EntryScheduled {
        id: Ulid,
        teacher_id: Ulid,
        lesson_id: Ulid,
        lesson_type: LessonType,
        span: Span,
        slots: u32,
    },
    EntryDeactivated {
        id: Ulid,
    },
    EntryFinished {
        id: Ulid,
    },
    ClassAssigned {
        class_id: Ulid,
        entry_id: Ulid,
    },
    ClassUnassigned {
        class_id: Ulid,
        entry_id: Ulid,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub id: Ulid,
    pub teacher_id: Ulid,
    pub lesson_id: Ulid,
    pub lesson_type: LessonType,
    pub start: Ms,
    pub end: Ms,
    pub slots: u32,
    pub taken_slots: u32,
    pub is_free: bool,
    pub active: bool,
    pub is_finished: bool,
}

impl From<&EntryState> for EntryInfo {
    fn from(e: &EntryState) -> Self {
        Self {
            id: e.id,
            teacher_id: e.teacher_id,
            lesson_id: e.lesson_id,
            lesson_type: e.lesson_type,
            start: e.span.start,
            end: e.span.end,
            slots: e.slots,
            taken_slots: e.taken_slots(),
            is_free: e.is_free(),
            active: e.active,
            is_finished: e.is_finished,
        }
    }
}
