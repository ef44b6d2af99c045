use ulid::Ulid;

use crate::model::LessonType;

/// A rule rejected the write. The caller must drop or correct the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The lesson is a hosted event pinned to `required`, but the entry belongs to `teacher`.
    HostMismatch { required: Ulid, teacher: Ulid },
    /// Every slot of the entry is taken.
    CapacityExceeded(u32),
    EntryInactive(Ulid),
    AlreadyFinished(Ulid),
    ClassAlreadyAssigned(Ulid),
    ClassNotAssigned(Ulid),
    ClassAlreadyUsed(Ulid),
    LessonTypeMismatch {
        class: LessonType,
        entry: LessonType,
    },
    InvalidLesson(&'static str),
}

impl ValidationError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::HostMismatch { .. } => "host_mismatch",
            ValidationError::CapacityExceeded(_) => "capacity_exceeded",
            ValidationError::EntryInactive(_) => "entry_inactive",
            ValidationError::AlreadyFinished(_) => "already_finished",
            ValidationError::ClassAlreadyAssigned(_) => "class_already_assigned",
            ValidationError::ClassNotAssigned(_) => "class_not_assigned",
            ValidationError::ClassAlreadyUsed(_) => "class_already_used",
            ValidationError::LessonTypeMismatch { .. } => "lesson_type_mismatch",
            ValidationError::InvalidLesson(_) => "invalid_lesson",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::HostMismatch { required, teacher } => write!(
                f,
                "event is hosted by teacher {required}, cannot be scheduled for teacher {teacher}"
            ),
            ValidationError::CapacityExceeded(slots) => {
                write!(f, "capacity {slots} exceeded: all slots taken")
            }
            ValidationError::EntryInactive(id) => write!(f, "entry {id} is not active"),
            ValidationError::AlreadyFinished(id) => write!(f, "entry {id} is already finished"),
            ValidationError::ClassAlreadyAssigned(id) => {
                write!(f, "class {id} is already assigned to an entry")
            }
            ValidationError::ClassNotAssigned(id) => {
                write!(f, "class {id} is not assigned to an entry")
            }
            ValidationError::ClassAlreadyUsed(id) => write!(f, "class {id} is already used"),
            ValidationError::LessonTypeMismatch { class, entry } => write!(
                f,
                "class of type {class:?} cannot take a slot of type {entry:?}"
            ),
            ValidationError::InvalidLesson(msg) => write!(f, "invalid lesson: {msg}"),
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    NotFound(Ulid),
    AlreadyExists(Ulid),
    Validation(ValidationError),
    LimitExceeded(&'static str),
    WalError(String),
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}

impl From<ValidationError> for StoreError {
    fn from(e: ValidationError) -> Self {
        metrics::counter!(crate::observability::VALIDATION_FAILURES_TOTAL, "reason" => e.reason())
            .increment(1);
        StoreError::Validation(e)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "not found: {id}"),
            StoreError::AlreadyExists(id) => write!(f, "already exists: {id}"),
            StoreError::Validation(e) => write!(f, "validation failed: {e}"),
            StoreError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            StoreError::WalError(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_display() {
        let err = StoreError::from(ValidationError::CapacityExceeded(10));
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "validation failed: capacity 10 exceeded: all slots taken");

        let host = Ulid::new();
        let other = Ulid::new();
        let msg = ValidationError::HostMismatch { required: host, teacher: other }.to_string();
        assert!(msg.contains(&host.to_string()));
        assert!(msg.contains(&other.to_string()));
    }

    #[test]
    fn non_validation_errors() {
        let id = Ulid::new();
        let err = StoreError::NotFound(id);
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), format!("not found: {id}"));
        assert_eq!(
            StoreError::LimitExceeded("name too long").to_string(),
            "limit exceeded: name too long"
        );
    }
}
