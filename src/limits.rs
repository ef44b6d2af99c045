use crate::model::{DAY, Ms};

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_EMAIL_LEN: usize = 320;

/// Largest class count a single lesson/event may hold.
pub const MAX_SLOTS: u32 = 1_000;
pub const MAX_LESSON_DURATION_MS: Ms = DAY;
pub const MAX_CLASSES_PER_SUBSCRIPTION: usize = 500;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;
