//! Timeline entry completion.

use tracing::{debug, info};
use ulid::Ulid;

use crate::clock::Clock;
use crate::model::{HOUR, Ms};
use crate::store::{Store, StoreError, ValidationError};

/// How long after its nominal end an entry is left alone before the sweep finishes it.
pub const COMPLETION_LAG: Ms = HOUR;

/// Unfinished entries whose end lies at least [`COMPLETION_LAG`] before `now`.
pub fn to_be_marked_as_finished(store: &Store, now: Ms) -> Vec<Ulid> {
    store.entries_ended_before(now, COMPLETION_LAG)
}

/// Whether the entry's end has passed. `None` for an unknown entry.
pub fn is_in_past(store: &Store, entry_id: &Ulid, now: Ms) -> Option<bool> {
    store.entry(entry_id).map(|e| e.end < now)
}

/// The periodic completion sweep. Returns how many entries it finished.
pub async fn finish_due_entries(store: &Store, clock: &dyn Clock) -> Result<usize, StoreError> {
    let started = std::time::Instant::now();
    let mut finished = 0;
    for entry_id in to_be_marked_as_finished(store, clock.now()) {
        match store.mark_entry_finished(entry_id).await {
            Ok(()) => {
                finished += 1;
                metrics::counter!(crate::observability::ENTRIES_FINISHED_TOTAL).increment(1);
                info!("marked entry {entry_id} as finished");
            }
            // Finished by hand between selection and now.
            Err(StoreError::Validation(ValidationError::AlreadyFinished(_))) => {
                debug!("entry {entry_id} already finished");
            }
            Err(e) => return Err(e),
        }
    }
    metrics::histogram!(crate::observability::SWEEP_DURATION_SECONDS, "sweep" => "finish_entries")
        .record(started.elapsed().as_secs_f64());
    Ok(finished)
}
