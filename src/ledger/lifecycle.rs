//! Event Lifecycle Controller
//!
//! Single source of truth for deriving an event's status from wall-clock time:
//! - `upcoming` before the start time
//! - `live` within [start, start + duration)
//! - `completed` from start + duration onwards
//!
//! Status only ever moves forward. An event whose whole window has already
//! passed goes straight from `upcoming` to `completed`.

use crate::error::LedgerResult;
use crate::models::{event_duration, EventFilter, EventStatus};
use crate::store::LedgerStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Status an event should carry at `now`.
pub fn derive_status(start: DateTime<Utc>, duration: Duration, now: DateTime<Utc>) -> EventStatus {
    if now >= start + duration {
        EventStatus::Completed
    } else if now >= start {
        EventStatus::Live
    } else {
        EventStatus::Upcoming
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub live_updated: usize,
    pub completed_updated: usize,
}

#[derive(Debug, Clone)]
pub struct LifecycleController {
    duration: Duration,
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new(event_duration())
    }
}

impl LifecycleController {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Advance every non-terminal event whose start time has passed.
    pub fn advance(&self, store: &dyn LedgerStore, now: DateTime<Utc>) -> LedgerResult<LifecycleReport> {
        let candidates = store.scan_events(&EventFilter {
            statuses: vec![EventStatus::Upcoming, EventStatus::Live],
            starts_until: Some(now),
            ..Default::default()
        })?;

        let mut report = LifecycleReport::default();
        for event in candidates {
            let target = derive_status(event.start_time, self.duration, now);
            if target.rank() <= event.status.rank() {
                continue;
            }

            match store.update_event_status(&event.id, target) {
                Ok(true) => {
                    debug!(
                        event_id = %event.id,
                        from = event.status.as_str(),
                        to = target.as_str(),
                        "Event status advanced"
                    );
                    match target {
                        EventStatus::Live => report.live_updated += 1,
                        EventStatus::Completed => report.completed_updated += 1,
                        EventStatus::Upcoming => {}
                    }
                }
                // Another pass got there first
                Ok(false) => {}
                Err(e) if e.is_per_entity() => {
                    warn!(event_id = %event.id, "Skipping event status update: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        if report.live_updated + report.completed_updated > 0 {
            info!(
                "⏱️ Events advanced: {} live, {} completed",
                report.live_updated, report.completed_updated
            );
        }
        Ok(report)
    }
}
