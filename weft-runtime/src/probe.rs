//! Construction timing.
//!
//! The probe wraps an optional host [`TimingFacility`]. Whether it is active
//! is decided once, when the runtime is built; an inactive probe turns every
//! call into a no-op so the pipeline never branches on the facility itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;
use weft_types::Uid;

/// Host facility that records instants and durations between them.
pub trait TimingFacility {
    fn mark(&self, tag: &str);
    fn measure(&self, name: &str, start_tag: &str, end_tag: &str);
    fn clear_marks(&self, tag: &str);
}

/// Paired start/end markers around instance construction.
#[derive(Clone, Default)]
pub struct PerformanceProbe {
    facility: Option<Arc<dyn TimingFacility>>,
}

impl PerformanceProbe {
    /// Active only when `enabled` and a facility is present.
    #[must_use]
    pub fn new(enabled: bool, facility: Option<Arc<dyn TimingFacility>>) -> Self {
        Self {
            facility: facility.filter(|_| enabled),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self { facility: None }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.facility.is_some()
    }

    pub fn mark(&self, tag: &str) {
        if let Some(facility) = &self.facility {
            facility.mark(tag);
        }
    }

    /// Records the duration between two marks, then clears both marks. The
    /// measurement itself is kept.
    pub fn measure(&self, name: &str, start_tag: &str, end_tag: &str) {
        if let Some(facility) = &self.facility {
            facility.measure(name, start_tag, end_tag);
            facility.clear_marks(start_tag);
            facility.clear_marks(end_tag);
        }
    }
}

/// Start and end tags for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfTags {
    pub start: String,
    pub end: String,
}

impl PerfTags {
    #[must_use]
    pub fn for_uid(uid: Uid) -> Self {
        Self {
            start: format!("weft-perf-start:{uid}"),
            end: format!("weft-perf-end:{uid}"),
        }
    }
}

/// One recorded measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub name: String,
    pub duration: Duration,
}

/// In-process [`TimingFacility`] backed by [`Instant`].
#[derive(Debug, Default)]
pub struct InMemoryTimeline {
    marks: Mutex<HashMap<String, Instant>>,
    measures: Mutex<Vec<Measure>>,
}

impl InMemoryTimeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of marks currently held.
    #[must_use]
    pub fn mark_count(&self) -> usize {
        self.marks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn measures(&self) -> Vec<Measure> {
        self.measures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TimingFacility for InMemoryTimeline {
    fn mark(&self, tag: &str) {
        self.marks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tag.to_string(), Instant::now());
    }

    fn measure(&self, name: &str, start_tag: &str, end_tag: &str) {
        let marks = self.marks.lock().unwrap_or_else(PoisonError::into_inner);
        let (Some(start), Some(end)) = (marks.get(start_tag), marks.get(end_tag)) else {
            debug!(name, start_tag, end_tag, "measure skipped, mark missing");
            return;
        };
        let duration = end.saturating_duration_since(*start);
        drop(marks);
        self.measures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Measure {
                name: name.to_string(),
                duration,
            });
    }

    fn clear_marks(&self, tag: &str) {
        self.marks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(tag);
    }
}
