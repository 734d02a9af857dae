use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default revision threshold: the loop stops once the count exceeds it
pub const DEFAULT_REVISION_THRESHOLD: usize = 4;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The editor approved the draft
    Approved,
    /// The revision count exceeded the threshold without approval
    RevisionLimit,
}

/// Route chosen after each editor pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", content = "reason", rename_all = "snake_case")]
pub enum Route {
    /// Send the draft back to the writer
    Continue,
    /// Stop the loop
    Done(Termination),
}

/// Whether a critique approves the draft.
///
/// Only the prefix is inspected, case-insensitively, so "Yes, but shorten it"
/// counts as approval.
pub fn is_approval(critique: &str) -> bool {
    critique.to_lowercase().starts_with("yes")
}

impl Route {
    /// Decide the next route from the latest critique and revision count.
    ///
    /// Approval wins over the revision threshold; the threshold only forces a
    /// stop once `revision_count` is strictly greater than it.
    pub fn decide(critique: &str, revision_count: usize, revision_threshold: usize) -> Self {
        let route = if is_approval(critique) {
            Route::Done(Termination::Approved)
        } else if revision_count > revision_threshold {
            Route::Done(Termination::RevisionLimit)
        } else {
            Route::Continue
        };

        debug!(
            revision_count,
            revision_threshold,
            route = %route.short_description(),
            "Routed editor critique"
        );
        route
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Route::Done(_))
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Route::Continue)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Route::Done(Termination::Approved))
    }

    /// Get a short description of the route for logging
    pub fn short_description(&self) -> String {
        match self {
            Route::Continue => "REVISE".to_string(),
            Route::Done(Termination::Approved) => "APPROVED".to_string(),
            Route::Done(Termination::RevisionLimit) => "STOPPED (revision limit)".to_string(),
        }
    }
}
