use serde::{Deserialize, Serialize};

/// The value threaded through the writer/editor loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Current draft. Starts as the topic and is replaced by every writer pass.
    pub draft: String,
    /// Latest editor critique, empty until the first review
    pub critique: String,
    /// Completed editor passes
    pub revision_count: usize,
}

/// Fields changed by one node. `None` leaves the field untouched on merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    pub draft: Option<String>,
    pub critique: Option<String>,
    pub revision_count: Option<usize>,
}

impl StateDelta {
    /// Delta produced by the writer
    pub fn draft(draft: impl Into<String>) -> Self {
        Self {
            draft: Some(draft.into()),
            ..Default::default()
        }
    }

    /// Delta produced by the editor
    pub fn review(critique: impl Into<String>, revision_count: usize) -> Self {
        Self {
            critique: Some(critique.into()),
            revision_count: Some(revision_count),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.draft.is_none() && self.critique.is_none() && self.revision_count.is_none()
    }
}

impl WorkflowState {
    pub fn new(initial_draft: impl Into<String>) -> Self {
        Self {
            draft: initial_draft.into(),
            critique: String::new(),
            revision_count: 0,
        }
    }

    /// Apply a node's delta, returning the next state
    pub fn merge(self, delta: StateDelta) -> Self {
        Self {
            draft: delta.draft.unwrap_or(self.draft),
            critique: delta.critique.unwrap_or(self.critique),
            revision_count: delta.revision_count.unwrap_or(self.revision_count),
        }
    }

    pub fn has_critique(&self) -> bool {
        !self.critique.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_unreviewed() {
        let state = WorkflowState::new("AI is changing everything.");
        assert_eq!(state.draft, "AI is changing everything.");
        assert!(state.critique.is_empty());
        assert_eq!(state.revision_count, 0);
        assert!(!state.has_critique());
    }

    #[test]
    fn test_merge_only_touches_changed_fields() {
        let state = WorkflowState {
            draft: "old".into(),
            critique: "too long".into(),
            revision_count: 2,
        };

        let state = state.merge(StateDelta::draft("new"));
        assert_eq!(state.draft, "new");
        assert_eq!(state.critique, "too long");
        assert_eq!(state.revision_count, 2);

        let state = state.merge(StateDelta::review("YES", 3));
        assert_eq!(state.draft, "new");
        assert_eq!(state.critique, "YES");
        assert_eq!(state.revision_count, 3);
    }

    #[test]
    fn test_empty_delta_is_identity() {
        let state = WorkflowState::new("topic");
        assert!(StateDelta::default().is_empty());
        assert_eq!(state.clone().merge(StateDelta::default()), state);
    }
}
