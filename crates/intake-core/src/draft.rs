//! Editable workflow state
//!
//! A [`WorkflowDraft`] is owned by whoever drives the form. It is handed to
//! each action and handed back, never kept in ambient state.

use serde::{Deserialize, Serialize};

/// One step of a described workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepRecord {
    pub title: String,
    pub description: String,
    pub inputs: String,
    pub outputs: String,
}

impl StepRecord {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        inputs: impl Into<String>,
        outputs: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            inputs: inputs.into(),
            outputs: outputs.into(),
        }
    }
}

/// In-memory form state for a workflow description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowDraft {
    pub title: String,
    /// Email or name; also the top-level storage directory
    pub contact: String,
    pub contact_consent: bool,
    pub description: String,
    pub research_notes: String,
    /// Where the sample data comes from
    pub input_details: String,
    /// Position in this list is the step's display index
    pub steps: Vec<StepRecord>,
}

impl WorkflowDraft {
    /// Create an empty draft for a new session
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty step and return its index.
    ///
    /// Existing steps keep their indices.
    pub fn add_step(&mut self) -> usize {
        self.steps.push(StepRecord::default());
        self.steps.len() - 1
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut StepRecord> {
        self.steps.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_step_appends_in_order() {
        let mut draft = WorkflowDraft::new();
        assert_eq!(draft.add_step(), 0);
        draft.step_mut(0).unwrap().title = "first".to_string();
        assert_eq!(draft.add_step(), 1);
        assert_eq!(draft.steps[0].title, "first");
        assert_eq!(draft.steps[1], StepRecord::default());
        assert!(draft.step_mut(2).is_none());
    }

    #[test]
    fn test_draft_json_uses_camel_case_and_defaults() {
        let draft: WorkflowDraft = serde_json::from_str(
            r#"{"title": "T", "contact": "c", "researchNotes": "R", "steps": [{"title": "s"}]}"#,
        )
        .unwrap();
        assert_eq!(draft.research_notes, "R");
        assert!(!draft.contact_consent);
        assert_eq!(draft.steps[0].inputs, "");

        let json = serde_json::to_value(&draft).unwrap();
        assert!(json.get("contactConsent").is_some());
        assert!(json.get("inputDetails").is_some());
    }
}
