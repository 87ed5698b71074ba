// SPDX-License-Identifier: MIT

//! Shared workflow state
//!
//! This module provides:
//! - `StateField` - the fixed set of fields a step may read or write
//! - `Reducer` - how a written value is merged into a field
//! - `WorkflowState` - the single record threaded through a run
//! - `StateView` - the read-only subset of fields a step declared
//! - `StateDelta` - a single-field update returned by a step

use crate::adk::error::StateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator placed between successive user replies in `raw_input`
pub const RAW_INPUT_SEPARATOR: &str = "\n and: ";

/// Fields of the shared workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    RawInput,
    Topic,
    Document,
    Critique,
    Title,
}

impl StateField {
    pub const ALL: [StateField; 5] = [
        StateField::RawInput,
        StateField::Topic,
        StateField::Document,
        StateField::Critique,
        StateField::Title,
    ];

    /// Key used in templates and configuration files
    pub fn key(self) -> &'static str {
        match self {
            StateField::RawInput => "raw_input",
            StateField::Topic => "topic",
            StateField::Document => "document",
            StateField::Critique => "critique",
            StateField::Title => "title",
        }
    }

    /// Look up a field by its key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Merge strategy for the field
    pub fn reducer(self) -> Reducer {
        match self {
            StateField::RawInput => Reducer::Append {
                separator: RAW_INPUT_SEPARATOR,
            },
            _ => Reducer::Overwrite,
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reducer types for merging values into state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// Replace the value
    Overwrite,
    /// Concatenate onto the existing value with a fixed separator
    Append { separator: &'static str },
}

/// A single-field update produced by a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDelta {
    pub field: StateField,
    pub value: String,
}

impl StateDelta {
    pub fn new(field: StateField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// The mutable record threaded through one workflow run
///
/// A fresh value is created per run and owned by the caller; steps never see
/// it directly, only a [`StateView`] of the fields they declared.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowState {
    raw_input: String,
    topic: String,
    document: String,
    critique: String,
    title: String,
    /// Set by the first write to `document`
    drafted: bool,
    /// Set by a critique write, cleared once a refine step consumed it
    critique_fresh: bool,
    /// Set once the canonical topic marker has been accepted
    topic_locked: bool,
}

impl WorkflowState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state seeded with the user's first message
    pub fn with_raw_input(input: impl Into<String>) -> Self {
        Self {
            raw_input: input.into(),
            ..Self::default()
        }
    }

    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn critique(&self) -> &str {
        &self.critique
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_drafted(&self) -> bool {
        self.drafted
    }

    pub fn is_topic_locked(&self) -> bool {
        self.topic_locked
    }

    /// Get a field value by name
    pub fn get(&self, field: StateField) -> &str {
        match field {
            StateField::RawInput => &self.raw_input,
            StateField::Topic => &self.topic,
            StateField::Document => &self.document,
            StateField::Critique => &self.critique,
            StateField::Title => &self.title,
        }
    }

    fn slot(&mut self, field: StateField) -> &mut String {
        match field {
            StateField::RawInput => &mut self.raw_input,
            StateField::Topic => &mut self.topic,
            StateField::Document => &mut self.document,
            StateField::Critique => &mut self.critique,
            StateField::Title => &mut self.title,
        }
    }

    /// Merge a delta using the field's reducer
    pub fn apply(&mut self, delta: StateDelta) -> Result<(), StateError> {
        if delta.field == StateField::Topic && self.topic_locked {
            return Err(StateError::TopicLocked);
        }

        match delta.field.reducer() {
            Reducer::Overwrite => *self.slot(delta.field) = delta.value,
            Reducer::Append { separator } => {
                let slot = self.slot(delta.field);
                slot.push_str(separator);
                slot.push_str(&delta.value);
            }
        }

        match delta.field {
            StateField::Document => self.drafted = true,
            StateField::Critique => self.critique_fresh = true,
            _ => {}
        }
        Ok(())
    }

    /// Append one line of user input to `raw_input`
    pub fn append_user_input(&mut self, line: &str) {
        let slot = &mut self.raw_input;
        slot.push_str(RAW_INPUT_SEPARATOR);
        slot.push_str(line);
    }

    /// Freeze the topic after the canonical marker was accepted
    pub fn lock_topic(&mut self) {
        self.topic_locked = true;
    }

    /// Mark the current critique as used by a refine step
    pub fn consume_critique(&mut self) {
        self.critique_fresh = false;
    }

    /// Build the read-only view for a step's declared fields
    pub fn view(&self, reads: &[StateField]) -> Result<StateView, StateError> {
        let mut fields = BTreeMap::new();
        for &field in reads {
            match field {
                StateField::Document if !self.drafted => {
                    return Err(StateError::DocumentNotDrafted)
                }
                StateField::Critique if !self.critique_fresh => {
                    return Err(StateError::StaleCritique)
                }
                _ => {}
            }
            fields.insert(field, self.get(field).to_string());
        }
        Ok(StateView { fields })
    }

    /// Convert state to a JSON snapshot for diagnostics
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Read-only subset of the state visible to one step invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateView {
    fields: BTreeMap<StateField, String>,
}

impl StateView {
    /// Build a view directly from field values
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (StateField, S)>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(f, v)| (f, v.into())).collect(),
        }
    }

    /// Get a visible field, `None` when the field was not declared
    pub fn get(&self, field: StateField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: StateField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = StateField> + '_ {
        self.fields.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state() {
        let state = WorkflowState::new();
        for field in StateField::ALL {
            assert_eq!(state.get(field), "");
        }
        assert!(!state.is_drafted());
    }

    #[test]
    fn test_field_keys_round_trip() {
        for field in StateField::ALL {
            assert_eq!(StateField::from_key(field.key()), Some(field));
        }
        assert_eq!(StateField::from_key("current_document"), None);
    }

    #[test]
    fn test_overwrite_reducer() {
        let mut state = WorkflowState::new();
        state
            .apply(StateDelta::new(StateField::Document, "first"))
            .unwrap();
        state
            .apply(StateDelta::new(StateField::Document, "second"))
            .unwrap();
        assert_eq!(state.document(), "second");
    }

    #[test]
    fn test_raw_input_appends_with_separator() {
        let mut state = WorkflowState::with_raw_input("a robot");
        state.append_user_input("comedy");
        state
            .apply(StateDelta::new(StateField::RawInput, "in Paris"))
            .unwrap();
        assert_eq!(state.raw_input(), "a robot\n and: comedy\n and: in Paris");
    }

    #[test]
    fn test_append_onto_empty_input_keeps_separator() {
        let mut state = WorkflowState::new();
        state.append_user_input("a robot");
        assert_eq!(state.raw_input(), "\n and: a robot");
    }

    #[test]
    fn test_document_hidden_until_drafted() {
        let mut state = WorkflowState::new();
        assert_eq!(
            state.view(&[StateField::Document]),
            Err(StateError::DocumentNotDrafted)
        );

        state
            .apply(StateDelta::new(StateField::Document, "Once upon a time"))
            .unwrap();
        let view = state.view(&[StateField::Document]).unwrap();
        assert_eq!(view.get(StateField::Document), Some("Once upon a time"));
    }

    #[test]
    fn test_critique_must_be_fresh() {
        let mut state = WorkflowState::new();
        assert_eq!(
            state.view(&[StateField::Critique]),
            Err(StateError::StaleCritique)
        );

        state
            .apply(StateDelta::new(StateField::Critique, "Needs a twist"))
            .unwrap();
        assert!(state.view(&[StateField::Critique]).is_ok());

        state.consume_critique();
        assert_eq!(
            state.view(&[StateField::Critique]),
            Err(StateError::StaleCritique)
        );
    }

    #[test]
    fn test_locked_topic_refuses_writes() {
        let mut state = WorkflowState::new();
        state
            .apply(StateDelta::new(
                StateField::Topic,
                "STORY: [topic: a lighthouse, theme: horror]",
            ))
            .unwrap();
        state.lock_topic();

        let err = state
            .apply(StateDelta::new(StateField::Topic, "something else"))
            .unwrap_err();
        assert_eq!(err, StateError::TopicLocked);
        assert_eq!(state.topic(), "STORY: [topic: a lighthouse, theme: horror]");
    }

    #[test]
    fn test_view_contains_only_declared_fields() {
        let mut state = WorkflowState::with_raw_input("hello");
        state
            .apply(StateDelta::new(StateField::Topic, "provisional"))
            .unwrap();

        let view = state.view(&[StateField::Topic]).unwrap();
        assert_eq!(view.get(StateField::Topic), Some("provisional"));
        assert_eq!(view.get(StateField::RawInput), None);
        assert_eq!(view.fields().collect::<Vec<_>>(), vec![StateField::Topic]);
    }

    #[test]
    fn test_to_json_snapshot() {
        let mut state = WorkflowState::with_raw_input("a robot");
        state
            .apply(StateDelta::new(StateField::Document, "draft"))
            .unwrap();

        let json = state.to_json();
        assert_eq!(json["raw_input"], "a robot");
        assert_eq!(json["document"], "draft");
        assert_eq!(json["drafted"], true);
    }
}
