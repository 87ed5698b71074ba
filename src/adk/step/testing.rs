// SPDX-License-Identifier: MIT

//! Scripted step used by unit tests across the crate

use super::{Step, StepResult};
use crate::adk::error::StepError;
use crate::adk::state::{StateDelta, StateField, StateView};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Returns scripted results in order and records every view it was given.
/// Once the script runs out the last result is repeated.
pub(crate) struct ScriptedStep {
    name: String,
    reads: Vec<StateField>,
    writes: StateField,
    script: Mutex<VecDeque<Result<StepResult, StepError>>>,
    last: Mutex<Option<StepResult>>,
    calls: AtomicUsize,
    views: Mutex<Vec<StateView>>,
}

impl ScriptedStep {
    pub(crate) fn new(
        name: &str,
        reads: &[StateField],
        writes: StateField,
        script: Vec<Result<StepResult, StepError>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            reads: reads.to_vec(),
            writes,
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            views: Mutex::new(Vec::new()),
        }
    }

    /// A step that answers with the given texts in order
    pub(crate) fn texts(name: &str, reads: &[StateField], writes: StateField, texts: &[&str]) -> Self {
        let script = texts
            .iter()
            .map(|t| Ok(StepResult::Continue(StateDelta::new(writes, *t))))
            .collect();
        Self::new(name, reads, writes, script)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn views(&self) -> Vec<StateView> {
        self.views.lock().unwrap().clone()
    }
}

#[async_trait]
impl Step for ScriptedStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> &[StateField] {
        &self.reads
    }

    fn writes(&self) -> StateField {
        self.writes
    }

    async fn invoke(&self, view: &StateView) -> Result<StepResult, StepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.views.lock().unwrap().push(view.clone());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(result)) => {
                *self.last.lock().unwrap() = Some(result.clone());
                Ok(result)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| StepError::unexpected_exit(self.name.clone())),
        }
    }
}
