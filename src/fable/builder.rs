// SPDX-License-Identifier: MIT

//! Workflow builder - turns a workflow definition into a runnable pipeline
//!
//! The builder creates (or reuses) the model, builds one `LlmStep` per step
//! definition, and wires them into the collector, the guarded refinement
//! loop and the pipeline.

use crate::adk::error::ConfigError;
use crate::adk::model::openai::OpenAIModel;
use crate::adk::model::{GenerationConfig, Model, Provider};
use crate::adk::step::{LlmStep, Step, DEFAULT_STEP_TIMEOUT_SECS};
use crate::adk::tool::ExitTool;
use crate::fable::collect::TopicCollector;
use crate::fable::config::{ModelDefinition, StepDefinition, WorkflowDefinition, WorkflowLoader};
use crate::fable::events::WorkflowEvent;
use crate::fable::pipeline::StoryPipeline;
use crate::fable::refine::{RefinementLoop, SentinelGuard};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// High-level builder for story pipelines
#[derive(Default)]
pub struct Builder {
    loader: WorkflowLoader,
    model: Option<Arc<dyn Model>>,
    events: Option<mpsc::Sender<WorkflowEvent>>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this model for every step instead of creating one from the definition
    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_events(mut self, tx: mpsc::Sender<WorkflowEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Build a pipeline from a YAML file path
    pub fn build_file<P: AsRef<Path>>(&self, path: P) -> Result<StoryPipeline, ConfigError> {
        let def = self.loader.load_workflow(path)?;
        self.build(&def)
    }

    /// Build a pipeline from a parsed definition
    pub fn build(&self, def: &WorkflowDefinition) -> Result<StoryPipeline, ConfigError> {
        WorkflowLoader::validate(def)?;

        let model = match &self.model {
            Some(model) => model.clone(),
            None => create_model(&def.model)?,
        };
        let config = def.model.parameters.as_ref().map(GenerationConfig::from);
        let timeout = Duration::from_secs(def.timeout_secs.unwrap_or(DEFAULT_STEP_TIMEOUT_SECS));
        let llm = |sd: &StepDefinition| build_step(sd, model.clone(), config.clone(), timeout);
        let step = |sd: &StepDefinition| -> Result<Arc<dyn Step>, ConfigError> {
            Ok(Arc::new(llm(sd)?))
        };

        // A blank topic is an EmptyTopic outcome of the collection loop
        let collector_step = llm(&def.steps.collector)?.with_blank_replies();
        let collector = TopicCollector::new(Arc::new(collector_step))?
            .with_max_iterations(def.topic_loop.max_iterations);
        let drafter = step(&def.steps.drafter)?;
        let refiner = SentinelGuard::new(step(&def.steps.refiner)?)?;
        let refinement = RefinementLoop::new(step(&def.steps.critic)?, refiner)?
            .with_max_iterations(def.refinement_loop.max_iterations);

        let mut pipeline = StoryPipeline::new(def.name.clone(), collector, drafter, refinement)?
            .with_confirmation(def.confirm_topic);
        if let Some(tx) = &self.events {
            pipeline = pipeline.with_events(tx.clone());
        }

        log::info!(
            "Built workflow '{}' (topic cap {}, refinement cap {}, timeout {}s)",
            def.name,
            def.topic_loop.max_iterations,
            def.refinement_loop.max_iterations,
            timeout.as_secs()
        );
        Ok(pipeline)
    }
}

fn build_step(
    def: &StepDefinition,
    model: Arc<dyn Model>,
    config: Option<GenerationConfig>,
    timeout: Duration,
) -> Result<LlmStep, ConfigError> {
    let mut step = LlmStep::new(
        def.name.clone(),
        &def.instruction,
        model,
        def.reads.clone(),
        def.output,
    )?
    .with_description(def.description.clone())
    .with_timeout(timeout);

    if let Some(name) = &def.exit_tool {
        let tool = ExitTool::from_name(name).ok_or_else(|| {
            ConfigError::invalid(
                format!("steps.{}.exit_tool", def.name),
                format!("unknown exit tool '{}'", name),
            )
        })?;
        step = step.with_exit_tool(tool);
    }
    if let Some(config) = config {
        step = step.with_generation_config(config);
    }

    log::debug!(
        "Built step '{}' reading {:?}, writing {}",
        def.name,
        def.reads,
        def.output
    );
    Ok(step)
}

/// Create the model instance for a workflow
///
/// Provider: explicit definition > `MODEL_PROVIDER` > model name prefix.
/// Model name: explicit definition > `MODEL_NAME` > provider default.
pub fn create_model(def: &ModelDefinition) -> Result<Arc<dyn Model>, ConfigError> {
    let model_name = def
        .model_name
        .clone()
        .or_else(|| env::var("MODEL_NAME").ok());

    let provider = match def
        .provider
        .clone()
        .or_else(|| env::var("MODEL_PROVIDER").ok())
    {
        Some(p) => p.parse::<Provider>()?,
        None => model_name
            .as_deref()
            .map(Provider::infer_from_model)
            .unwrap_or(Provider::DeepSeek),
    };
    let model_name = model_name.unwrap_or_else(|| provider.default_model().to_string());

    log::debug!("Using provider '{}' with model '{}'", provider, model_name);

    let mut model = OpenAIModel::new(provider, model_name)?;
    if let Some(base_url) = &def.base_url {
        model = model.with_base_url(base_url.clone());
    }
    Ok(Arc::new(model))
}
