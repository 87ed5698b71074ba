use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use fable_rs::adk::state::WorkflowState;
use fable_rs::fable::builder::Builder;
use fable_rs::fable::config::{WorkflowDefinition, WorkflowLoader};
use fable_rs::fable::error::{FableError, WorkflowError};
use fable_rs::fable::input::{is_exit_command, ConsoleInput, ScriptedInput, UserInput};
use fable_rs::fable::report::RunReport;

use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Collect a topic, then draft and refine a story
    Write {
        /// Workflow file (defaults to the built-in story writer)
        #[arg(short, long)]
        workflow: Option<PathBuf>,

        /// First message; asked interactively when omitted
        #[arg(short, long)]
        prompt: Option<String>,

        /// Model name; the provider is inferred from it
        #[arg(short, long)]
        model: Option<String>,

        /// Cap on critique/refine cycles
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Read replies from this file (one per line) instead of the console
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a workflow file without calling any model
    Check {
        /// Path to the workflow file
        #[arg(short, long)]
        workflow: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Write {
            workflow,
            prompt,
            model,
            max_iterations,
            answers,
            json,
        } => {
            let loader = WorkflowLoader::new();
            let mut def = match &workflow {
                Some(path) => loader
                    .load_workflow(path)
                    .with_context(|| format!("loading workflow {}", path.display()))?,
                None => loader.default_workflow()?,
            };
            if let Some(model_name) = model {
                def.model.model_name = Some(model_name);
                def.model.provider = None;
            }
            if let Some(n) = max_iterations {
                def.refinement_loop.max_iterations = n;
            }

            let input: Box<dyn UserInput> = match &answers {
                Some(path) => Box::new(
                    ScriptedInput::from_file(path)
                        .with_context(|| format!("reading answers from {}", path.display()))?,
                ),
                None => Box::new(ConsoleInput::new()),
            };

            Ok(write(&def, prompt, input, json).await?)
        }
        Commands::Check { workflow } => {
            let def = WorkflowLoader::new()
                .load_workflow(&workflow)
                .with_context(|| format!("checking workflow {}", workflow.display()))?;

            println!("Workflow '{}' is valid", def.name);
            for (key, step) in def.steps.iter() {
                let reads: Vec<_> = step.reads.iter().map(|f| f.key()).collect();
                println!(
                    "  {:<9} {} reads [{}] -> {}{}",
                    key,
                    step.name,
                    reads.join(", "),
                    step.output,
                    step.exit_tool
                        .as_deref()
                        .map(|t| format!(" (exit: {})", t))
                        .unwrap_or_default()
                );
            }
            println!(
                "  topic loop: {} iterations, refinement loop: {} iterations",
                def.topic_loop.max_iterations, def.refinement_loop.max_iterations
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn write(
    def: &WorkflowDefinition,
    prompt: Option<String>,
    mut input: Box<dyn UserInput>,
    json: bool,
) -> Result<ExitCode, FableError> {
    let (tx, mut rx) = mpsc::channel(64);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("{}", event);
        }
    });

    let pipeline = Builder::new().with_events(tx).build(def)?;

    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let mut state = WorkflowState::new();

    let first = match prompt {
        Some(prompt) => Some(prompt),
        None => input
            .read_line("What should the story be about?\n[user]: ")
            .await?
            .filter(|line| !is_exit_command(line)),
    };
    let result = match first {
        Some(first) => {
            state = WorkflowState::with_raw_input(first);
            pipeline.run_with_id(run_id, &mut state, input.as_mut()).await
        }
        None => Err(WorkflowError::Cancelled),
    };

    drop(pipeline);
    let _ = printer.await;

    let report = RunReport::new(run_id, def.name.clone(), started_at, &state, &result);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match result {
        Ok(outcome) => {
            if !json {
                println!("\n{}\n\n{}", outcome.topic, outcome.document);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
